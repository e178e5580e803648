pub mod analyze;
pub mod competitors;
pub mod ingest;
pub mod search;
pub mod status;
