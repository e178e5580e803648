pub mod analysis;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod error;
pub mod ledger;
pub mod model;
pub mod report;
pub mod util;
