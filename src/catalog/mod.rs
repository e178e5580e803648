mod builder;
mod competitors;
mod decode;
mod header;
mod index;
mod merge;
mod record;

pub use builder::{ColumnPlan, build_records, normalize_value};
pub use competitors::{DEFAULT_COMPETITOR_LIMIT, UNRANKED_SENTINEL, rank_metric, select_top};
pub use decode::{DecodedTable, decode, split_line};
pub use header::{HeaderTarget, normalize_header, slugify};
pub use index::{Catalog, SearchFilter};
pub use merge::{export_row, merge};
pub use record::{CanonicalField, CanonicalRecord};
