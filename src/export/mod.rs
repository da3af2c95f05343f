//! Output files consumed by the analysis notebook

pub mod raw;
pub mod tabular;

pub use raw::write_raw_json;
pub use tabular::{COMMENT_COLUMNS, CsvExporter, POST_COLUMNS};
