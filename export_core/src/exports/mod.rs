pub mod sanitize;
pub mod store;

pub use sanitize::{basename, sanitize_file_name, ExportName, SanitizeError};
pub use store::{ExportFile, ExportStore, StoreError};

pub const SPREADSHEET_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const DEFAULT_DOWNLOAD_ROUTE: &str = "/api/exports/download";

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
