//! Importing transactions from uploaded CSV files.

mod csv;
mod upload;
mod upload_endpoint;

pub use csv::{CsvError, CsvField, parse_csv};
pub use upload::{UploadConfig, UploadSummary, ingest_csv, store_transactions, validate_upload};
pub use upload_endpoint::upload_endpoint;
