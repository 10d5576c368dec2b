//! Turns an uploaded file into stored transactions.

use rusqlite::Connection;
use serde::Serialize;

use crate::{
    Error,
    csv_import::parse_csv,
    transaction::{
        NewTransaction, TransactionStatus, count_transactions_by_status, create_transactions,
    },
    validation::{validate_file_extension, validate_file_name, validate_file_size},
};

/// The message returned after a successful upload.
pub const UPLOAD_SUCCESS_MESSAGE: &str = "CSV uploaded and processed successfully";

/// The config for file uploads.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// The largest file, in bytes, that will be accepted.
    pub max_file_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
        }
    }
}

/// The outcome of an upload.
///
/// `total_records` counts the transactions stored by this upload. The status
/// counts cover every stored transaction, including earlier uploads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    /// A summary for the client.
    pub message: &'static str,
    /// The number of transactions stored by this upload.
    pub total_records: u64,
    /// The number of stored transactions that succeeded.
    pub success_records: u64,
    /// The number of stored transactions that failed.
    pub failed_records: u64,
    /// The number of stored transactions that are pending.
    pub pending_records: u64,
}

/// Check an uploaded file's name, extension and size, in that order.
///
/// # Errors
/// Returns [Error::InvalidFilename], [Error::InvalidFileType] or
/// [Error::InvalidFile] for the first check that fails.
pub fn validate_upload(file_name: &str, size: usize, config: &UploadConfig) -> Result<(), Error> {
    validate_file_name(file_name).map_err(Error::InvalidFilename)?;
    validate_file_extension(file_name).map_err(Error::InvalidFileType)?;
    validate_file_size(size, config.max_file_size).map_err(Error::InvalidFile)?;

    Ok(())
}

/// Parse `data` as a transaction CSV and store every transaction in it.
///
/// Nothing is stored unless the whole file is valid, and the batch is stored
/// atomically.
///
/// # Errors
/// Returns:
/// - [Error::InvalidCSV] if the file could not be parsed,
/// - or [Error::SqlError] if the transactions could not be stored.
pub fn ingest_csv(data: &[u8], connection: &Connection) -> Result<UploadSummary, Error> {
    let transactions = parse_csv(data)?;

    store_transactions(&transactions, connection)
}

/// Store a parsed upload as one batch and summarise the store.
///
/// Once the batch is committed the upload has succeeded, so a status that
/// cannot be counted is logged and reported as zero.
///
/// # Errors
/// Returns [Error::SqlError] if the transactions could not be stored.
pub fn store_transactions(
    transactions: &[NewTransaction],
    connection: &Connection,
) -> Result<UploadSummary, Error> {
    let total_records = create_transactions(transactions, connection)? as u64;

    Ok(UploadSummary {
        message: UPLOAD_SUCCESS_MESSAGE,
        total_records,
        success_records: status_count(TransactionStatus::Success, connection),
        failed_records: status_count(TransactionStatus::Failed, connection),
        pending_records: status_count(TransactionStatus::Pending, connection),
    })
}

fn status_count(status: TransactionStatus, connection: &Connection) -> u64 {
    count_transactions_by_status(status, connection).unwrap_or_else(|error| {
        tracing::error!("could not count {status} transactions after upload: {error}");
        0
    })
}
