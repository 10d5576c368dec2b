//! Ledger Ingest is a service for importing bank transaction statements.
//!
//! Transactions are uploaded as CSV files, validated, stored in SQLite and
//! served back through a JSON API as filtered, sorted and paginated listings,
//! alongside the account balance.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod app_state;
mod csv_import;
mod db;
mod endpoints;
mod logging;
mod pagination;
mod response;
mod routing;
mod transaction;
mod validation;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use csv_import::{CsvError, CsvField, UploadConfig, UploadSummary, ingest_csv, parse_csv};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use pagination::{PageRequest, PaginationConfig, PaginationLinks, PaginationMeta};
pub use routing::{build_router, cors_layer};
pub use transaction::{
    Balance, ListingQuery, ListingScope, NewTransaction, SortField, SortOrder, Transaction,
    TransactionFilters, TransactionListing, TransactionSort, TransactionStatus, TransactionType,
    count_transactions, count_transactions_by_status, create_transaction, create_transactions,
    delete_all_transactions, get_all_transactions, get_balance, get_transaction,
    get_transactions_by_status, list_transactions,
};
pub use validation::{FieldError, QueryParameter};

use crate::response::error_response;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl+c: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install terminate signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The upload request did not contain a `file` field.
    #[error("no file was provided in the \"file\" form field")]
    NoFile,

    /// The uploaded file's name is empty, too long or contains path characters.
    #[error("{0}")]
    InvalidFilename(FieldError),

    /// The uploaded file is not a CSV file.
    #[error("{0}")]
    InvalidFileType(FieldError),

    /// The uploaded file is empty or too large.
    #[error("{0}")]
    InvalidFile(FieldError),

    /// The multipart form could not be read.
    #[error("could not read multipart form: {0}")]
    MultipartError(String),

    /// The CSV had issues that prevented it from being parsed.
    #[error(transparent)]
    InvalidCSV(#[from] CsvError),

    /// A listing query parameter failed validation.
    #[error("{source}")]
    InvalidQuery {
        /// The parameter that was rejected.
        parameter: QueryParameter,
        /// Why it was rejected.
        source: FieldError,
    },

    /// A date-time could not be formatted for storage.
    #[error("could not format date-time: {0}")]
    InvalidDateFormat(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NoFile
            | Error::InvalidFilename(_)
            | Error::InvalidFileType(_)
            | Error::InvalidFile(_)
            | Error::MultipartError(_)
            | Error::InvalidCSV(_)
            | Error::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidDateFormat(_) | Error::SqlError(_) | Error::DatabaseLockError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Convert the error to a JSON error response.
    ///
    /// Client errors describe what was wrong with the request. Server errors
    /// use `server_error_message` as the summary, e.g. "Failed to calculate
    /// balance". Both carry the underlying cause as the `error` detail.
    pub fn into_json_response(self, server_error_message: &str) -> Response {
        let status = self.status_code();

        let message = match &self {
            Error::NoFile => "No file provided",
            Error::InvalidFilename(_) => "Invalid filename",
            Error::InvalidFileType(_) => "Invalid file type",
            Error::InvalidFile(_) => "Invalid file",
            Error::MultipartError(_) => "Failed to read file",
            Error::InvalidCSV(_) => "Failed to process CSV",
            Error::InvalidQuery { parameter, .. } => parameter.message(),
            Error::NotFound => "Resource not found",
            Error::InvalidDateFormat(_) | Error::SqlError(_) | Error::DatabaseLockError => {
                server_error_message
            }
        };

        if status.is_server_error() {
            tracing::error!("{message}: {self}");
        } else {
            tracing::warn!("{message}: {self}");
        }

        error_response(status, message, Some(self.to_string()))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.into_json_response("Internal server error")
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use serde_json::json;

    use crate::{
        Error,
        csv_import::{CsvError, CsvField},
        test_utils::parse_json_body,
        validation::{FieldError, QueryParameter},
    };

    #[tokio::test]
    async fn client_errors_include_cause() {
        let error = Error::InvalidCSV(CsvError::InvalidField {
            line: 3,
            field: CsvField::Amount,
            source: FieldError::AmountNegative,
        });

        let response = error.into_json_response("unused");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            parse_json_body(response).await,
            json!({
                "status": 400,
                "message": "Failed to process CSV",
                "error": "validation error at line 3 (amount): amount cannot be negative",
            })
        );
    }

    #[tokio::test]
    async fn query_errors_name_the_parameter() {
        let error = Error::InvalidQuery {
            parameter: QueryParameter::Search,
            source: FieldError::SearchSuspicious,
        };

        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json_body(response).await;
        assert_eq!(body["message"], "Invalid search query");
        assert_eq!(
            body["error"],
            "invalid search query: contains suspicious pattern"
        );
    }

    #[tokio::test]
    async fn server_errors_use_generic_message_with_cause() {
        let response = Error::DatabaseLockError.into_json_response("Failed to calculate balance");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            parse_json_body(response).await,
            json!({
                "status": 500,
                "message": "Failed to calculate balance",
                "error": "could not acquire the database lock",
            })
        );
    }

    #[test]
    fn no_rows_converts_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }
}
