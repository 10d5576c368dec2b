use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{FromRef, Multipart, State, multipart::MultipartRejection},
    response::Response,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    csv_import::{UploadConfig, UploadSummary, parse_csv, store_transactions, validate_upload},
    db::lock_connection,
    response::success,
};

/// The name of the multipart form field that holds the CSV file.
const FILE_FIELD: &str = "file";

/// The state needed for uploading transactions.
#[derive(Debug, Clone)]
pub struct UploadState {
    /// The database connection for storing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The limits applied to uploaded files.
    pub upload_config: UploadConfig,
}

impl FromRef<AppState> for UploadState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            upload_config: state.upload_config.clone(),
        }
    }
}

/// Route handler for uploading a CSV file of transactions.
///
/// Expects a multipart form with the file in the `file` field. The file is
/// checked, parsed and stored as a single batch, and the response carries an
/// [UploadSummary].
pub async fn upload_endpoint(
    State(state): State<UploadState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match upload(&state, multipart).await {
        Ok(summary) => {
            tracing::info!(
                total_records = summary.total_records,
                success_records = summary.success_records,
                failed_records = summary.failed_records,
                pending_records = summary.pending_records,
                "CSV uploaded successfully"
            );
            success(summary)
        }
        Err(error) => error.into_json_response("Failed to process CSV"),
    }
}

async fn upload(
    state: &UploadState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadSummary, Error> {
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!("Request is not a multipart form: {}", rejection.body_text());
        Error::NoFile
    })?;

    let (file_name, data) = read_file_field(multipart).await?;
    validate_upload(&file_name, data.len(), &state.upload_config)?;

    tracing::debug!("Received file '{}' that is {} bytes", file_name, data.len());

    let transactions = parse_csv(data.as_ref())?;
    let connection = lock_connection(&state.db_connection)?;

    store_transactions(&transactions, &connection)
}

/// Read the name and contents of the file in the `file` form field.
async fn read_file_field(mut multipart: Multipart) -> Result<(String, Bytes), Error> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let Some(file_name) = field.file_name().map(str::to_owned) else {
            tracing::debug!("The \"{FILE_FIELD}\" form field is not a file");
            return Err(Error::NoFile);
        };

        let data = field
            .bytes()
            .await
            .map_err(|error| Error::MultipartError(error.body_text()))?;

        return Ok((file_name, data));
    }

    Err(Error::NoFile)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        thread,
    };

    use axum::{extract::State, http::StatusCode};
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        csv_import::{
            UploadConfig,
            upload_endpoint::{UploadState, upload_endpoint},
        },
        db::initialize,
        test_utils::{assert_content_type, must_make_multipart, parse_json_body},
        transaction::count_transactions,
    };

    const SAMPLE_CSV: &str = "timestamp, name, type, amount, status, description
1624507883, JOHN DOE, DEBIT, 250000, SUCCESS, restaurant
1624608050, E-COMMERCE A, DEBIT, 150000, FAILED, clothes
1624512883, COMPANY A, CREDIT, 12000000, SUCCESS, salary
1624615065, E-COMMERCE B, DEBIT, 150000, PENDING, clothes
1624615065, E-COMMERCE B, DEBIT, 150000, PENDING, clothes";

    fn get_test_state() -> UploadState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        UploadState {
            db_connection: Arc::new(Mutex::new(conn)),
            upload_config: UploadConfig::default(),
        }
    }

    fn stored_count(state: &UploadState) -> u64 {
        let connection = state.db_connection.lock().unwrap();
        count_transactions(&connection).expect("Could not count transactions")
    }

    #[tokio::test]
    async fn upload_stores_transactions() {
        let state = get_test_state();

        let response = upload_endpoint(
            State(state.clone()),
            Ok(must_make_multipart("file", "transactions.csv", SAMPLE_CSV).await),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "application/json");
        assert_eq!(
            parse_json_body(response).await,
            json!({
                "status": 200,
                "data": {
                    "message": "CSV uploaded and processed successfully",
                    "total_records": 4,
                    "success_records": 2,
                    "failed_records": 1,
                    "pending_records": 1,
                }
            })
        );
        assert_eq!(stored_count(&state), 4);
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let state = get_test_state();

        let response = upload_endpoint(
            State(state.clone()),
            Ok(must_make_multipart("attachment", "transactions.csv", SAMPLE_CSV).await),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_json_body(response).await["message"], "No file provided");
    }

    #[tokio::test]
    async fn wrong_extension_is_rejected() {
        let state = get_test_state();

        let response = upload_endpoint(
            State(state.clone()),
            Ok(must_make_multipart("file", "transactions.txt", SAMPLE_CSV).await),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json_body(response).await;
        assert_eq!(body["message"], "Invalid file type");
        assert_eq!(body["error"], "invalid file extension: .txt (expected .csv)");
        assert_eq!(stored_count(&state), 0);
    }

    #[tokio::test]
    async fn unsafe_file_name_is_rejected() {
        let state = get_test_state();

        let response = upload_endpoint(
            State(state.clone()),
            Ok(must_make_multipart("file", "a|b.csv", SAMPLE_CSV).await),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_json_body(response).await["message"], "Invalid filename");
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let state = get_test_state();

        let response = upload_endpoint(
            State(state.clone()),
            Ok(must_make_multipart("file", "transactions.csv", "").await),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json_body(response).await;
        assert_eq!(body["message"], "Invalid file");
        assert_eq!(body["error"], "file is empty");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let mut state = get_test_state();
        state.upload_config.max_file_size = 16;

        let response = upload_endpoint(
            State(state.clone()),
            Ok(must_make_multipart("file", "transactions.csv", SAMPLE_CSV).await),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            parse_json_body(response).await["error"],
            "file size exceeds maximum allowed size of 16 bytes"
        );
        assert_eq!(stored_count(&state), 0);
    }

    #[tokio::test]
    async fn invalid_row_stores_nothing() {
        let state = get_test_state();
        let csv = format!("{SAMPLE_CSV}\n1624615065, BROKEN, DEBIT, ten, PENDING, bad");

        let response = upload_endpoint(
            State(state.clone()),
            Ok(must_make_multipart("file", "transactions.csv", &csv).await),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json_body(response).await;
        assert_eq!(body["message"], "Failed to process CSV");
        assert_eq!(
            body["error"],
            "validation error at line 7 (amount): invalid amount format: must be a valid number"
        );
        assert_eq!(stored_count(&state), 0);
    }

    #[tokio::test]
    async fn header_only_file_is_rejected() {
        let state = get_test_state();

        let response = upload_endpoint(
            State(state.clone()),
            Ok(must_make_multipart("file", "transactions.csv", "timestamp, name").await),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            parse_json_body(response).await["error"],
            "no valid transactions found in CSV"
        );
    }

    #[tokio::test]
    async fn invalid_csv_is_rejected_without_taking_the_database_lock() {
        let state = get_test_state();
        let poisoner = state.db_connection.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let response = upload_endpoint(
            State(state),
            Ok(must_make_multipart("file", "transactions.csv", "timestamp, name").await),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            parse_json_body(response).await["message"],
            "Failed to process CSV"
        );
    }
}
