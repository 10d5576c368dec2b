use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::Response,
};
use rusqlite::Connection;

use crate::{
    AppState,
    db::lock_connection,
    response::{MessageData, success},
    transaction::delete_all_transactions,
};

/// The state needed to clear the transactions.
#[derive(Debug, Clone)]
pub struct ClearState {
    /// The database connection for deleting transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ClearState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Route handler that deletes every stored transaction.
pub async fn clear_transactions_endpoint(State(state): State<ClearState>) -> Response {
    let deleted = lock_connection(&state.db_connection)
        .and_then(|connection| delete_all_transactions(&connection));

    match deleted {
        Ok(count) => {
            tracing::info!("Deleted {count} transactions");
            success(MessageData {
                message: "All transactions deleted",
            })
        }
        Err(error) => error.into_json_response("Failed to clear transactions"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode};
    use rusqlite::Connection;
    use serde_json::json;

    use crate::{
        csv_import::ingest_csv,
        db::initialize,
        test_utils::{assert_status_ok, parse_json_body},
        transaction::{
            clear_endpoint::{ClearState, clear_transactions_endpoint},
            count_transactions,
        },
    };

    fn get_test_state() -> ClearState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        ingest_csv(
            "timestamp, name, type, amount, status, description
1624507883, JOHN DOE, DEBIT, 250000, SUCCESS, restaurant
1624608050, E-COMMERCE A, DEBIT, 150000, FAILED, clothes"
                .as_bytes(),
            &conn,
        )
        .expect("Could not ingest CSV");

        ClearState {
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    #[tokio::test]
    async fn clear_deletes_every_transaction() {
        let state = get_test_state();

        let response = clear_transactions_endpoint(State(state.clone())).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            parse_json_body(response).await,
            json!({"status": 200, "data": {"message": "All transactions deleted"}})
        );
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection), Ok(0));
    }

    #[tokio::test]
    async fn clearing_an_empty_store_succeeds() {
        let state = get_test_state();
        clear_transactions_endpoint(State(state.clone())).await;

        let response = clear_transactions_endpoint(State(state)).await;

        assert_status_ok(&response);
    }

    #[tokio::test]
    async fn store_failure_is_a_server_error() {
        let state = get_test_state();
        state
            .db_connection
            .lock()
            .unwrap()
            .execute("DROP TABLE transactions", [])
            .unwrap();

        let response = clear_transactions_endpoint(State(state)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            parse_json_body(response).await["message"],
            "Failed to clear transactions"
        );
    }
}
