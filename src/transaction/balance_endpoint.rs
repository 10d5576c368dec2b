use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::Response,
};
use rusqlite::Connection;

use crate::{AppState, db::lock_connection, response::success, transaction::get_balance};

/// The state needed to calculate the balance.
#[derive(Debug, Clone)]
pub struct BalanceState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BalanceState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Route handler for the balance of the successful transactions.
pub async fn get_balance_endpoint(State(state): State<BalanceState>) -> Response {
    let balance = lock_connection(&state.db_connection)
        .and_then(|connection| get_balance(&connection));

    match balance {
        Ok(balance) => success(balance),
        Err(error) => error.into_json_response("Failed to calculate balance"),
    }
}
