//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, csv_import::UploadConfig, db::initialize, pagination::PaginationConfig};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The name the service reports in health checks.
    pub service_name: String,

    /// The config that controls how to page transaction listings.
    pub pagination_config: PaginationConfig,

    /// The limits applied to uploaded files.
    pub upload_config: UploadConfig,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        service_name: &str,
        pagination_config: PaginationConfig,
        upload_config: UploadConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            service_name: service_name.to_owned(),
            pagination_config,
            upload_config,
            db_connection: connection,
        })
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::{AppState, PaginationConfig, UploadConfig, transaction::count_transactions};

    #[test]
    fn new_initializes_the_database() {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "ledger-ingest",
            PaginationConfig::default(),
            UploadConfig::default(),
        )
        .expect("Could not create app state");

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection), Ok(0));
        assert_eq!(state.service_name, "ledger-ingest");
    }
}
