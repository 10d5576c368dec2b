//! Database functions for storing, looking up and aggregating transactions.

use rusqlite::{Connection, Params, ToSql, params_from_iter};
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
    Error,
    transaction::{
        NewTransaction, Transaction, TransactionStatus,
        core::{TRANSACTION_COLUMNS, map_transaction_row},
    },
};

/// The maximum number of rows written by a single `INSERT` statement.
pub const INSERT_BATCH_SIZE: usize = 100;

/// The number of bound parameters per inserted row.
const PARAMETERS_PER_ROW: usize = 9;

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                name TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('CREDIT', 'DEBIT')),
                amount INTEGER NOT NULL CHECK (amount >= 0),
                status TEXT NOT NULL CHECK (status IN ('SUCCESS', 'FAILED', 'PENDING')),
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions(timestamp);",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status);",
        (),
    )?;

    Ok(())
}

/// Store a single transaction, stamping it with the current time.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error,
/// e.g. the ID is already in use.
pub fn create_transaction(
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let now = format_date_time(now_utc())?;

    let transaction = connection
        .prepare(&format!(
            "INSERT INTO transactions ({TRANSACTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                transaction.id.to_string(),
                transaction.timestamp,
                transaction.name,
                transaction.transaction_type,
                transaction.amount,
                transaction.status,
                transaction.description,
                now,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Store a batch of transactions, all stamped with the current time.
///
/// The batch is written inside one SQL transaction, so either every
/// transaction is stored or none are. Returns the number of rows written.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error,
/// in which case nothing is written.
pub fn create_transactions(
    transactions: &[NewTransaction],
    connection: &Connection,
) -> Result<usize, Error> {
    create_transactions_at(transactions, now_utc(), connection)
}

/// Store a batch of transactions with an explicit creation time.
pub(crate) fn create_transactions_at(
    transactions: &[NewTransaction],
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<usize, Error> {
    if transactions.is_empty() {
        return Ok(0);
    }

    let created_at = format_date_time(created_at)?;
    let sql_transaction = connection.unchecked_transaction()?;
    let mut inserted = 0;

    for chunk in transactions.chunks(INSERT_BATCH_SIZE) {
        let row_placeholders = vec!["(?, ?, ?, ?, ?, ?, ?, ?, ?)"; chunk.len()].join(", ");
        let query =
            format!("INSERT INTO transactions ({TRANSACTION_COLUMNS}) VALUES {row_placeholders}");

        let ids: Vec<String> = chunk
            .iter()
            .map(|transaction| transaction.id.to_string())
            .collect();
        let mut params: Vec<&dyn ToSql> = Vec::with_capacity(chunk.len() * PARAMETERS_PER_ROW);

        for (transaction, id) in chunk.iter().zip(&ids) {
            params.push(id);
            params.push(&transaction.timestamp);
            params.push(&transaction.name);
            params.push(&transaction.transaction_type);
            params.push(&transaction.amount);
            params.push(&transaction.status);
            params.push(&transaction.description);
            params.push(&created_at);
            params.push(&created_at);
        }

        inserted += sql_transaction.execute(&query, params_from_iter(params))?;
    }

    sql_transaction.commit()?;

    Ok(inserted)
}

/// Delete every stored transaction, returning the number of rows deleted.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn delete_all_transactions(connection: &Connection) -> Result<usize, Error> {
    connection
        .execute("DELETE FROM transactions", ())
        .map_err(Error::from)
}

/// Retrieve a transaction from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a stored transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: Uuid, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = :id"
        ))?
        .query_one(&[(":id", &id.to_string())], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve every stored transaction in insertion order.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_all_transactions(connection: &Connection) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY rowid ASC"
        ))?
        .query_map([], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Retrieve the transactions with `status`, newest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_transactions_by_status(
    status: TransactionStatus,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE status = ?1 \
            ORDER BY timestamp DESC, rowid ASC"
        ))?
        .query_map([status], map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect()
}

/// Get the total number of transactions in the database.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(connection: &Connection) -> Result<u64, Error> {
    query_count("SELECT COUNT(*) FROM transactions", [], connection)
}

/// Get the number of transactions with `status`.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions_by_status(
    status: TransactionStatus,
    connection: &Connection,
) -> Result<u64, Error> {
    query_count(
        "SELECT COUNT(*) FROM transactions WHERE status = ?1",
        [status],
        connection,
    )
}

/// Run a `SELECT COUNT(*)` query.
///
/// SQLite returns counts as signed integers, so they are read as `i64`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error
/// or the query returns a negative number.
pub(crate) fn query_count<P: Params>(
    query: &str,
    params: P,
    connection: &Connection,
) -> Result<u64, Error> {
    let count: i64 = connection.query_row(query, params, |row| row.get(0))?;

    u64::try_from(count)
        .map_err(|_| Error::SqlError(rusqlite::Error::IntegralValueOutOfRange(0, count)))
}

/// The totals of the successful transactions, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Balance {
    /// Total credits minus total debits.
    pub balance: i64,
    /// Total credits.
    pub credits: i64,
    /// Total debits.
    pub debits: i64,
}

/// Sum the successful credits and debits.
///
/// Failed and pending transactions never count towards the balance.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error,
/// including when a total overflows.
pub fn get_balance(connection: &Connection) -> Result<Balance, Error> {
    let (credits, debits): (i64, i64) = connection.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN type = 'CREDIT' THEN amount END), 0),
            COALESCE(SUM(CASE WHEN type = 'DEBIT' THEN amount END), 0)
        FROM transactions
        WHERE status = 'SUCCESS'",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(Balance {
        balance: credits - debits,
        credits,
        debits,
    })
}

fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
        .replace_nanosecond(0)
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn format_date_time(date_time: OffsetDateTime) -> Result<String, Error> {
    date_time
        .format(&Rfc3339)
        .map_err(|error| Error::InvalidDateFormat(error.to_string()))
}
