//! Defines the core data models for bank transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::validation::FieldError;

// ============================================================================
// MODELS
// ============================================================================

/// Whether money entered or left the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Money paid into the account.
    Credit,
    /// Money paid out of the account.
    Debit,
}

impl TransactionType {
    /// The canonical, upper case name stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
        }
    }
}

impl FromStr for TransactionType {
    type Err = FieldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_uppercase();

        match normalized.as_str() {
            "" => Err(FieldError::TypeRequired),
            "CREDIT" => Ok(TransactionType::Credit),
            "DEBIT" => Ok(TransactionType::Debit),
            _ => Err(FieldError::InvalidType(normalized)),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// The outcome of a transaction as reported by the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    /// The transaction completed and counts towards the balance.
    Success,
    /// The transaction was rejected.
    Failed,
    /// The transaction has not settled yet.
    Pending,
}

impl TransactionStatus {
    /// The canonical, upper case name stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Success => "SUCCESS",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Pending => "PENDING",
        }
    }
}

impl FromStr for TransactionStatus {
    type Err = FieldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_uppercase();

        match normalized.as_str() {
            "" => Err(FieldError::StatusRequired),
            "SUCCESS" => Ok(TransactionStatus::Success),
            "FAILED" => Ok(TransactionStatus::Failed),
            "PENDING" => Ok(TransactionStatus::Pending),
            _ => Err(FieldError::InvalidStatus(normalized)),
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TransactionStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A validated transaction parsed from an upload that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// The ID assigned when the row was parsed.
    pub id: Uuid,
    /// When the transaction happened, as seconds since the Unix epoch.
    pub timestamp: i64,
    /// Who the money came from or went to.
    pub name: String,
    /// Whether money entered or left the account.
    pub transaction_type: TransactionType,
    /// The amount in minor units, e.g. cents.
    pub amount: i64,
    /// The outcome reported by the bank.
    pub status: TransactionStatus,
    /// Free text notes, possibly empty.
    pub description: String,
}

/// A transaction that has been stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID assigned when the row was parsed.
    pub id: Uuid,
    /// When the transaction happened, as seconds since the Unix epoch.
    pub timestamp: i64,
    /// Who the money came from or went to.
    pub name: String,
    /// Whether money entered or left the account.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount in minor units, e.g. cents.
    pub amount: i64,
    /// The outcome reported by the bank.
    pub status: TransactionStatus,
    /// Free text notes, possibly empty.
    pub description: String,
    /// When the transaction was stored.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the stored transaction was last written.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The columns selected by [map_transaction_row], in order.
pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, timestamp, name, type, amount, status, description, created_at, updated_at";

/// Map a database row selected with [TRANSACTION_COLUMNS] to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|error| conversion_error(0, error))?;

    Ok(Transaction {
        id,
        timestamp: row.get(1)?,
        name: row.get(2)?,
        transaction_type: row.get(3)?,
        amount: row.get(4)?,
        status: row.get(5)?,
        description: row.get(6)?,
        created_at: get_date_time(row, 7)?,
        updated_at: get_date_time(row, 8)?,
    })
}

fn get_date_time(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let text: String = row.get(index)?;

    OffsetDateTime::parse(&text, &Rfc3339).map_err(|error| conversion_error(index, error))
}

fn conversion_error(
    index: usize,
    error: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
}

#[cfg(test)]
mod transaction_model_tests {
    use serde_json::json;
    use time::macros::datetime;
    use uuid::Uuid;

    use crate::{
        transaction::{Transaction, TransactionStatus, TransactionType},
        validation::FieldError,
    };

    #[test]
    fn enums_parse_their_display_names() {
        for transaction_type in [TransactionType::Credit, TransactionType::Debit] {
            assert_eq!(
                transaction_type.to_string().parse::<TransactionType>(),
                Ok(transaction_type)
            );
        }

        for status in [
            TransactionStatus::Success,
            TransactionStatus::Failed,
            TransactionStatus::Pending,
        ] {
            assert_eq!(status.to_string().parse::<TransactionStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_reports_normalized_value() {
        assert_eq!(
            "settled".parse::<TransactionStatus>(),
            Err(FieldError::InvalidStatus("SETTLED".to_owned()))
        );
    }

    #[test]
    fn transaction_serializes_with_wire_names() {
        let id = Uuid::nil();
        let transaction = Transaction {
            id,
            timestamp: 1624507883,
            name: "JOHN DOE".to_owned(),
            transaction_type: TransactionType::Debit,
            amount: 25000000,
            status: TransactionStatus::Success,
            description: "restaurant".to_owned(),
            created_at: datetime!(2024-01-15 10:30:00 UTC),
            updated_at: datetime!(2024-01-15 10:30:00 UTC),
        };

        let got = serde_json::to_value(&transaction).unwrap();

        assert_eq!(
            got,
            json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "timestamp": 1624507883,
                "name": "JOHN DOE",
                "type": "DEBIT",
                "amount": 25000000,
                "status": "SUCCESS",
                "description": "restaurant",
                "created_at": "2024-01-15T10:30:00Z",
                "updated_at": "2024-01-15T10:30:00Z",
            })
        );
    }
}
