//! Parses uploaded bank transaction CSV files.
//!
//! The first row is a header and is always discarded. Each data row has the
//! columns `timestamp, name, type, amount, status, description`, extra
//! columns are ignored. Rows starting with `#` and blank rows are skipped.

use std::{collections::HashSet, fmt::Display, io};

use uuid::Uuid;

use crate::{
    transaction::{NewTransaction, TransactionStatus, TransactionType},
    validation::{
        FieldError, to_minor_units, validate_amount, validate_description, validate_field_count,
        validate_name, validate_status, validate_timestamp, validate_transaction_type,
    },
};

/// The column of a CSV row that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvField {
    /// The first column.
    Timestamp,
    /// The second column.
    Name,
    /// The third column.
    Type,
    /// The fourth column.
    Amount,
    /// The fifth column.
    Status,
    /// The sixth column.
    Description,
}

impl Display for CsvField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CsvField::Timestamp => "timestamp",
            CsvField::Name => "name",
            CsvField::Type => "type",
            CsvField::Amount => "amount",
            CsvField::Status => "status",
            CsvField::Description => "description",
        };

        f.write_str(name)
    }
}

/// The reasons a CSV upload could not be parsed.
///
/// Line numbers are one-based and count the header line.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum CsvError {
    /// The CSV could not be read, e.g. unbalanced quotes or invalid UTF-8.
    #[error("error reading CSV at line {line}: {message}")]
    Read {
        /// The line the reader stopped at.
        line: u64,
        /// What the reader could not handle.
        message: String,
    },

    /// A data row has too few columns.
    #[error("validation error at line {line}: {source}")]
    FieldCount {
        /// The line of the short row.
        line: u64,
        /// The column count rule that failed.
        source: FieldError,
    },

    /// A column of a data row failed validation.
    #[error("validation error at line {line} ({field}): {source}")]
    InvalidField {
        /// The line of the invalid row.
        line: u64,
        /// The column that is invalid.
        field: CsvField,
        /// The rule that the column failed.
        source: FieldError,
    },

    /// The file had no data rows once comments, blanks and duplicates were removed.
    #[error("no valid transactions found in CSV")]
    NoValidTransactions,
}

/// Identifies rows that describe the same transaction within one upload.
#[derive(Debug, PartialEq, Eq, Hash)]
struct DuplicateKey {
    timestamp: i64,
    name: String,
    transaction_type: TransactionType,
    amount: i64,
    status: TransactionStatus,
}

/// Parse and validate every data row of a CSV upload.
///
/// The first invalid row aborts the parse, so no transactions are returned
/// unless the whole file is valid. Rows that repeat the timestamp, name, type,
/// amount and status of an earlier row are dropped, keeping the first.
///
/// # Errors
/// Returns a [CsvError] naming the line and column of the first problem, or
/// [CsvError::NoValidTransactions] if no data rows remain.
pub fn parse_csv<R: io::Read>(reader: R) -> Result<Vec<NewTransaction>, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut transactions = Vec::new();
    let mut seen = HashSet::new();

    for record in reader.records() {
        let record = record.map_err(|error| CsvError::Read {
            line: error.position().map(|position| position.line()).unwrap_or(0),
            message: error.to_string(),
        })?;

        if is_skipped(&record) {
            continue;
        }

        let line = record.position().map(|position| position.line()).unwrap_or(0);
        let transaction = parse_record(&record, line)?;

        let key = DuplicateKey {
            timestamp: transaction.timestamp,
            name: transaction.name.clone(),
            transaction_type: transaction.transaction_type,
            amount: transaction.amount,
            status: transaction.status,
        };

        if !seen.insert(key) {
            tracing::debug!("Skipping duplicate transaction at line {line}");
            continue;
        }

        transactions.push(transaction);
    }

    if transactions.is_empty() {
        return Err(CsvError::NoValidTransactions);
    }

    Ok(transactions)
}

/// Blank rows and comment rows carry no transaction.
fn is_skipped(record: &csv::StringRecord) -> bool {
    record.iter().all(str::is_empty)
        || record
            .get(0)
            .is_some_and(|first_field| first_field.starts_with('#'))
}

fn parse_record(record: &csv::StringRecord, line: u64) -> Result<NewTransaction, CsvError> {
    validate_field_count(record.len()).map_err(|source| CsvError::FieldCount { line, source })?;

    let column = |index: usize| record.get(index).unwrap_or_default();
    let invalid = |field: CsvField| move |source| CsvError::InvalidField { line, field, source };

    let timestamp = validate_timestamp(column(0)).map_err(invalid(CsvField::Timestamp))?;
    let name = validate_name(column(1)).map_err(invalid(CsvField::Name))?;
    let transaction_type =
        validate_transaction_type(column(2)).map_err(invalid(CsvField::Type))?;
    let amount = validate_amount(column(3))
        .and_then(to_minor_units)
        .map_err(invalid(CsvField::Amount))?;
    let status = validate_status(column(4)).map_err(invalid(CsvField::Status))?;
    let description = validate_description(column(5)).map_err(invalid(CsvField::Description))?;

    Ok(NewTransaction {
        id: Uuid::new_v4(),
        timestamp,
        name: name.to_owned(),
        transaction_type,
        amount,
        status,
        description: description.to_owned(),
    })
}
