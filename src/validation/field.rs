//! Rules for the six columns of an uploaded CSV row.

use std::str::FromStr;

use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{
    transaction::{TransactionStatus, TransactionType},
    validation::FieldError,
};

/// The number of columns a CSV data row must have.
pub const FIELD_COUNT: usize = 6;
/// The maximum number of characters in a transaction name.
pub const MAX_NAME_LENGTH: usize = 255;
/// The maximum number of characters in a transaction description.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Check that a CSV row has at least [FIELD_COUNT] columns.
///
/// Extra trailing columns are ignored by the parser.
pub fn validate_field_count(field_count: usize) -> Result<(), FieldError> {
    if field_count < FIELD_COUNT {
        return Err(FieldError::FieldCount(field_count));
    }

    Ok(())
}

/// Parse a Unix epoch timestamp.
///
/// Any value that fits in an `i64` is accepted, including negative epochs.
pub fn validate_timestamp(raw: &str) -> Result<i64, FieldError> {
    let timestamp = raw.trim();

    if timestamp.is_empty() {
        return Err(FieldError::TimestampRequired);
    }

    timestamp
        .parse::<i64>()
        .map_err(|_| FieldError::TimestampFormat)
}

/// Check that a name is present and at most [MAX_NAME_LENGTH] characters,
/// returning the trimmed name.
pub fn validate_name(raw: &str) -> Result<&str, FieldError> {
    let name = raw.trim();

    if name.is_empty() {
        return Err(FieldError::NameRequired);
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(FieldError::NameTooLong);
    }

    Ok(name)
}

/// Parse a transaction type, ignoring case and surrounding whitespace.
pub fn validate_transaction_type(raw: &str) -> Result<TransactionType, FieldError> {
    TransactionType::from_str(raw)
}

/// Parse a non-negative decimal amount.
///
/// Both plain (`1250.75`) and scientific (`1.5e3`) notation are accepted.
/// Digit separators such as `1_000` are not.
pub fn validate_amount(raw: &str) -> Result<Decimal, FieldError> {
    let amount = raw.trim();

    if amount.is_empty() {
        return Err(FieldError::AmountRequired);
    }

    if amount.contains('_') {
        return Err(FieldError::AmountFormat);
    }

    let amount = Decimal::from_str(amount)
        .or_else(|_| Decimal::from_scientific(amount))
        .map_err(|_| unrepresentable_amount(amount))?;

    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(FieldError::AmountNegative);
    }

    Ok(amount)
}

/// Classify a number that [Decimal] could not hold.
fn unrepresentable_amount(amount: &str) -> FieldError {
    match amount.parse::<f64>() {
        Ok(value) if value.is_finite() && value < 0.0 => FieldError::AmountNegative,
        Ok(value) if value.is_finite() && value.abs() >= 1.0 => FieldError::AmountTooLarge,
        _ => FieldError::AmountFormat,
    }
}

/// Scale a validated amount by 100 and truncate toward zero to get the
/// integer amount in minor units.
pub fn to_minor_units(amount: Decimal) -> Result<i64, FieldError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|scaled| scaled.trunc().to_i64())
        .ok_or(FieldError::AmountTooLarge)
}

/// Parse a transaction status, ignoring case and surrounding whitespace.
pub fn validate_status(raw: &str) -> Result<TransactionStatus, FieldError> {
    TransactionStatus::from_str(raw)
}

/// Check that an optional description is at most [MAX_DESCRIPTION_LENGTH]
/// characters, returning the trimmed description.
pub fn validate_description(raw: &str) -> Result<&str, FieldError> {
    let description = raw.trim();

    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(FieldError::DescriptionTooLong);
    }

    Ok(description)
}
