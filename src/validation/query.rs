//! Rules for the query parameters of the listing endpoints.

use std::str::FromStr;

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    transaction::{SortField, SortOrder},
    validation::FieldError,
};

/// The maximum number of characters in a free text search term.
pub const MAX_SEARCH_LENGTH: usize = 255;

/// Substrings that never appear in an honest search term.
const SUSPICIOUS_PATTERNS: [&str; 7] = [
    "'; drop", "'; delete", "'; update", "'; insert", "--", "/*", "*/",
];

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Check a search term's length and reject it if it contains a known SQL
/// injection fragment, ignoring case.
///
/// This does not make the term safe to splice into SQL, search terms are
/// always bound as parameters.
pub fn validate_search_query(search: &str) -> Result<(), FieldError> {
    if search.chars().count() > MAX_SEARCH_LENGTH {
        return Err(FieldError::SearchTooLong);
    }

    let search = search.to_lowercase();

    if SUSPICIOUS_PATTERNS
        .iter()
        .any(|pattern| search.contains(pattern))
    {
        return Err(FieldError::SearchSuspicious);
    }

    Ok(())
}

/// Parse a sort field, ignoring case. An empty value means no sort field.
pub fn validate_sort_field(raw: &str) -> Result<Option<SortField>, FieldError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    SortField::from_str(raw).map(Some)
}

/// Parse a sort order, ignoring case. An empty value means no sort order.
pub fn validate_sort_order(raw: &str) -> Result<Option<SortOrder>, FieldError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    SortOrder::from_str(raw).map(Some)
}

/// Parse a one-based page number.
pub fn validate_page(raw: &str) -> Result<u64, FieldError> {
    match raw.trim().parse::<u64>() {
        Ok(page) if page >= 1 => Ok(page),
        _ => Err(FieldError::Page),
    }
}

/// Parse a page size, clamping values above `max_page_size` down to it.
pub fn validate_page_size(raw: &str, max_page_size: u64) -> Result<u64, FieldError> {
    match raw.trim().parse::<u64>() {
        Ok(page_size) if page_size >= 1 => Ok(page_size.min(max_page_size)),
        _ => Err(FieldError::PageSize(max_page_size)),
    }
}

/// Parse an exact amount filter in minor units. An empty value means no filter.
pub fn validate_amount_filter(raw: &str) -> Result<Option<i64>, FieldError> {
    let amount = raw.trim();

    if amount.is_empty() {
        return Ok(None);
    }

    amount
        .parse::<i64>()
        .map(Some)
        .map_err(|_| FieldError::AmountFilter)
}

/// Parse the optional `YYYY-MM-DD` bounds of a date range.
///
/// Missing or empty bounds leave that side of the range open. The bounds are
/// not checked against each other.
pub fn validate_date_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(Option<Date>, Option<Date>), FieldError> {
    let start_date = parse_optional_date(start, FieldError::StartDate)?;
    let end_date = parse_optional_date(end, FieldError::EndDate)?;

    Ok((start_date, end_date))
}

fn parse_optional_date(raw: Option<&str>, error: FieldError) -> Result<Option<Date>, FieldError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };

    if !is_iso_date_shape(raw) {
        return Err(error);
    }

    Date::parse(raw, DATE_FORMAT).map(Some).map_err(|_| error)
}

/// Whether `raw` looks like `dddd-dd-dd`.
fn is_iso_date_shape(raw: &str) -> bool {
    let bytes = raw.as_bytes();

    bytes.len() == 10
        && bytes.iter().enumerate().all(|(index, byte)| match index {
            4 | 7 => *byte == b'-',
            _ => byte.is_ascii_digit(),
        })
}
