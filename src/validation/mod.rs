//! Stateless rule checks for transaction attributes, listing query parameters
//! and uploaded files.
//!
//! Every check takes the raw text it was given and either returns the parsed
//! value or a [FieldError] describing the first rule that failed. None of the
//! checks hold state, so they are plain functions rather than services.

mod field;
mod file;
mod query;

pub use field::{
    to_minor_units, validate_amount, validate_description, validate_field_count, validate_name,
    validate_status, validate_timestamp, validate_transaction_type,
};
pub use file::{validate_file_extension, validate_file_name, validate_file_size};
pub use query::{
    validate_amount_filter, validate_date_range, validate_page, validate_page_size,
    validate_search_query, validate_sort_field, validate_sort_order,
};

/// The reasons a single value can fail validation.
///
/// The messages are surfaced to API clients as the `error` detail of a 400
/// response, so they name the offending value where that helps.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FieldError {
    /// The timestamp column is empty.
    #[error("timestamp is required")]
    TimestampRequired,

    /// The timestamp is not a Unix epoch integer.
    #[error("invalid timestamp format: must be a Unix epoch integer")]
    TimestampFormat,

    /// The name column is empty.
    #[error("name is required")]
    NameRequired,

    /// The name is longer than 255 characters.
    #[error("name is too long (max 255 characters)")]
    NameTooLong,

    /// The transaction type column is empty.
    #[error("transaction type is required")]
    TypeRequired,

    /// The transaction type is neither `CREDIT` nor `DEBIT`.
    #[error("invalid transaction type: {0} (expected CREDIT or DEBIT)")]
    InvalidType(String),

    /// The amount column is empty.
    #[error("amount is required")]
    AmountRequired,

    /// The amount is not a number.
    #[error("invalid amount format: must be a valid number")]
    AmountFormat,

    /// The amount is below zero.
    #[error("amount cannot be negative")]
    AmountNegative,

    /// The amount is valid but does not fit in the integer minor-unit column.
    #[error("amount is too large")]
    AmountTooLarge,

    /// The status column is empty.
    #[error("status is required")]
    StatusRequired,

    /// The status is not one of `SUCCESS`, `FAILED` or `PENDING`.
    #[error("invalid status: {0} (expected SUCCESS, FAILED, or PENDING)")]
    InvalidStatus(String),

    /// The description is longer than 500 characters.
    #[error("description is too long (max 500 characters)")]
    DescriptionTooLong,

    /// A CSV row has fewer than six columns.
    #[error("invalid CSV format: expected 6 fields, got {0}")]
    FieldCount(usize),

    /// The search text is longer than 255 characters.
    #[error("search query is too long (max 255 characters)")]
    SearchTooLong,

    /// The search text contains a known SQL injection fragment.
    #[error("invalid search query: contains suspicious pattern")]
    SearchSuspicious,

    /// The sort field is not a sortable column.
    #[error("invalid sort field: {0}")]
    SortField(String),

    /// The sort order is neither `ASC` nor `DESC`.
    #[error("invalid sort order: {0} (expected ASC or DESC)")]
    SortOrder(String),

    /// The page number is below one or not an integer.
    #[error("page must be >= 1")]
    Page,

    /// The page size is below one or not an integer.
    #[error("page_size must be between 1 and {0}")]
    PageSize(u64),

    /// The amount filter is not an integer.
    #[error("invalid amount filter: must be an integer")]
    AmountFilter,

    /// The start date is not a `YYYY-MM-DD` date.
    #[error("invalid start_date format: expected YYYY-MM-DD")]
    StartDate,

    /// The end date is not a `YYYY-MM-DD` date.
    #[error("invalid end_date format: expected YYYY-MM-DD")]
    EndDate,

    /// The uploaded file has no name.
    #[error("filename is empty")]
    FileNameEmpty,

    /// The file name is longer than 255 characters.
    #[error("filename is too long (max 255 characters)")]
    FileNameTooLong,

    /// The file name contains a path separator or another reserved character.
    #[error("filename contains invalid character: {0}")]
    FileNameInvalidCharacter(char),

    /// The file name does not end in `.csv`.
    #[error("invalid file extension: {0} (expected .csv)")]
    FileExtension(String),

    /// The uploaded file has no content.
    #[error("file is empty")]
    FileEmpty,

    /// The uploaded file is larger than the configured maximum, in bytes.
    #[error("file size exceeds maximum allowed size of {0} bytes")]
    FileTooLarge(usize),
}

/// The listing query parameters that are validated, used to tell the client
/// which one was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParameter {
    /// `page` or `page_size`.
    Pagination,
    /// The `status` filter.
    Status,
    /// The `type` filter.
    Type,
    /// The `search` text.
    Search,
    /// The `amount` filter.
    Amount,
    /// `start_date` or `end_date`.
    DateRange,
    /// `sort_by`.
    SortField,
    /// `sort_order`.
    SortOrder,
}

impl QueryParameter {
    /// The human readable message sent to the client when this parameter is invalid.
    pub fn message(self) -> &'static str {
        match self {
            QueryParameter::Pagination => "Invalid pagination parameters",
            QueryParameter::Status => "Invalid status filter",
            QueryParameter::Type => "Invalid type filter",
            QueryParameter::Search => "Invalid search query",
            QueryParameter::Amount => "Invalid amount filter",
            QueryParameter::DateRange => "Invalid date range",
            QueryParameter::SortField => "Invalid sort field",
            QueryParameter::SortOrder => "Invalid sort order",
        }
    }
}
