//! The filtered, sorted and paginated transaction listings.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    pagination::{PageRequest, PaginationMeta},
    transaction::{
        Transaction, TransactionStatus, TransactionType,
        core::{TRANSACTION_COLUMNS, map_transaction_row},
        db::query_count,
    },
    validation::FieldError,
};

/// The columns a listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// When the transaction happened, per the bank.
    Timestamp,
    /// The amount in minor units.
    Amount,
    /// The counterparty name.
    Name,
    /// The transaction status.
    Status,
    /// Credit or debit.
    Type,
    /// The free text description.
    Description,
    /// When the transaction was stored.
    CreatedAt,
}

impl SortField {
    /// The column name, safe to splice into SQL.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Timestamp => "timestamp",
            SortField::Amount => "amount",
            SortField::Name => "name",
            SortField::Status => "status",
            SortField::Type => "type",
            SortField::Description => "description",
            SortField::CreatedAt => "created_at",
        }
    }
}

impl FromStr for SortField {
    type Err = FieldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "timestamp" => Ok(SortField::Timestamp),
            "amount" => Ok(SortField::Amount),
            "name" => Ok(SortField::Name),
            "status" => Ok(SortField::Status),
            "type" => Ok(SortField::Type),
            "description" => Ok(SortField::Description),
            "created_at" | "createdat" => Ok(SortField::CreatedAt),
            _ => Err(FieldError::SortField(raw.to_owned())),
        }
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column())
    }
}

/// The order to sort transactions in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    #[serde(rename = "ASC")]
    Ascending,
    /// Sort in order of decreasing value.
    #[serde(rename = "DESC")]
    Descending,
}

impl SortOrder {
    /// The SQL keyword for this order.
    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = FieldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_uppercase().as_str() {
            "ASC" => Ok(SortOrder::Ascending),
            "DESC" => Ok(SortOrder::Descending),
            _ => Err(FieldError::SortOrder(raw.to_owned())),
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The requested sort. It is only applied when both parts are given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransactionSort {
    /// The column to sort by.
    pub by: Option<SortField>,
    /// The direction to sort in.
    pub order: Option<SortOrder>,
}

impl TransactionSort {
    fn order_by_clause(&self) -> String {
        // rowid keeps pages stable when the sort column has ties.
        match (self.by, self.order) {
            (Some(by), Some(order)) => {
                format!("ORDER BY {} {}, rowid ASC", by.column(), order.keyword())
            }
            _ => "ORDER BY rowid ASC".to_owned(),
        }
    }
}

/// Optional predicates that are ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilters {
    /// Only transactions with this status.
    pub status: Option<TransactionStatus>,
    /// Only credits or only debits.
    pub transaction_type: Option<TransactionType>,
    /// Case-insensitive substring of the name or description.
    pub search: Option<String>,
    /// Exact amount in minor units. Zero or less means no filter.
    pub amount: Option<i64>,
    /// Inclusive lower bound on the day the transaction was stored.
    pub start_date: Option<Date>,
    /// Inclusive upper bound on the day the transaction was stored.
    pub end_date: Option<Date>,
}

impl TransactionFilters {
    fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|search| !search.is_empty())
    }

    fn amount(&self) -> Option<i64> {
        self.amount.filter(|amount| *amount > 0)
    }
}

/// Which transactions a listing draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingScope {
    /// Every transaction.
    All,
    /// Only transactions that failed or are still pending.
    Issues,
}

impl ListingScope {
    /// The message returned with a successful listing.
    pub fn message(self) -> &'static str {
        match self {
            ListingScope::All => "Transactions retrieved successfully",
            ListingScope::Issues => "Issues retrieved successfully",
        }
    }
}

/// A validated listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// The page to return.
    pub page: PageRequest,
    /// Which transactions to include.
    pub filters: TransactionFilters,
    /// The order of the transactions.
    pub sort: TransactionSort,
}

/// One page of a transaction listing with the metadata needed to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionListing {
    /// A summary of what was listed.
    pub message: &'static str,
    /// The transactions on this page.
    pub data: Vec<Transaction>,
    /// Where this page sits in the listing.
    pub meta: ListingMeta,
}

/// Describes the page, the filters that were applied and the sort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingMeta {
    /// The position of the page.
    pub pagination: PaginationMeta,
    #[serde(skip_serializing_if = "FiltersMeta::is_empty")]
    pub filters: FiltersMeta,
    /// The sort that was applied.
    pub sort: TransactionSort,
}

/// The filters that were applied, with unset filters omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FiltersMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl FiltersMeta {
    fn is_empty(&self) -> bool {
        *self == FiltersMeta::default()
    }
}

impl From<&TransactionFilters> for FiltersMeta {
    fn from(filters: &TransactionFilters) -> Self {
        Self {
            status: filters.status,
            transaction_type: filters.transaction_type,
            search: filters.search_term().map(str::to_owned),
            amount: filters.amount(),
            start_date: filters.start_date.map(|date| date.to_string()),
            end_date: filters.end_date.map(|date| date.to_string()),
        }
    }
}

/// The query string of a pagination link. Unset parameters are left out.
#[derive(Serialize)]
struct LinkQuery<'a> {
    page: u64,
    page_size: u64,
    #[serde(flatten)]
    filters: &'a FiltersMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort_by: Option<SortField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort_order: Option<SortOrder>,
}

/// Get one page of the transactions in `scope` that match the query filters.
///
/// The total is counted before the page is cut, so it covers every page.
/// Without a complete sort the transactions are returned in the order they
/// were stored.
///
/// # Errors
/// Returns [Error::SqlError] if:
/// - SQL query preparation or execution fails
/// - Transaction row mapping fails
pub fn list_transactions(
    scope: ListingScope,
    query: &ListingQuery,
    connection: &Connection,
) -> Result<TransactionListing, Error> {
    let (where_clause, mut params) = build_where_clause(scope, &query.filters);

    let total = query_count(
        &format!("SELECT COUNT(*) FROM transactions {where_clause}"),
        params_from_iter(params.iter()),
        connection,
    )?;

    params.push(Value::Integer(to_sql_integer(query.page.page_size)));
    params.push(Value::Integer(to_sql_integer(query.page.offset())));

    let transactions = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions {where_clause} {} LIMIT ? OFFSET ?",
            query.sort.order_by_clause()
        ))?
        .query_map(params_from_iter(params.iter()), map_transaction_row)?
        .map(|transaction_result| transaction_result.map_err(Error::SqlError))
        .collect::<Result<Vec<_>, _>>()?;

    let filters = FiltersMeta::from(&query.filters);
    let pagination = PaginationMeta::new(
        query.page,
        total,
        transactions.len() as u64,
        |page| pagination_link(page, query, &filters),
    );

    Ok(TransactionListing {
        message: scope.message(),
        data: transactions,
        meta: ListingMeta {
            pagination,
            filters,
            sort: query.sort,
        },
    })
}

fn build_where_clause(scope: ListingScope, filters: &TransactionFilters) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut params = Vec::new();

    if scope == ListingScope::Issues {
        conditions.push("status IN (?, ?)");
        params.push(text(TransactionStatus::Failed));
        params.push(text(TransactionStatus::Pending));
    }

    if let Some(status) = filters.status {
        conditions.push("status = ?");
        params.push(text(status));
    }

    if let Some(transaction_type) = filters.transaction_type {
        conditions.push("type = ?");
        params.push(text(transaction_type));
    }

    if let Some(amount) = filters.amount() {
        conditions.push("amount = ?");
        params.push(Value::Integer(amount));
    }

    if let Some(search) = filters.search_term() {
        let pattern = format!("%{}%", escape_like(search));
        conditions.push("(name LIKE ? ESCAPE '\\' OR description LIKE ? ESCAPE '\\')");
        params.push(Value::Text(pattern.clone()));
        params.push(Value::Text(pattern));
    }

    match (filters.start_date, filters.end_date) {
        (Some(start_date), Some(end_date)) => {
            conditions.push("DATE(created_at) BETWEEN ? AND ?");
            params.push(text(start_date));
            params.push(text(end_date));
        }
        (Some(start_date), None) => {
            conditions.push("DATE(created_at) >= ?");
            params.push(text(start_date));
        }
        (None, Some(end_date)) => {
            conditions.push("DATE(created_at) <= ?");
            params.push(text(end_date));
        }
        (None, None) => {}
    }

    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), params)
    }
}

fn text(value: impl Display) -> Value {
    Value::Text(value.to_string())
}

fn to_sql_integer(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Escape the LIKE wildcards in `search` so that they match literally.
fn escape_like(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len());

    for character in search.chars() {
        if matches!(character, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(character);
    }

    escaped
}

fn pagination_link(page: u64, query: &ListingQuery, filters: &FiltersMeta) -> String {
    let (sort_by, sort_order) = match (query.sort.by, query.sort.order) {
        (Some(by), Some(order)) => (Some(by), Some(order)),
        _ => (None, None),
    };

    let link_query = LinkQuery {
        page,
        page_size: query.page.page_size,
        filters,
        sort_by,
        sort_order,
    };

    match serde_urlencoded::to_string(&link_query) {
        Ok(query_string) => format!("?{query_string}"),
        Err(error) => {
            tracing::warn!("could not encode pagination link: {error}");
            format!("?page={page}&page_size={}", query.page.page_size)
        }
    }
}
