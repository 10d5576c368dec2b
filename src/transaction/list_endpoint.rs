//! The JSON endpoints that list transactions and issues.

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::Response,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    db::lock_connection,
    pagination::{PageRequest, PaginationConfig},
    response::{error_response, success},
    transaction::{
        ListingQuery, ListingScope, TransactionFilters, TransactionSort, TransactionStatus,
        TransactionType, list_transactions,
    },
    validation::{
        FieldError, QueryParameter, validate_amount_filter, validate_date_range, validate_page,
        validate_page_size, validate_search_query, validate_sort_field, validate_sort_order,
    },
};

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct ListingState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how to page the listings.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ListingState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The raw query string of a listing request.
///
/// Every parameter is optional and is kept as text until it is validated, so
/// that a bad value can be reported against the parameter it came from.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub search: Option<String>,
    pub amount: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Validate the query parameters of a listing request.
///
/// Parameters are checked in a fixed order: pagination, status, type, search,
/// amount, date range, sort field and then sort order. Missing or empty
/// parameters fall back to the pagination defaults or leave the filter unset.
///
/// # Errors
/// Returns [Error::InvalidQuery] for the first parameter that is invalid.
pub fn parse_listing_query(
    params: &ListingParams,
    config: &PaginationConfig,
) -> Result<ListingQuery, Error> {
    let page = PageRequest {
        page: non_empty(&params.page)
            .map(validate_page)
            .transpose()
            .map_err(invalid(QueryParameter::Pagination))?
            .unwrap_or(config.default_page),
        page_size: non_empty(&params.page_size)
            .map(|raw| validate_page_size(raw, config.max_page_size))
            .transpose()
            .map_err(invalid(QueryParameter::Pagination))?
            .unwrap_or(config.default_page_size),
    };

    let status = non_empty(&params.status)
        .map(TransactionStatus::from_str)
        .transpose()
        .map_err(invalid(QueryParameter::Status))?;

    let transaction_type = non_empty(&params.transaction_type)
        .map(TransactionType::from_str)
        .transpose()
        .map_err(invalid(QueryParameter::Type))?;

    let search = non_empty(&params.search)
        .map(|search| validate_search_query(search).map(|_| search.to_owned()))
        .transpose()
        .map_err(invalid(QueryParameter::Search))?;

    let amount = validate_amount_filter(params.amount.as_deref().unwrap_or_default())
        .map_err(invalid(QueryParameter::Amount))?;

    let (start_date, end_date) =
        validate_date_range(params.start_date.as_deref(), params.end_date.as_deref())
            .map_err(invalid(QueryParameter::DateRange))?;

    let sort = TransactionSort {
        by: validate_sort_field(params.sort_by.as_deref().unwrap_or_default())
            .map_err(invalid(QueryParameter::SortField))?,
        order: validate_sort_order(params.sort_order.as_deref().unwrap_or_default())
            .map_err(invalid(QueryParameter::SortOrder))?,
    };

    Ok(ListingQuery {
        page,
        filters: TransactionFilters {
            status,
            transaction_type,
            search,
            amount,
            start_date,
            end_date,
        },
        sort,
    })
}

fn non_empty(param: &Option<String>) -> Option<&str> {
    param.as_deref().filter(|value| !value.trim().is_empty())
}

fn invalid(parameter: QueryParameter) -> impl Fn(FieldError) -> Error {
    move |source| Error::InvalidQuery { parameter, source }
}

/// Route handler for a page of all transactions.
pub async fn get_transactions_endpoint(
    State(state): State<ListingState>,
    params: Result<Query<ListingParams>, QueryRejection>,
) -> Response {
    list_endpoint(ListingScope::All, &state, params, "Failed to retrieve transactions")
}

/// Route handler for a page of the transactions that failed or are pending.
pub async fn get_issues_endpoint(
    State(state): State<ListingState>,
    params: Result<Query<ListingParams>, QueryRejection>,
) -> Response {
    list_endpoint(ListingScope::Issues, &state, params, "Failed to retrieve issues")
}

fn list_endpoint(
    scope: ListingScope,
    state: &ListingState,
    params: Result<Query<ListingParams>, QueryRejection>,
    server_error_message: &str,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => {
            tracing::warn!("Could not decode listing query: {}", rejection.body_text());
            return error_response(
                StatusCode::BAD_REQUEST,
                "Invalid query parameters",
                Some(rejection.body_text()),
            );
        }
    };

    let result = parse_listing_query(&params, &state.pagination_config).and_then(|query| {
        let connection = lock_connection(&state.db_connection)?;
        list_transactions(scope, &query, &connection)
    });

    match result {
        Ok(listing) => success(listing),
        Err(error) => error.into_json_response(server_error_message),
    }
}
