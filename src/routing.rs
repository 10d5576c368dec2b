//! Application router configuration.

use std::any::Any;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Serialize;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
};

use crate::{
    AppState,
    csv_import::upload_endpoint,
    endpoints,
    logging::logging_middleware,
    response::error_response,
    transaction::{
        clear_transactions_endpoint, get_balance_endpoint, get_issues_endpoint,
        get_transactions_endpoint,
    },
};

/// Room for the multipart boundaries and headers around the uploaded file.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Return a router with all the app's routes.
///
/// Every response is logged by [logging_middleware] and a panic in a handler
/// becomes a 500 response.
pub fn build_router(state: AppState) -> Router {
    let upload_body_limit = state
        .upload_config
        .max_file_size
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(
            endpoints::UPLOAD,
            post(upload_endpoint).layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(endpoints::CLEAR, delete(clear_transactions_endpoint))
        .route(endpoints::BALANCE, get(get_balance_endpoint))
        .route(endpoints::TRANSACTIONS, get(get_transactions_endpoint))
        .route(endpoints::ISSUES, get(get_issues_endpoint))
        .fallback(get_404_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// Build the CORS layer from a comma separated list of allowed origins, or
/// `*` to allow any origin.
///
/// Origins that are not valid header values are skipped.
pub fn cors_layer(allow_origins: &str) -> CorsLayer {
    let allow_origin = if allow_origins.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allow_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(origin) => Some(origin),
                Err(error) => {
                    tracing::warn!("Skipping invalid CORS origin {origin:?}: {error}");
                    None
                }
            })
            .collect();

        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
}

#[derive(Debug, Serialize)]
struct Health<'a> {
    status: &'static str,
    service: &'a str,
}

async fn get_health(State(state): State<AppState>) -> Response {
    Json(Health {
        status: "healthy",
        service: &state.service_name,
    })
    .into_response()
}

async fn get_404_not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Resource not found", None)
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");
    tracing::error!("A request handler panicked: {detail}");

    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        Some("An unexpected error occurred".to_owned()),
    )
}
