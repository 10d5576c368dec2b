//! The JSON envelopes wrapped around every API response.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The body of a successful response.
#[derive(Debug, Serialize)]
pub struct SuccessBody<T> {
    pub status: u16,
    pub data: T,
}

/// The body of a failed response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    /// A short, human readable summary of what failed.
    pub message: String,
    /// The underlying cause, when it is safe to show to the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Wrap `data` in a 200 OK response.
pub fn success<T: Serialize>(data: T) -> Response {
    let status = StatusCode::OK;

    (
        status,
        Json(SuccessBody {
            status: status.as_u16(),
            data,
        }),
    )
        .into_response()
}

/// Create an error response with `status`, a summary `message` and an
/// optional `error` detail.
pub fn error_response(status: StatusCode, message: &str, error: Option<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            status: status.as_u16(),
            message: message.to_owned(),
            error,
        }),
    )
        .into_response()
}

/// A message-only payload, e.g. `{"message": "All transactions deleted"}`.
#[derive(Debug, Serialize)]
pub struct MessageData {
    pub message: &'static str,
}
