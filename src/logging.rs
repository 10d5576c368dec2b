//! Middleware for logging requests and responses.

use std::time::Instant;

use axum::{
    body::Body,
    extract::Request,
    http::{StatusCode, response::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Log the request and response for each request.
///
/// Every response is logged with its method, path, query, status and latency,
/// at the `error` level for server errors, `warn` for client errors and `info`
/// otherwise. The body of an error response is also logged at the `debug`
/// level, truncated to [LOG_BODY_LENGTH_LIMIT] characters.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or_default().to_owned();

    tracing::debug!("Received request: {method} {path} {:#?}", request.headers());

    let start = Instant::now();
    let response = next.run(request).await;
    let latency_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::error!(%method, %path, %query, status, latency_ms, "request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %path, %query, status, latency_ms, "request rejected");
    } else {
        tracing::info!(%method, %path, %query, status, latency_ms, "request completed");
        return response;
    }

    let (parts, body_text) = match extract_header_and_body_text_from_response(response).await {
        Ok(parts_and_body) => parts_and_body,
        Err(response) => return response,
    };
    log_response_body(&parts, &body_text);

    Response::from_parts(parts, Body::from(body_text))
}

async fn extract_header_and_body_text_from_response(
    response: Response,
) -> Result<(Parts, String), Response> {
    let (parts, body) = response.into_parts();

    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body_bytes) => Ok((parts, String::from_utf8_lossy(&body_bytes).to_string())),
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
    }
}

const LOG_BODY_LENGTH_LIMIT: usize = 256;

fn log_response_body(parts: &Parts, body: &str) {
    if body.chars().count() > LOG_BODY_LENGTH_LIMIT {
        let truncated: String = body.chars().take(LOG_BODY_LENGTH_LIMIT).collect();
        tracing::debug!("Sending response: {parts:#?}\nbody: {truncated}...");
    } else {
        tracing::debug!("Sending response: {parts:#?}\nbody: {body}");
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, middleware, routing::get};
    use axum_test::TestServer;

    use crate::logging::logging_middleware;

    #[tokio::test]
    async fn passes_responses_through() {
        let app = Router::new()
            .route("/ok", get(|| async { "fine" }))
            .route(
                "/bad",
                get(|| async { (StatusCode::BAD_REQUEST, "x".repeat(1000)) }),
            )
            .layer(middleware::from_fn(logging_middleware));
        let server = TestServer::try_new(app).expect("Could not create test server");

        let ok = server.get("/ok").await;
        ok.assert_status_ok();
        ok.assert_text("fine");

        let bad = server.get("/bad").add_query_param("page", 2).await;
        bad.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(bad.text().len(), 1000);
    }
}
