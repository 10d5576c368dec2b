use axum::{
    body::Body,
    extract::{FromRequest, Multipart},
    http::{Request, StatusCode},
    response::Response,
};

use crate::endpoints;

#[track_caller]
pub(crate) fn assert_status_ok(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::OK);
}

#[track_caller]
pub(crate) fn assert_content_type(response: &Response<Body>, content_type: &str) {
    let content_type_header = response
        .headers()
        .get("content-type")
        .expect("content-type header missing");
    assert_eq!(content_type_header, content_type);
}

/// Read the whole response body as JSON.
pub(crate) async fn parse_json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read response body");

    serde_json::from_slice(&body).expect("Response body is not JSON")
}

/// Build a multipart form with a single file field.
pub(crate) async fn must_make_multipart(
    field_name: &str,
    file_name: &str,
    content: &str,
) -> Multipart {
    let boundary = "MY_BOUNDARY123456789";
    let boundary_start = format!("--{boundary}");
    let boundary_end = format!("--{boundary}--");
    let content_disposition =
        format!("Content-Disposition: form-data; name=\"{field_name}\"; filename=\"{file_name}\"");

    let lines = [
        boundary_start.as_str(),
        content_disposition.as_str(),
        "Content-Type: text/csv",
        "",
        content,
        boundary_end.as_str(),
    ];

    let data = lines.join("\r\n").into_bytes();

    let request = Request::builder()
        .method("POST")
        .uri(endpoints::UPLOAD)
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(data))
        .unwrap();

    Multipart::from_request(request, &()).await.unwrap()
}
