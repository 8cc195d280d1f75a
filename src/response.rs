//! HTTP response builders.
//!
//! Every response the broker writes goes through one of these helpers so the
//! status and content type stay consistent.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Response body type used throughout spapi.
pub type Body = Full<Bytes>;

/// Full response type used throughout spapi.
pub type HttpResponse = Response<Body>;

fn build(status: StatusCode, content_type: Option<&'static str>, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

/// Build a JSON response with the given status code and body.
pub fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> crate::Result<HttpResponse> {
    let json = serde_json::to_vec(body)?;
    Ok(build(status, Some("application/json"), Bytes::from(json)))
}

/// Build a 200 OK JSON response.
pub fn ok<T: Serialize + ?Sized>(body: &T) -> crate::Result<HttpResponse> {
    json(StatusCode::OK, body)
}

/// Build a `text/plain` response.
pub fn text(status: StatusCode, body: impl Into<String>) -> HttpResponse {
    build(status, Some("text/plain"), Bytes::from(body.into()))
}

/// Build a response with no body and no content type.
pub fn empty(status: StatusCode) -> HttpResponse {
    build(status, None, Bytes::new())
}

/// The generic body written for any unhandled error.
pub const APPLICATION_ERROR: &str = "Application Error";

/// Build the generic 500 response. Never carries error detail.
pub fn application_error() -> HttpResponse {
    text(StatusCode::INTERNAL_SERVER_ERROR, APPLICATION_ERROR)
}

/// Build a 404 Not Found JSON response.
pub fn not_found(message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message });
    build(
        StatusCode::NOT_FOUND,
        Some("application/json"),
        Bytes::from(body.to_string()),
    )
}

/// Build a JSON error response for failures outside the broker (body
/// limits, connection limits).
pub fn error(status: StatusCode, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message });
    build(status, Some("application/json"), Bytes::from(body.to_string()))
}
