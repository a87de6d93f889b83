//! Transport-level API errors.
//!
//! Heap errors never come through here: they are part of the protocol
//! response. An `ApiError` means the request itself could not be served.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};

/// API error with HTTP status code and error code.
#[derive(Debug)]
pub struct ApiError {
    /// Error code (e.g., "R301").
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code.
    pub status: StatusCode,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: &'static str, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            code,
            message: message.into(),
            status,
        }
    }

    /// The body could not be read.
    pub fn unreadable_body(message: impl Into<String>) -> Self {
        Self::new("R301", message, StatusCode::BAD_REQUEST)
    }

    /// The body is not valid JSON for the operation.
    pub fn malformed_body(message: impl Into<String>) -> Self {
        Self::new("R302", message, StatusCode::BAD_REQUEST)
    }

    /// The body exceeds the size limit.
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            "R303",
            format!("Request body exceeds {limit} bytes"),
            StatusCode::PAYLOAD_TOO_LARGE,
        )
    }

    /// No route matches.
    pub fn not_found(path: &str) -> Self {
        Self::new("R304", format!("No route for '{path}'"), StatusCode::NOT_FOUND)
    }

    /// The operation could not be run to completion.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("R307", message, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Convert to HTTP response.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
                "status": self.status.as_u16()
            }
        });

        let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = self.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
