//! Request body helpers.

use super::error::ApiError;
use http_body_util::{BodyExt, Limited};
use hyper::Request;
use hyper::body::Incoming;
use serde::de::DeserializeOwned;

/// Largest accepted request body. Payloads travel as JSON arrays of bytes,
/// so this bounds a single `Set` to a few megabytes of block data.
pub const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Read the whole body and parse it as JSON.
pub async fn read_body_json<T: DeserializeOwned>(req: Request<Incoming>) -> Result<T, ApiError> {
    let body = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.is::<http_body_util::LengthLimitError>() {
                ApiError::payload_too_large(MAX_BODY_BYTES)
            } else {
                ApiError::unreadable_body(format!("Failed to read request body: {e}"))
            }
        })?
        .to_bytes();

    parse_json(&body)
}

/// Parse a JSON body.
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::malformed_body(format!("Invalid JSON body: {e}")))
}
