//! Request routing for the API.
//!
//! Routes requests to appropriate handlers based on method and path.

use super::API_PREFIX;
use super::error::ApiError;
use super::handlers;
use super::response;
use super::state::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

/// Paths that only accept `POST`.
const PROTOCOL_PATHS: [&str; 5] = ["/create", "/set", "/get", "/incref", "/decref"];

/// Route an incoming request to the appropriate handler.
pub async fn route(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();

    tracing::debug!(method = %method, path = %path, "Routing request");

    // Strip API prefix
    let path = path.strip_prefix(API_PREFIX).unwrap_or(&path);

    let response = match (method, path) {
        // Protocol operations
        (Method::POST, "/create") => handlers::heap::create(req, state).await,
        (Method::POST, "/set") => handlers::heap::set(req, state).await,
        (Method::POST, "/get") => handlers::heap::get(req, state).await,
        (Method::POST, "/incref") => handlers::heap::increase_ref_count(req, state).await,
        (Method::POST, "/decref") => handlers::heap::decrease_ref_count(req, state).await,
        (_, p) if PROTOCOL_PATHS.contains(&p) => response::method_not_allowed(&["POST"]),

        // Monitoring
        (Method::GET, "/health") => handlers::health::get_health(state).await,
        (Method::GET, "/status") => handlers::health::get_status(state).await,
        (Method::GET, "/snapshot") => handlers::health::get_snapshot(state).await,

        // Not found
        (_, p) => ApiError::not_found(p).into_response(),
    };

    Ok(response)
}
