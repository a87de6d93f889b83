//! Health, status and snapshot endpoint handlers.

use crate::api::response;
use crate::api::state::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use std::sync::Arc;

/// GET /api/v1/health
///
/// Simple health check that returns 200 OK if the server is running.
pub async fn get_health(_state: Arc<AppState>) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "status": "healthy",
        "service": "rheap"
    });

    response::ok(&body)
}

/// GET /api/v1/status
///
/// Uptime plus allocator usage. `pending_sweep` and the refcount of live
/// blocks are what an operator watches for leaked handles.
pub async fn get_status(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let stats = state.service().stats();

    let body = serde_json::json!({
        "status": "running",
        "service": "rheap",
        "uptime_seconds": state.uptime_secs(),
        "heap": stats
    });

    response::ok(&body)
}

/// GET /api/v1/snapshot
///
/// Every table entry with its offset, size and refcount.
pub async fn get_snapshot(state: Arc<AppState>) -> Response<Full<Bytes>> {
    response::ok(&state.service().snapshot())
}
