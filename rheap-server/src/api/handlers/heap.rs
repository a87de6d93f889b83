//! Protocol operation handlers.
//!
//! Each handler parses the JSON body, runs the operation through
//! [`dispatch`] and answers `200 OK` with the protocol response, whether the
//! operation succeeded or not.

use crate::api::error::ApiError;
use crate::api::request;
use crate::api::response;
use crate::api::state::AppState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response};
use rheap_core::HeapService;
use rheap_core::protocol::dispatch;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

type Operation<Req, Resp> = fn(&dyn HeapService, Req) -> Resp;

async fn serve<Req, Resp>(
    req: Request<Incoming>,
    state: Arc<AppState>,
    op: Operation<Req, Resp>,
) -> Response<Full<Bytes>>
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
{
    let body: Req = match request::read_body_json(req).await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected request body");
            return e.into_response();
        }
    };

    match run_blocking(state, body, op).await {
        Ok(resp) => response::ok(&resp),
        Err(e) => e.into_response(),
    }
}

/// Run `op` on the blocking pool: it takes the heap lock and may write a
/// dump file.
async fn run_blocking<Req, Resp>(
    state: Arc<AppState>,
    body: Req,
    op: Operation<Req, Resp>,
) -> Result<Resp, ApiError>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    tokio::task::spawn_blocking(move || op(state.service(), body))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Heap operation task failed");
            ApiError::internal(format!("Operation did not complete: {e}"))
        })
}

/// POST /api/v1/create
pub async fn create(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    serve(req, state, dispatch::create).await
}

/// POST /api/v1/set
pub async fn set(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    serve(req, state, dispatch::set).await
}

/// POST /api/v1/get
pub async fn get(req: Request<Incoming>, state: Arc<AppState>) -> Response<Full<Bytes>> {
    serve(req, state, dispatch::get).await
}

/// POST /api/v1/incref
pub async fn increase_ref_count(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    serve(req, state, dispatch::increase_ref_count).await
}

/// POST /api/v1/decref
pub async fn decrease_ref_count(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    serve(req, state, dispatch::decrease_ref_count).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rheap_core::protocol::CreateRequest;
    use rheap_core::{Allocator, BlockId, HeapConfig};
    use std::thread::{self, ThreadId};

    fn state() -> Arc<AppState> {
        let allocator = Allocator::new(HeapConfig::new(16)).unwrap();
        Arc::new(AppState::new(Arc::new(allocator)))
    }

    fn current_thread(_: &dyn HeapService, _: ()) -> ThreadId {
        thread::current().id()
    }

    #[tokio::test]
    async fn operations_leave_the_runtime_thread() {
        let ran_on = run_blocking(state(), (), current_thread).await.unwrap();
        assert_ne!(ran_on, thread::current().id());
    }

    #[tokio::test]
    async fn blocking_dispatch_reaches_the_heap() {
        let state = state();
        let req = CreateRequest {
            element_type: "int32".to_string(),
            opaque_width: 0,
            element_count: 2,
        };

        let resp = run_blocking(state.clone(), req, dispatch::create)
            .await
            .unwrap();
        assert!(resp.success);
        assert_eq!(resp.id, BlockId::new(1));
        assert_eq!(state.allocator.stats().used_bytes, 8);
    }
}
