//! Binding from protocol messages onto a [`HeapService`].
//!
//! Each function turns a request into the matching response, folding any
//! service error into the response's failure fields.

use super::messages::{
    CreateRequest, CreateResponse, GetRequest, GetResponse, RefCountRequest, RefCountResponse,
    SetRequest, SetResponse,
};
use crate::service::HeapService;
use crate::types::ElementType;

/// Serve a Create request.
pub fn create(service: &dyn HeapService, req: CreateRequest) -> CreateResponse {
    let result = ElementType::from_wire(&req.element_type, req.opaque_width)
        .and_then(|ty| service.create(ty, req.element_count));

    match result {
        Ok(id) => CreateResponse::ok(id),
        Err(e) => {
            tracing::debug!(
                element_type = %req.element_type,
                count = req.element_count,
                error = %e,
                "Create rejected"
            );
            CreateResponse::failed(&e)
        }
    }
}

/// Serve a Set request.
pub fn set(service: &dyn HeapService, req: SetRequest) -> SetResponse {
    match service.set(req.id, &req.payload) {
        Ok(()) => SetResponse::ok(),
        Err(e) => {
            tracing::debug!(id = %req.id, error = %e, "Set rejected");
            SetResponse::failed(&e)
        }
    }
}

/// Serve a Get request.
pub fn get(service: &dyn HeapService, req: GetRequest) -> GetResponse {
    match service.get(req.id) {
        Ok(payload) => GetResponse::ok(payload),
        Err(e) => {
            tracing::debug!(id = %req.id, error = %e, "Get rejected");
            GetResponse::failed(&e)
        }
    }
}

/// Serve an IncreaseRefCount request.
pub fn increase_ref_count(service: &dyn HeapService, req: RefCountRequest) -> RefCountResponse {
    match service.increase_ref_count(req.id) {
        Ok(count) => RefCountResponse::ok(count),
        Err(e) => {
            tracing::debug!(id = %req.id, error = %e, "IncreaseRefCount rejected");
            RefCountResponse::failed(&e)
        }
    }
}

/// Serve a DecreaseRefCount request.
pub fn decrease_ref_count(service: &dyn HeapService, req: RefCountRequest) -> RefCountResponse {
    match service.decrease_ref_count(req.id) {
        Ok(count) => RefCountResponse::ok(count),
        Err(e) => {
            tracing::debug!(id = %req.id, error = %e, "DecreaseRefCount rejected");
            RefCountResponse::failed(&e)
        }
    }
}
