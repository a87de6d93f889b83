//! Transports carrying protocol messages to a heap.
//!
//! [`HttpTransport`] talks to a remote `rheap` server; [`LocalTransport`]
//! serves the same messages from an in-process [`HeapService`], which is
//! what tests and embedded uses want.

use crate::error::{ClientError, Result};
use reqwest::{Client as HttpClient, Response};
use rheap_core::HeapService;
use rheap_core::protocol::{
    CreateRequest, CreateResponse, GetRequest, GetResponse, RefCountRequest, RefCountResponse,
    SetRequest, SetResponse, dispatch,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Carries one protocol request to the heap and brings back its response.
///
/// A transport only fails for transport reasons; heap errors arrive inside
/// the response.
pub trait Transport: Send + Sync {
    /// Send a Create request.
    fn create(&self, req: CreateRequest) -> TransportFuture<'_, CreateResponse>;

    /// Send a Set request.
    fn set(&self, req: SetRequest) -> TransportFuture<'_, SetResponse>;

    /// Send a Get request.
    fn get(&self, req: GetRequest) -> TransportFuture<'_, GetResponse>;

    /// Send an IncreaseRefCount request.
    fn increase_ref_count(&self, req: RefCountRequest) -> TransportFuture<'_, RefCountResponse>;

    /// Send a DecreaseRefCount request.
    fn decrease_ref_count(&self, req: RefCountRequest) -> TransportFuture<'_, RefCountResponse>;
}

/// JSON over HTTP to a heap server.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Base URL of the server.
    base_url: String,
    /// HTTP client.
    http: HttpClient,
    /// Per-request timeout configured on `http`.
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport for `base_url` (e.g., "http://localhost:50051").
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::InvalidUrl(format!(
                "URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let http = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            http,
            timeout,
        })
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path.
    fn url(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        format!("{}/api/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        self.handle_response(response).await
    }

    /// Deserialize a protocol response; any non-200 status is outside the
    /// protocol.
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            return response.json::<T>().await.map_err(|e| self.map_error(e));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| {
                json["error"]["message"]
                    .as_str()
                    .or_else(|| json["error"].as_str())
                    .map(str::to_string)
            })
            .unwrap_or(body);

        Err(ClientError::Protocol {
            status: status.as_u16(),
            message,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> ClientError {
        if err.is_timeout() {
            ClientError::DeadlineExceeded(self.timeout)
        } else {
            err.into()
        }
    }
}

impl Transport for HttpTransport {
    fn create(&self, req: CreateRequest) -> TransportFuture<'_, CreateResponse> {
        Box::pin(async move { self.post("create", &req).await })
    }

    fn set(&self, req: SetRequest) -> TransportFuture<'_, SetResponse> {
        Box::pin(async move { self.post("set", &req).await })
    }

    fn get(&self, req: GetRequest) -> TransportFuture<'_, GetResponse> {
        Box::pin(async move { self.post("get", &req).await })
    }

    fn increase_ref_count(&self, req: RefCountRequest) -> TransportFuture<'_, RefCountResponse> {
        Box::pin(async move { self.post("incref", &req).await })
    }

    fn decrease_ref_count(&self, req: RefCountRequest) -> TransportFuture<'_, RefCountResponse> {
        Box::pin(async move { self.post("decref", &req).await })
    }
}

/// Serves requests from a heap in the same process.
#[derive(Clone)]
pub struct LocalTransport {
    service: Arc<dyn HeapService>,
}

impl LocalTransport {
    /// Wrap a heap service.
    pub fn new(service: Arc<dyn HeapService>) -> Self {
        Self { service }
    }
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport").finish_non_exhaustive()
    }
}

impl Transport for LocalTransport {
    fn create(&self, req: CreateRequest) -> TransportFuture<'_, CreateResponse> {
        Box::pin(async move { Ok(dispatch::create(self.service.as_ref(), req)) })
    }

    fn set(&self, req: SetRequest) -> TransportFuture<'_, SetResponse> {
        Box::pin(async move { Ok(dispatch::set(self.service.as_ref(), req)) })
    }

    fn get(&self, req: GetRequest) -> TransportFuture<'_, GetResponse> {
        Box::pin(async move { Ok(dispatch::get(self.service.as_ref(), req)) })
    }

    fn increase_ref_count(&self, req: RefCountRequest) -> TransportFuture<'_, RefCountResponse> {
        Box::pin(async move { Ok(dispatch::increase_ref_count(self.service.as_ref(), req)) })
    }

    fn decrease_ref_count(&self, req: RefCountRequest) -> TransportFuture<'_, RefCountResponse> {
        Box::pin(async move { Ok(dispatch::decrease_ref_count(self.service.as_ref(), req)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_url() {
        let result = HttpTransport::new("localhost:50051", Duration::from_secs(1));
        match result {
            Err(ClientError::InvalidUrl(msg)) => assert!(msg.contains("http://")),
            other => panic!("Expected InvalidUrl error, got {other:?}"),
        }
    }

    #[test]
    fn url_building() {
        let transport =
            HttpTransport::new("http://localhost:50051/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.url("create"),
            "http://localhost:50051/api/v1/create"
        );
        assert_eq!(transport.url("/get"), "http://localhost:50051/api/v1/get");
    }
}
