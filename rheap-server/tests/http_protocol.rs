//! End-to-end tests against a real server on an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;

use rheap_core::protocol::{
    CreateRequest, CreateResponse, ErrorKind, GetRequest, GetResponse, RefCountRequest,
    RefCountResponse, SetRequest, SetResponse,
};
use rheap_core::{Allocator, BlockId, Collector, ElementType, HeapConfig};
use rheap_server::{ApiServer, ServerConfig};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    allocator: Arc<Allocator>,
    http: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl TestServer {
    async fn start(arena_size: usize) -> Self {
        let allocator = Arc::new(Allocator::new(HeapConfig::new(arena_size)).unwrap());
        let mut server = ApiServer::new(ServerConfig::new("127.0.0.1", 0), allocator.clone());
        let addr = server.bind().await.unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            server
                .run_until(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            allocator,
            http: reqwest::Client::new(),
            shutdown: Some(tx),
            task: Some(task),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}/api/v1{}", self.addr, path)
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(&self, path: &str, body: &Req) -> Resp {
        let response = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        response.json().await.unwrap()
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.await.unwrap();
        }
    }
}

#[tokio::test]
async fn round_trip_over_http() {
    let server = TestServer::start(64).await;

    let created: CreateResponse = server
        .post("/create", &CreateRequest::new(ElementType::Int32, 1))
        .await;
    assert!(created.success);
    assert_eq!(created.id, BlockId::new(1));

    let set: SetResponse = server
        .post(
            "/set",
            &SetRequest {
                id: created.id,
                payload: 42i32.to_le_bytes().to_vec(),
            },
        )
        .await;
    assert!(set.success);

    let got: GetResponse = server.post("/get", &GetRequest { id: created.id }).await;
    assert!(got.success);
    assert_eq!(got.payload, 42i32.to_le_bytes());

    server.stop().await;
}

#[tokio::test]
async fn errors_travel_in_band() {
    let server = TestServer::start(16).await;

    let created: CreateResponse = server
        .post("/create", &CreateRequest::new(ElementType::Byte, 20))
        .await;
    assert!(!created.success);
    assert_eq!(created.error_kind, Some(ErrorKind::OutOfMemory));
    assert!(created.error_message.starts_with("R001"));

    let got: GetResponse = server
        .post("/get", &GetRequest { id: BlockId::new(99) })
        .await;
    assert_eq!(got.error_kind, Some(ErrorKind::InvalidId));

    server.stop().await;
}

#[tokio::test]
async fn refcounts_and_sweep() {
    let server = TestServer::start(64).await;

    let id = server
        .post::<_, CreateResponse>("/create", &CreateRequest::new(ElementType::Float64, 1))
        .await
        .id;

    let inc: RefCountResponse = server.post("/incref", &RefCountRequest { id }).await;
    assert_eq!(inc.refcount, 2);
    let dec: RefCountResponse = server.post("/decref", &RefCountRequest { id }).await;
    assert_eq!(dec.refcount, 1);
    let dec: RefCountResponse = server.post("/decref", &RefCountRequest { id }).await;
    assert_eq!(dec.refcount, 0);

    Collector::new(server.allocator.clone()).tick().unwrap();

    let got: GetResponse = server.post("/get", &GetRequest { id }).await;
    assert_eq!(got.error_kind, Some(ErrorKind::InvalidId));

    server.stop().await;
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let server = TestServer::start(16).await;

    let response = server
        .http
        .post(server.url("/create"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let response = server.http.get(server.url("/create")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::METHOD_NOT_ALLOWED);

    let response = server.http.get(server.url("/nope")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

    server.stop().await;
}

#[tokio::test]
async fn status_endpoint_reports_stats() {
    let server = TestServer::start(32).await;
    let _: CreateResponse = server
        .post("/create", &CreateRequest::new(ElementType::Bool, 3))
        .await;

    let status: serde_json::Value = server
        .http
        .get(server.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["heap"]["used_bytes"], 3);
    assert_eq!(status["heap"]["used_blocks"], 1);

    server.stop().await;
}
