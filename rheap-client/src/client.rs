//! The shared protocol client.

use crate::error::{ClientError, Result};
use crate::transport::{HttpTransport, LocalTransport, Transport, TransportFuture};
use rheap_core::protocol::{CreateRequest, GetRequest, RefCountRequest, Reply, SetRequest};
use rheap_core::{BlockId, ElementType, HeapService};
use std::sync::Arc;
use std::time::Duration;

/// Connection to one heap, shared by every handle.
///
/// Build it once at startup and hand an `Arc` to each handle; it holds no
/// mutable state.
///
/// # Example
///
/// ```no_run
/// use rheap_client::{HeapClient, RemoteHandle};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Arc::new(HeapClient::connect("http://localhost:50051", Duration::from_secs(30))?);
///
/// let mut counter = RemoteHandle::<i32>::new(&client).await?;
/// counter.write(&42).await?;
/// assert_eq!(counter.read().await?, 42);
/// counter.release().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HeapClient {
    transport: Arc<dyn Transport>,
    deadline: Duration,
}

impl HeapClient {
    /// Deadline used when none is given.
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

    /// Connect to a heap server over HTTP.
    ///
    /// No request is sent; an unreachable server surfaces on first use as
    /// [`ClientError::ConnectionUnavailable`].
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn connect(endpoint: impl Into<String>, deadline: Duration) -> Result<Self> {
        let transport = HttpTransport::new(endpoint, deadline)?;
        tracing::debug!(
            endpoint = transport.base_url(),
            deadline_ms = deadline.as_millis() as u64,
            "Heap client configured"
        );
        Ok(Self::with_transport(Arc::new(transport), deadline))
    }

    /// Use a heap in the same process.
    pub fn local(service: Arc<dyn HeapService>) -> Self {
        Self::with_transport(
            Arc::new(LocalTransport::new(service)),
            Self::DEFAULT_DEADLINE,
        )
    }

    /// Use a custom transport.
    pub fn with_transport(transport: Arc<dyn Transport>, deadline: Duration) -> Self {
        Self {
            transport,
            deadline,
        }
    }

    /// Set a different per-call deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Per-call deadline.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run one transport call under the deadline and turn an in-band failure
    /// into an error.
    async fn call<R: Reply>(&self, fut: TransportFuture<'_, R>) -> Result<R> {
        let reply = tokio::time::timeout(self.deadline, fut)
            .await
            .map_err(|_| ClientError::DeadlineExceeded(self.deadline))??;

        if reply.success() {
            Ok(reply)
        } else {
            Err(ClientError::from_reply(&reply))
        }
    }

    /// Create a block of `count` elements; the caller owns its first reference.
    pub async fn create(&self, element_type: ElementType, count: u64) -> Result<BlockId> {
        let req = CreateRequest::new(element_type, count);
        Ok(self.call(self.transport.create(req)).await?.id)
    }

    /// Write `payload` at the start of the block.
    pub async fn set(&self, id: BlockId, payload: Vec<u8>) -> Result<()> {
        self.call(self.transport.set(SetRequest { id, payload }))
            .await
            .map(|_| ())
    }

    /// Read the whole block.
    pub async fn get(&self, id: BlockId) -> Result<Vec<u8>> {
        Ok(self.call(self.transport.get(GetRequest { id })).await?.payload)
    }

    /// Add a reference; returns the new count.
    pub async fn increase_ref_count(&self, id: BlockId) -> Result<u32> {
        let req = RefCountRequest { id };
        Ok(self.call(self.transport.increase_ref_count(req)).await?.refcount)
    }

    /// Drop a reference; returns the new count.
    pub async fn decrease_ref_count(&self, id: BlockId) -> Result<u32> {
        let req = RefCountRequest { id };
        Ok(self.call(self.transport.decrease_ref_count(req)).await?.refcount)
    }
}

impl std::fmt::Debug for HeapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeapClient")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rheap_core::protocol::{CreateResponse, GetResponse, RefCountResponse, SetResponse};
    use rheap_core::{Allocator, HeapConfig};

    fn local_client() -> HeapClient {
        let heap = Allocator::new(HeapConfig::new(64)).unwrap();
        HeapClient::local(Arc::new(heap))
    }

    /// Never answers.
    struct Stalled;

    impl Transport for Stalled {
        fn create(&self, _req: CreateRequest) -> TransportFuture<'_, CreateResponse> {
            Box::pin(std::future::pending())
        }

        fn set(&self, _req: SetRequest) -> TransportFuture<'_, SetResponse> {
            Box::pin(std::future::pending())
        }

        fn get(&self, _req: GetRequest) -> TransportFuture<'_, GetResponse> {
            Box::pin(std::future::pending())
        }

        fn increase_ref_count(
            &self,
            _req: RefCountRequest,
        ) -> TransportFuture<'_, RefCountResponse> {
            Box::pin(std::future::pending())
        }

        fn decrease_ref_count(
            &self,
            _req: RefCountRequest,
        ) -> TransportFuture<'_, RefCountResponse> {
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test]
    async fn local_round_trip() {
        let client = local_client();
        let id = client.create(ElementType::Int32, 1).await.unwrap();
        client.set(id, 7i32.to_le_bytes().to_vec()).await.unwrap();
        assert_eq!(client.get(id).await.unwrap(), 7i32.to_le_bytes());
        assert_eq!(client.increase_ref_count(id).await.unwrap(), 2);
        assert_eq!(client.decrease_ref_count(id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn in_band_failure_becomes_error() {
        let client = local_client();
        let err = client.create(ElementType::Byte, 100).await.unwrap_err();
        assert!(matches!(err, ClientError::OutOfMemory(_)));
    }

    #[tokio::test]
    async fn deadline_bounds_each_call() {
        let client = HeapClient::with_transport(Arc::new(Stalled), Duration::from_millis(20));
        let err = client.get(BlockId::new(1)).await.unwrap_err();
        assert!(matches!(err, ClientError::DeadlineExceeded(d) if d == Duration::from_millis(20)));
    }
}
