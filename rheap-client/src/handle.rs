//! Typed handles onto remote blocks.
//!
//! A [`RemoteHandle`] owns one reference unit on the block it is bound to.
//! Every read is a fresh round trip; nothing is cached locally.
//!
//! ```text
//!   duplicate ──► IncRef            take / move_from ──► no call
//!   reset / release ──► DecRef      drop ──► DecRef, detached
//! ```

use crate::client::HeapClient;
use crate::codec::RemoteValue;
use crate::error::{ClientError, Result};
use rheap_core::BlockId;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::sync::Arc;

/// Pointer-like handle to a block holding one `T`.
///
/// A handle is either null or bound to a block id. Binding happens through
/// [`new`](Self::new), the first [`write`](Self::write), or the raw-id
/// constructors.
pub struct RemoteHandle<T: RemoteValue> {
    client: Arc<HeapClient>,
    id: BlockId,
    _marker: PhantomData<fn() -> T>,
}

impl<T: RemoteValue> RemoteHandle<T> {
    /// An unbound handle; no call is made.
    pub fn null(client: &Arc<HeapClient>) -> Self {
        Self::from_raw(client, BlockId::NULL)
    }

    /// Allocate a block for one `T` and bind a handle to it.
    pub async fn new(client: &Arc<HeapClient>) -> Result<Self> {
        let id = client.create(T::element_type(), 1).await?;
        tracing::trace!(id = %id, element_type = %T::element_type(), "Handle bound");
        Ok(Self::from_raw(client, id))
    }

    /// Take an additional reference on an existing block.
    pub async fn acquire(client: &Arc<HeapClient>, id: BlockId) -> Result<Self> {
        if !id.is_null() {
            client.increase_ref_count(id).await?;
        }
        Ok(Self::from_raw(client, id))
    }

    /// Adopt a reference unit already counted on the server, such as one
    /// returned by [`into_raw`](Self::into_raw). No call is made.
    pub fn from_raw(client: &Arc<HeapClient>, id: BlockId) -> Self {
        Self {
            client: Arc::clone(client),
            id,
            _marker: PhantomData,
        }
    }

    /// Give up the handle without releasing its reference unit.
    ///
    /// The caller becomes responsible for the unit, typically by storing the
    /// id inside another block and adopting it later with
    /// [`from_raw`](Self::from_raw).
    pub fn into_raw(mut self) -> BlockId {
        mem::take(&mut self.id)
    }

    /// Bound block id, or [`BlockId::NULL`].
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Whether the handle is unbound.
    pub fn is_null(&self) -> bool {
        self.id.is_null()
    }

    /// The client this handle talks through.
    pub fn client(&self) -> &Arc<HeapClient> {
        &self.client
    }

    /// Store `value` in the block.
    ///
    /// Writing through a null handle allocates a block first.
    pub async fn write(&mut self, value: &T) -> Result<()> {
        let bytes = value.encode();
        if bytes.len() != T::width() {
            return Err(ClientError::Codec(format!(
                "{} encoded to {} bytes, expected {}",
                std::any::type_name::<T>(),
                bytes.len(),
                T::width()
            )));
        }

        if self.is_null() {
            self.id = self.client.create(T::element_type(), 1).await?;
            tracing::trace!(id = %self.id, "Handle bound on first write");
        }

        self.client.set(self.id, bytes).await
    }

    /// Fetch a snapshot of the stored value.
    pub async fn read(&self) -> Result<T> {
        if self.is_null() {
            return Err(ClientError::NullDereference);
        }
        let bytes = self.client.get(self.id).await?;
        T::decode(&bytes)
    }

    /// A second handle on the same block, holding its own reference.
    pub async fn duplicate(&self) -> Result<Self> {
        Self::acquire(&self.client, self.id).await
    }

    /// Rebind to the block `other` refers to, taking a new reference on it
    /// and dropping the one held before.
    ///
    /// If releasing the old reference fails the handle is already rebound
    /// and the error is returned.
    pub async fn assign_from(&mut self, other: &Self) -> Result<()> {
        if self.id == other.id && Arc::ptr_eq(&self.client, &other.client) {
            return Ok(());
        }

        if !other.is_null() {
            other.client.increase_ref_count(other.id).await?;
        }

        let old_id = mem::replace(&mut self.id, other.id);
        let old_client = mem::replace(&mut self.client, Arc::clone(&other.client));
        if !old_id.is_null() {
            old_client.decrease_ref_count(old_id).await?;
        }
        Ok(())
    }

    /// Move the reference out, leaving this handle null.
    pub fn take(&mut self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            id: mem::take(&mut self.id),
            _marker: PhantomData,
        }
    }

    /// Move `other`'s reference into this handle, leaving `other` null.
    ///
    /// A reference this handle held before is released in the background.
    pub fn move_from(&mut self, other: &mut Self) {
        let old_id = mem::replace(&mut self.id, mem::take(&mut other.id));
        let old_client = mem::replace(&mut self.client, Arc::clone(&other.client));
        release_detached(&old_client, old_id);
    }

    /// Release the reference and unbind. The handle is null afterwards even
    /// when the call fails.
    pub async fn reset(&mut self) -> Result<()> {
        let id = mem::take(&mut self.id);
        if id.is_null() {
            return Ok(());
        }
        self.client.decrease_ref_count(id).await.map(|_| ())
    }

    /// Release the reference and consume the handle.
    pub async fn release(mut self) -> Result<()> {
        self.reset().await
    }
}

impl<T: RemoteValue> Drop for RemoteHandle<T> {
    fn drop(&mut self) {
        release_detached(&self.client, mem::take(&mut self.id));
    }
}

impl<T: RemoteValue> fmt::Debug for RemoteHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("type", &std::any::type_name::<T>())
            .field("id", &self.id)
            .finish()
    }
}

/// DecRef on the current runtime without waiting for it.
fn release_detached(client: &Arc<HeapClient>, id: BlockId) {
    if id.is_null() {
        return;
    }

    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            let client = Arc::clone(client);
            runtime.spawn(async move {
                if let Err(e) = client.decrease_ref_count(id).await {
                    tracing::warn!(id = %id, error = %e, "Failed to release remote reference");
                }
            });
        }
        Err(_) => {
            tracing::warn!(id = %id, "No async runtime to release remote reference, leaking it");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rheap_core::{Allocator, ElementType, HeapConfig, HeapService};

    fn setup() -> (Arc<Allocator>, Arc<HeapClient>) {
        let heap = Arc::new(Allocator::new(HeapConfig::new(64)).unwrap());
        let client = Arc::new(HeapClient::local(heap.clone()));
        (heap, client)
    }

    #[tokio::test]
    async fn null_read_fails_without_call() {
        let (heap, client) = setup();
        let handle = RemoteHandle::<i32>::null(&client);
        assert!(matches!(
            handle.read().await,
            Err(ClientError::NullDereference)
        ));
        assert_eq!(heap.stats().next_id, BlockId::new(1));
    }

    #[tokio::test]
    async fn take_leaves_source_null() {
        let (heap, client) = setup();
        let mut a = RemoteHandle::<u8>::new(&client).await.unwrap();
        let id = a.id();

        let b = a.take();
        assert!(a.is_null());
        assert_eq!(b.id(), id);
        assert_eq!(heap.block(id).unwrap().refcount, 1);

        b.release().await.unwrap();
        assert_eq!(heap.block(id).unwrap().refcount, 0);
    }

    #[tokio::test]
    async fn into_raw_keeps_the_reference() {
        let (heap, client) = setup();
        let handle = RemoteHandle::<f64>::new(&client).await.unwrap();
        let id = handle.into_raw();
        tokio::task::yield_now().await;
        assert_eq!(heap.block(id).unwrap().refcount, 1);

        let adopted = RemoteHandle::<f64>::from_raw(&client, id);
        adopted.release().await.unwrap();
        assert_eq!(heap.block(id).unwrap().refcount, 0);
    }

    #[test]
    fn drop_without_runtime_does_not_panic() {
        let (heap, client) = setup();
        let id = heap.create(ElementType::Int32, 1).unwrap();
        drop(RemoteHandle::<i32>::from_raw(&client, id));
        assert_eq!(heap.block(id).unwrap().refcount, 1);
    }

    #[test]
    fn debug_shows_type_and_id() {
        let (_heap, client) = setup();
        let handle = RemoteHandle::<bool>::null(&client);
        let text = format!("{handle:?}");
        assert!(text.contains("bool"));
        assert!(text.contains("BlockId(0)"));
    }
}
