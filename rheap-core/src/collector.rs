//! Background collector.
//!
//! Every interval the collector sweeps unreferenced blocks, merges free
//! regions and lets the compaction policy decide whether to compact. A fatal
//! error ends the loop; the caller is expected to stop the process.

use crate::allocator::{Allocator, CollectionReport};
use crate::error::{HeapError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Periodic sweep and compaction over one allocator.
pub struct Collector {
    allocator: Arc<Allocator>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl Collector {
    /// Create a collector ticking at the allocator's configured interval.
    pub fn new(allocator: Arc<Allocator>) -> Self {
        let interval = allocator.collector_interval();
        Self {
            allocator,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Check if the collector is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run until `stop()` is called or a fatal error occurs.
    ///
    /// # Errors
    /// Returns the fatal error that ended the loop.
    pub async fn run(&self) -> Result<()> {
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            "Collector started"
        );

        while self.running.load(Ordering::SeqCst) {
            tokio::time::sleep(self.interval).await;

            // Collection holds the heap lock and may write a dump file.
            let allocator = Arc::clone(&self.allocator);
            let outcome = tokio::task::spawn_blocking(move || collect_once(&allocator))
                .await
                .map_err(|e| HeapError::corruption(format!("collection task failed: {e}")))
                .and_then(|result| result);
            if let Err(e) = outcome {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        tracing::info!("Collector stopped");
        Ok(())
    }

    /// Run a single collection on the calling thread.
    pub fn tick(&self) -> Result<CollectionReport> {
        collect_once(&self.allocator)
    }

    /// Stop the collector after the current tick.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

fn collect_once(allocator: &Allocator) -> Result<CollectionReport> {
    match allocator.collect() {
        Ok(report) => Ok(report),
        Err(e) if e.is_fatal() => {
            tracing::error!(code = e.code(), error = %e, "Collector hit a fatal error");
            Err(e)
        }
        Err(e) => {
            tracing::warn!(code = e.code(), error = %e, "Collection failed");
            Ok(CollectionReport::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeapConfig;
    use crate::service::HeapService;
    use crate::types::ElementType;

    fn allocator() -> Arc<Allocator> {
        Arc::new(Allocator::new(HeapConfig::new(64)).unwrap())
    }

    #[test]
    fn tick_sweeps() {
        let heap = allocator();
        let id = heap.create(ElementType::Int32, 1).unwrap();
        heap.decrease_ref_count(id).unwrap();

        let collector = Collector::new(heap.clone());
        let report = collector.tick().unwrap();
        assert_eq!(report.swept, vec![id]);
        assert_eq!(heap.stats().used_bytes, 0);
    }

    #[tokio::test]
    async fn run_until_stopped() {
        let heap = allocator();
        let collector =
            Arc::new(Collector::new(heap.clone()).with_interval(Duration::from_millis(10)));

        let task = {
            let collector = collector.clone();
            tokio::spawn(async move { collector.run().await })
        };

        let id = heap.create(ElementType::Byte, 8).unwrap();
        heap.decrease_ref_count(id).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(collector.is_running());
        assert!(heap.get(id).is_err());

        collector.stop();
        task.await.unwrap().unwrap();
        assert!(!collector.is_running());
    }

    #[tokio::test]
    async fn run_writes_dumps_from_the_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let config = HeapConfig::new(64).with_dump_dir(dir.path());
        let heap = Arc::new(Allocator::new(config).unwrap());
        let id = heap.create(ElementType::Byte, 8).unwrap();
        heap.decrease_ref_count(id).unwrap();
        let before = std::fs::read_dir(dir.path()).unwrap().count();

        let collector =
            Arc::new(Collector::new(heap.clone()).with_interval(Duration::from_millis(10)));
        let task = {
            let collector = collector.clone();
            tokio::spawn(async move { collector.run().await })
        };

        let started = std::time::Instant::now();
        while heap.get(id).is_ok() {
            assert!(started.elapsed() < Duration::from_secs(5));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        collector.stop();
        task.await.unwrap().unwrap();
        assert!(std::fs::read_dir(dir.path()).unwrap().count() > before);
    }
}
