//! Serve command - run the heap server and its collector.

use anyhow::{Context, Result, anyhow};
use rheap_core::{Allocator, Collector, HeapConfig};
use rheap_server::{ApiServer, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// Options for `rheap serve`.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Arena size in megabytes.
    pub memsize_mb: usize,
    /// Directory for heap dumps.
    pub dump_folder: Option<String>,
    /// Collector tick interval in milliseconds.
    pub gc_interval_ms: u64,
}

impl ServeOptions {
    fn heap_config(&self) -> HeapConfig {
        let config = HeapConfig::from_megabytes(self.memsize_mb)
            .with_collector_interval(Duration::from_millis(self.gc_interval_ms));
        match &self.dump_folder {
            Some(dir) => config.with_dump_dir(dir),
            None => config,
        }
    }
}

/// Run the serve command.
///
/// Returns an error when the collector stops on a fatal error, so the process
/// exits non-zero.
pub async fn run(options: ServeOptions) -> Result<()> {
    tracing::info!(
        host = %options.host,
        port = options.port,
        memsize_mb = options.memsize_mb,
        "Starting rheap server"
    );

    let allocator = Arc::new(
        Allocator::new(options.heap_config()).context("Invalid heap configuration")?,
    );
    let collector = Arc::new(Collector::new(Arc::clone(&allocator)));

    let mut server = ApiServer::new(
        ServerConfig::new(options.host.clone(), options.port),
        Arc::clone(&allocator),
    );
    let addr = server.bind().await.context("Failed to bind the API server")?;

    println!("Starting rheap server...");
    println!();
    println!("Server: http://{}", addr);
    println!("Arena:  {} MB", options.memsize_mb);
    if let Some(dir) = &options.dump_folder {
        println!("Dumps:  {}", dir);
    }
    println!();
    println!("Endpoints:");
    println!("  POST /api/v1/create    - Allocate a block");
    println!("  POST /api/v1/set       - Write a block");
    println!("  POST /api/v1/get       - Read a block");
    println!("  POST /api/v1/incref    - Add a reference");
    println!("  POST /api/v1/decref    - Drop a reference");
    println!("  GET  /api/v1/status    - Heap usage");
    println!("  GET  /api/v1/snapshot  - Block table");
    println!();
    println!("Press Ctrl+C to stop.");
    println!();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(server.run_until(async {
        let _ = stop_rx.await;
    }));

    let background = Arc::clone(&collector);
    let mut collector_task = tokio::spawn(async move { background.run().await });

    let outcome = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            println!();
            println!("Shutting down...");
            signal.context("Failed to listen for Ctrl+C")
        }
        joined = &mut collector_task => match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(anyhow::Error::new(e).context("Collector stopped on a fatal error")),
            Err(e) => Err(anyhow!("Collector task failed: {e}")),
        },
    };

    collector.stop();
    let _ = stop_tx.send(());
    server_task
        .await
        .context("API server task failed")?
        .context("API server failed")?;

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_map_to_heap_config() {
        let options = ServeOptions {
            host: "127.0.0.1".to_string(),
            port: 0,
            memsize_mb: 2,
            dump_folder: Some("/tmp/rheap".to_string()),
            gc_interval_ms: 250,
        };

        let config = options.heap_config();
        assert_eq!(config.arena_size, 2 * 1024 * 1024);
        assert_eq!(config.collector_interval, Duration::from_millis(250));
        assert_eq!(
            config.dump_dir.as_deref(),
            Some(std::path::Path::new("/tmp/rheap"))
        );
    }
}
