//! HTTP server setup and connection handling.

use super::router;
use super::state::AppState;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use rheap_core::Allocator;
use rheap_core::error::{HeapError, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Configuration for the API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on; 0 picks an ephemeral port.
    pub port: u16,
}

impl ServerConfig {
    /// Create a new server configuration.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50051,
        }
    }
}

/// HTTP API server for one heap.
pub struct ApiServer {
    /// Server configuration.
    config: ServerConfig,
    /// Shared application state.
    state: Arc<AppState>,
    /// Listener, once bound.
    listener: Option<TcpListener>,
}

impl ApiServer {
    /// Create a new API server.
    pub fn new(config: ServerConfig, allocator: Arc<Allocator>) -> Self {
        Self {
            config,
            state: Arc::new(AppState::new(allocator)),
            listener: None,
        }
    }

    /// Get a reference to the application state.
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Bind the listening socket and return the bound address.
    ///
    /// Calling `run_until` without `bind` binds implicitly.
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        let listener = self.listen().await?;
        let addr = listener.local_addr().map_err(|e| self.io_error(e))?;
        self.listener = Some(listener);
        Ok(addr)
    }

    async fn listen(&self) -> Result<TcpListener> {
        TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|e| self.io_error(e))
    }

    /// Address the server is bound to, if bound.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    /// Serve connections until `shutdown` resolves.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => self.listen().await?,
        };

        tracing::info!(
            host = %self.config.host,
            addr = ?listener.local_addr().ok(),
            "API server started"
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, remote_addr) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    let io = TokioIo::new(stream);
                    let state = Arc::clone(&self.state);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { router::route(req, state).await }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            if !e.is_incomplete_message() {
                                tracing::warn!(
                                    remote = %remote_addr,
                                    error = %e,
                                    "HTTP connection error"
                                );
                            }
                        }
                    });
                }
                _ = &mut shutdown => {
                    tracing::info!("API server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    fn io_error(&self, e: std::io::Error) -> HeapError {
        HeapError::Io {
            path: PathBuf::from(format!("{}:{}", self.config.host, self.config.port)),
            cause: e.to_string(),
        }
    }
}
