//! Logging setup for the heap server and CLI.
//!
//! `RHEAP_LOG_FORMAT` picks the output (`json` for log shippers, `pretty`
//! for a terminal, `compact` otherwise) and `RHEAP_LOG_LEVEL` or `RUST_LOG`
//! the filter.
//!
//! ```no_run
//! use rheap_server::observability::{TracingConfig, init_tracing};
//!
//! # fn main() -> anyhow::Result<()> {
//! init_tracing(&TracingConfig::from_env().with_verbosity(1))?;
//! # Ok(())
//! # }
//! ```

mod config;
mod tracing_setup;

pub use config::{LogFormat, TracingConfig};
pub use tracing_setup::init_tracing;
