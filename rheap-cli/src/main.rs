//! rheap CLI - run and inspect a remote heap server.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rheap_server::observability::{TracingConfig, init_tracing};

/// rheap - a remote heap with reference-counted blocks.
#[derive(Parser)]
#[command(name = "rheap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the heap server
    Serve {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "50051")]
        port: u16,

        /// Arena size in megabytes
        #[arg(short, long, default_value = "10")]
        memsize: usize,

        /// Directory for heap dumps written after each mutation
        #[arg(short, long)]
        dump_folder: Option<String>,

        /// Milliseconds between collector ticks
        #[arg(long, default_value = "1000")]
        gc_interval_ms: u64,
    },

    /// Show usage of a running server
    Status {
        /// Server host
        #[arg(short = 'H', long, default_value = "localhost")]
        host: String,

        /// Server port
        #[arg(short, long, default_value = "50051")]
        port: u16,
    },
}

fn setup_logging(verbosity: u8) -> Result<()> {
    init_tracing(&TracingConfig::from_env().with_verbosity(verbosity))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            memsize,
            dump_folder,
            gc_interval_ms,
        } => {
            let options = commands::serve::ServeOptions {
                host,
                port,
                memsize_mb: memsize,
                dump_folder,
                gc_interval_ms,
            };
            commands::serve::run(options).await
        }
        Commands::Status { host, port } => commands::status::run(&host, port).await,
    }
}
