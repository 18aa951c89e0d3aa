//! mockr: serve mock HTTP responses from a JSON route file.
//!
//! # Architecture Overview
//!
//! ```text
//!   routes.json ──write──▶ watcher (debounce + symlink pin)
//!                              │
//!                              ▼
//!                          validation ──▶ RouteStore (atomic swap)
//!                                              │ snapshot per request
//!                                              ▼
//!   Client ──▶ access log ──▶ rate limit ──▶ body limit ──▶ dispatch
//!                                                           │
//!                                      /health | route | 404
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};

use mockr::lifecycle::{self, ServerOptions};
use mockr::observability::logging;

#[derive(Parser)]
#[command(name = "mockr", version)]
#[command(about = "Mock HTTP server driven by a hot-reloaded JSON route file", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start serving routes from a config file
    Start(StartArgs),
}

#[derive(Args)]
struct StartArgs {
    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to run the server on
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Enable hot reload file watching
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    watch: bool,

    /// Rate limit in requests per second (0 = disabled)
    #[arg(long = "rate-limit", default_value_t = 0.0)]
    rate_limit: f64,

    /// Burst size for rate limiting (only used if rate-limit > 0)
    #[arg(long, default_value_t = 0)]
    burst: u32,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<SocketAddr>,

    /// Route configuration file (JSON)
    config: PathBuf,
}

impl StartArgs {
    fn into_options(self) -> (PathBuf, ServerOptions) {
        let options = ServerOptions {
            host: self.host,
            port: self.port,
            watch: self.watch,
            rate_limit: self.rate_limit,
            burst: self.burst,
            metrics_address: self.metrics_address,
            ..ServerOptions::default()
        };
        (self.config, options)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init();

    match cli.command {
        Commands::Start(args) => {
            tracing::info!("mockr v{} starting", env!("CARGO_PKG_VERSION"));
            let (config, options) = args.into_options();
            lifecycle::start(&config, options).await
        }
    }
}
