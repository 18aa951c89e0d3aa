//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration (fatal on error)
//! - Build the rate limiter and optional metrics exporter
//! - Start the config watcher, then the listener
//! - Hand over to the shutdown coordinator on termination
//!
//! # Design Decisions
//! - Fail fast: only an unreadable config or a failed bind stops startup
//! - A watcher that cannot start is logged; the server runs without reloads

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{load_config, ConfigError, ConfigWatcher, ReloadOutcome, ValidationResult};
use crate::http::server::bind;
use crate::http::{MockServer, ServerError};
use crate::lifecycle::shutdown::{Shutdown, DRAIN_TIMEOUT, WATCHER_GRACE};
use crate::lifecycle::signals;
use crate::observability::metrics;
use crate::routing::RouteStore;
use crate::security::RateLimiter;

/// Process options for `start`.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub host: String,
    pub port: u16,
    /// Hot reload on file changes.
    pub watch: bool,
    /// Requests per second across all routes; 0 disables limiting.
    pub rate_limit: f64,
    /// Bucket capacity; only used when `rate_limit > 0`.
    pub burst: u32,
    /// Prometheus scrape address. No exporter when unset.
    pub metrics_address: Option<SocketAddr>,
    pub watcher_grace: Duration,
    pub drain_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            watch: true,
            rate_limit: 0.0,
            burst: 0,
            metrics_address: None,
            watcher_grace: WATCHER_GRACE,
            drain_timeout: DRAIN_TIMEOUT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Run the server until SIGINT/SIGTERM. Returns the process exit code.
pub async fn start(config_path: &Path, options: ServerOptions) -> ExitCode {
    match bootstrap(config_path, options).await {
        Ok(()) => {
            tracing::info!("Server shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "mockr exiting");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn bootstrap(config_path: &Path, options: ServerOptions) -> Result<(), StartupError> {
    let initial = load_config(config_path)?;
    println!("{}", initial);

    let listener = bind(&options.host, options.port).await?;
    serve(config_path.to_path_buf(), initial, options, listener, signals::termination()).await
}

/// Serve `initial` on `listener` until `shutdown_signal` resolves, then
/// stop the watcher and drain the listener.
pub async fn serve<F>(
    config_path: PathBuf,
    initial: ValidationResult,
    options: ServerOptions,
    listener: TcpListener,
    shutdown_signal: F,
) -> Result<(), StartupError>
where
    F: Future<Output = ()> + Send,
{
    metrics::record_route_count(initial.valid_routes.len());
    let routes = RouteStore::new(initial.valid_routes);
    routes.snapshot().log_routes();

    let limiter = RateLimiter::new(options.rate_limit, options.burst).map(Arc::new);
    if let Some(limiter) = &limiter {
        tracing::info!(
            rate = limiter.refill_per_second(),
            burst = limiter.capacity(),
            "Rate limiting enabled: {:.2} req/s, burst: {}",
            limiter.refill_per_second(),
            limiter.capacity()
        );
    }

    if let Some(addr) = options.metrics_address {
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter");
        }
    }

    let shutdown = Shutdown::with_timeouts(options.watcher_grace, options.drain_timeout);

    let watcher = if options.watch {
        let (watcher, outcomes) = ConfigWatcher::new(&config_path, routes.clone());
        match watcher.spawn(shutdown.watcher_token()) {
            Ok(handle) => {
                tokio::spawn(track_reloads(outcomes));
                Some(handle)
            }
            Err(e) => {
                tracing::error!(error = %e, "Config watcher failed to start, hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    let server = MockServer::new(routes, limiter);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.listener_token()));

    tokio::select! {
        joined = &mut server_task => {
            shutdown.trigger();
            if let Some(handle) = watcher {
                let _ = tokio::time::timeout(options.watcher_grace, handle).await;
            }
            return match joined {
                Ok(result) => result.map_err(StartupError::from),
                Err(e) => Err(ServerError::from(e).into()),
            };
        }
        _ = shutdown_signal => {}
    }

    shutdown.coordinate(watcher, server_task).await?;
    Ok(())
}

/// Counts of reload attempts by outcome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReloadTally {
    pub applied: usize,
    pub rejected: usize,
    pub failed: usize,
}

/// Consume reload outcomes until the watcher goes away, then log the tally.
pub async fn track_reloads(mut outcomes: mpsc::UnboundedReceiver<ReloadOutcome>) -> ReloadTally {
    let mut tally = ReloadTally::default();
    while let Some(outcome) = outcomes.recv().await {
        tracing::debug!(outcome = outcome.label(), "Reload attempt finished");
        match outcome {
            ReloadOutcome::Applied { .. } => tally.applied += 1,
            ReloadOutcome::SymlinkMismatch { .. } => tally.rejected += 1,
            ReloadOutcome::Failed(_) => tally.failed += 1,
        }
    }

    tracing::info!(
        applied = tally.applied,
        rejected = tally.rejected,
        failed = tally.failed,
        "Hot reload stopped"
    );
    tally
}
