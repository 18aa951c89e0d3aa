//! Shutdown coordination.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::http::ServerError;

/// How long the watcher gets to observe cancellation and exit.
pub const WATCHER_GRACE: Duration = Duration::from_secs(2);

/// How long in-flight requests get to finish once the listener stops.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Coordinator for graceful shutdown.
///
/// Holds one cancellation token for the watcher and one for the listener so
/// the two can be stopped in order.
#[derive(Debug, Clone)]
pub struct Shutdown {
    watcher: CancellationToken,
    listener: CancellationToken,
    watcher_grace: Duration,
    drain_timeout: Duration,
}

impl Shutdown {
    /// Create a new shutdown coordinator with the default timeouts.
    pub fn new() -> Self {
        Self::with_timeouts(WATCHER_GRACE, DRAIN_TIMEOUT)
    }

    pub fn with_timeouts(watcher_grace: Duration, drain_timeout: Duration) -> Self {
        Self {
            watcher: CancellationToken::new(),
            listener: CancellationToken::new(),
            watcher_grace,
            drain_timeout,
        }
    }

    /// Token the watcher task observes.
    pub fn watcher_token(&self) -> CancellationToken {
        self.watcher.clone()
    }

    /// Token the listener observes for graceful shutdown.
    pub fn listener_token(&self) -> CancellationToken {
        self.listener.clone()
    }

    /// Cancel everything at once, without waiting.
    pub fn trigger(&self) {
        self.watcher.cancel();
        self.listener.cancel();
    }

    pub fn is_triggered(&self) -> bool {
        self.watcher.is_cancelled() && self.listener.is_cancelled()
    }

    /// Stop the watcher, then the listener, waiting a bounded time for each.
    ///
    /// A watcher that overruns its grace is logged and abandoned. A listener
    /// that overruns the drain timeout is an error.
    pub async fn coordinate(
        &self,
        watcher: Option<JoinHandle<()>>,
        server: JoinHandle<Result<(), ServerError>>,
    ) -> Result<(), ServerError> {
        self.watcher.cancel();
        if let Some(handle) = watcher {
            match tokio::time::timeout(self.watcher_grace, handle).await {
                Ok(Ok(())) => tracing::info!("File watcher stopped"),
                Ok(Err(e)) => tracing::error!(error = %e, "File watcher task failed"),
                Err(_) => tracing::warn!(
                    grace_ms = self.watcher_grace.as_millis() as u64,
                    "File watcher stop timeout"
                ),
            }
        }

        tracing::info!("Shutting down HTTP server...");
        self.listener.cancel();
        match tokio::time::timeout(self.drain_timeout, server).await {
            Ok(joined) => joined?,
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.drain_timeout.as_millis() as u64,
                    "Server shutdown timed out with requests still in flight"
                );
                Err(ServerError::ShutdownTimeout(self.drain_timeout))
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_coordinate_cancels_in_order() {
        let shutdown = Shutdown::new();
        let watcher_token = shutdown.watcher_token();
        let listener_token = shutdown.listener_token();
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();

        let watcher = tokio::spawn({
            let listener_token = listener_token.clone();
            async move {
                watcher_token.cancelled().await;
                let _ = seen_tx.send(listener_token.is_cancelled());
            }
        });
        let server = tokio::spawn(async move {
            listener_token.cancelled().await;
            Ok(())
        });

        shutdown.coordinate(Some(watcher), server).await.unwrap();
        assert!(!seen_rx.await.unwrap(), "listener stopped before the watcher");
        assert!(shutdown.is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_watcher_does_not_block_listener() {
        let shutdown = Shutdown::with_timeouts(Duration::from_millis(50), Duration::from_secs(1));
        let watcher = tokio::spawn(std::future::pending::<()>());
        let listener_token = shutdown.listener_token();
        let server = tokio::spawn(async move {
            listener_token.cancelled().await;
            Ok(())
        });

        shutdown.coordinate(Some(watcher), server).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_timeout_is_an_error() {
        let shutdown = Shutdown::with_timeouts(Duration::from_millis(50), Duration::from_millis(100));
        let server = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        let err = shutdown.coordinate(None, server).await.unwrap_err();
        assert!(matches!(err, ServerError::ShutdownTimeout(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_propagated() {
        let shutdown = Shutdown::new();
        let server = tokio::spawn(async {
            Err(ServerError::Serve(std::io::Error::other("boom")))
        });
        let err = shutdown.coordinate(None, server).await.unwrap_err();
        assert!(matches!(err, ServerError::Serve(_)));
    }
}
