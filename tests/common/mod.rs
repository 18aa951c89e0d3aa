//! Shared utilities for integration and load testing.

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mockr::lifecycle::startup::serve;
use mockr::lifecycle::{ServerOptions, StartupError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Write `json` to `dir/name` and return the path.
pub fn write_config(dir: &Path, name: &str, json: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, json).unwrap();
    path
}

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), StartupError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Deliver the termination signal and wait for shutdown to finish.
    pub async fn stop(self) -> Result<(), StartupError> {
        let _ = self.stop_tx.send(());
        self.handle.await.unwrap()
    }
}

/// Start a server the same way `mockr start` does, minus OS signals.
pub async fn start_server(config_path: &Path, options: ServerOptions) -> TestServer {
    let initial = mockr::load_config(config_path).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(serve(
        config_path.to_path_buf(),
        initial,
        options,
        listener,
        async move {
            let _ = stop_rx.await;
        },
    ));

    TestServer {
        addr,
        stop_tx,
        handle,
    }
}

/// HTTP client that never reuses pooled connections or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Wait until the server answers its liveness probe.
#[allow(dead_code)]
pub async fn wait_ready(client: &reqwest::Client, server: &TestServer) {
    let ready = eventually(Duration::from_secs(5), move || async move {
        matches!(
            client.get(server.url("/health")).send().await,
            Ok(res) if res.status().is_success()
        )
    })
    .await;
    assert!(ready, "server at {} never became ready", server.addr);
}

/// Poll `check` every 50ms until it returns true or `timeout` elapses.
#[allow(dead_code)]
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
