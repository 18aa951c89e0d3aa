//! Configuration file watcher for hot reload.
//!
//! # State Machine
//! ```text
//! Idle ──(event names the file)──▶ Armed ──(window elapses)──▶ Reloading ──▶ Idle
//!            Armed ──(another matching event)──▶ Armed (timer restarted)
//! any state ──(cancellation)──▶ Stopped (pending timer dropped)
//! ```
//!
//! The containing directory is watched rather than the file itself so that
//! editors which save by renaming a temp file over the original are still
//! observed. Before every reload the configured path is re-resolved and
//! compared with the [`WatchPin`] taken at startup; a different target means
//! the name was re-pointed and the reload is refused.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant, Sleep};
use tokio_util::sync::CancellationToken;

use crate::config::loader::load_config;
use crate::observability::metrics;
use crate::routing::RouteStore;

/// Quiescence period before a burst of writes triggers a reload.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// Error type for starting the watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("error resolving config file path '{}': {source}", path.display())]
    Resolve { path: PathBuf, source: io::Error },

    #[error("config path '{}' has no file name", .0.display())]
    NoFileName(PathBuf),

    #[error("file watcher error: {0}")]
    Backend(#[from] notify::Error),
}

/// Where the config file lives, pinned when watching starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPin {
    pub canonical_path: PathBuf,
    pub watched_directory: PathBuf,
    pub watched_filename: OsString,
}

impl WatchPin {
    /// Resolve `config_path` through every symlink.
    pub fn resolve(config_path: &Path) -> Result<Self, WatchError> {
        let canonical_path =
            fs::canonicalize(config_path).map_err(|source| WatchError::Resolve {
                path: config_path.to_path_buf(),
                source,
            })?;

        let watched_filename = config_path
            .file_name()
            .ok_or_else(|| WatchError::NoFileName(config_path.to_path_buf()))?
            .to_os_string();

        let watched_directory = match config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            canonical_path,
            watched_directory,
            watched_filename,
        })
    }

    /// Directories to subscribe to: the configured name's directory, plus
    /// the symlink target's directory when it lives elsewhere.
    pub fn directories(&self) -> Vec<PathBuf> {
        let configured = fs::canonicalize(&self.watched_directory)
            .unwrap_or_else(|_| self.watched_directory.clone());
        let mut dirs = vec![configured];
        if let Some(target_dir) = self.canonical_path.parent() {
            if !dirs.iter().any(|d| d == target_dir) {
                dirs.push(target_dir.to_path_buf());
            }
        }
        dirs
    }

    /// True if `event` touches the configured name or its target.
    pub fn matches(&self, event: &Event) -> bool {
        let target_name = self.canonical_path.file_name();
        event
            .paths
            .iter()
            .filter_map(|p| p.file_name())
            .any(|name| name == self.watched_filename || Some(name) == target_name)
    }
}

/// Single-slot pending timer with cancel-and-replace semantics.
#[derive(Debug)]
pub struct Debounce {
    window: Duration,
    pending: Option<Pin<Box<Sleep>>>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    /// Start the timer, or push back the one already pending.
    pub fn arm(&mut self) {
        let deadline = Instant::now() + self.window;
        match self.pending.as_mut() {
            Some(timer) => timer.as_mut().reset(deadline),
            None => self.pending = Some(Box::pin(sleep_until(deadline))),
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolves once the pending timer elapses; never resolves while idle.
    /// Cancel-safe: dropping this future leaves the timer in place.
    pub async fn fired(&mut self) {
        match self.pending.as_mut() {
            Some(timer) => {
                timer.as_mut().await;
                self.pending = None;
            }
            None => std::future::pending().await,
        }
    }
}

/// Result of one reload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// New table is live.
    Applied { routes: usize, skipped: usize },
    /// Symlink target drifted from the pin; previous table kept.
    SymlinkMismatch { pinned: PathBuf, found: PathBuf },
    /// Could not resolve, read or parse; previous table kept.
    Failed(String),
}

impl ReloadOutcome {
    /// Short name used as the metrics label.
    pub fn label(&self) -> &'static str {
        match self {
            ReloadOutcome::Applied { .. } => "applied",
            ReloadOutcome::SymlinkMismatch { .. } => "symlink_mismatch",
            ReloadOutcome::Failed(_) => "failed",
        }
    }
}

/// The blocking half of a reload: resolve, read, parse, validate, publish.
#[derive(Clone)]
struct Reloader {
    path: PathBuf,
    routes: RouteStore,
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    reloader: Reloader,
    window: Duration,
    outcome_tx: mpsc::UnboundedSender<ReloadOutcome>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher that publishes into `routes`.
    ///
    /// Returns the watcher and a receiver for reload outcomes.
    pub fn new(path: &Path, routes: RouteStore) -> (Self, mpsc::UnboundedReceiver<ReloadOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        (
            Self {
                reloader: Reloader {
                    path: path.to_path_buf(),
                    routes,
                },
                window: DEBOUNCE_WINDOW,
                outcome_tx,
            },
            outcome_rx,
        )
    }

    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Pin the path, subscribe to its directory and spawn the watch loop.
    ///
    /// Setup errors are returned here; errors after that are logged and end
    /// the task while the server keeps its last table.
    pub fn spawn(self, shutdown: CancellationToken) -> Result<JoinHandle<()>, WatchError> {
        let pin = WatchPin::resolve(&self.reloader.path)?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = event_tx.send(res);
        })?;
        for dir in pin.directories() {
            watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        }

        tracing::info!(
            path = %self.reloader.path.display(),
            canonical = %pin.canonical_path.display(),
            "Config watcher started"
        );

        Ok(tokio::spawn(self.run(pin, watcher, event_rx, shutdown)))
    }

    async fn run(
        self,
        pin: WatchPin,
        _watcher: RecommendedWatcher,
        mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
        shutdown: CancellationToken,
    ) {
        let mut debounce = Debounce::new(self.window);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debounce.cancel();
                    tracing::info!("Stopping config watcher due to shutdown signal");
                    break;
                }
                event = events.recv() => match event {
                    Some(Ok(event)) => {
                        if is_content_change(&event) && pin.matches(&event) {
                            debounce.arm();
                        }
                    }
                    Some(Err(e)) => {
                        tracing::error!(error = %e, "Watch error, config watcher stopping");
                        break;
                    }
                    None => break,
                },
                _ = debounce.fired() => {
                    let reloader = self.reloader.clone();
                    let pinned = pin.clone();
                    let reload = tokio::task::spawn_blocking(move || reloader.reload(&pinned));

                    let outcome = tokio::select! {
                        biased;

                        _ = shutdown.cancelled() => {
                            tracing::info!("Stopping config watcher due to shutdown signal");
                            break;
                        }
                        joined = reload => joined.unwrap_or_else(|e| ReloadOutcome::Failed(e.to_string())),
                    };
                    metrics::record_reload(outcome.label());
                    let _ = self.outcome_tx.send(outcome);
                }
            }
        }
    }
}

impl Reloader {
    /// Re-check the pin, then load and swap. Never fatal. Blocks on the
    /// filesystem, so the watch loop runs it off the async workers.
    fn reload(&self, pin: &WatchPin) -> ReloadOutcome {
        let current = match WatchPin::resolve(&self.path) {
            Ok(current) => current,
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
                return ReloadOutcome::Failed(e.to_string());
            }
        };

        if current.canonical_path != pin.canonical_path {
            tracing::warn!(
                pinned = %pin.canonical_path.display(),
                found = %current.canonical_path.display(),
                "Config file path resolution changed, ignoring reload for security"
            );
            return ReloadOutcome::SymlinkMismatch {
                pinned: pin.canonical_path.clone(),
                found: current.canonical_path,
            };
        }

        match load_config(&pin.canonical_path) {
            Ok(result) => {
                let routes = result.valid_routes.len();
                let skipped = result.skipped_count;
                self.routes.replace(result.valid_routes);
                metrics::record_route_count(routes);
                tracing::info!(routes, skipped, "config reloaded ({} routes)", routes);
                self.routes.snapshot().log_routes();
                ReloadOutcome::Applied { routes, skipped }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config. Keeping current configuration.");
                ReloadOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Writes, creates and renames count; reads do not.
fn is_content_change(event: &Event) -> bool {
    event.kind.is_modify() || event.kind.is_create()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, EventKind, ModifyKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_fires_once_after_quiet_period() {
        let mut debounce = Debounce::new(Duration::from_millis(200));
        assert!(!debounce.is_armed());

        debounce.arm();
        tokio::time::advance(Duration::from_millis(150)).await;
        debounce.arm();
        tokio::time::advance(Duration::from_millis(150)).await;
        debounce.arm();

        let start = Instant::now();
        debounce.fired().await;
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(200), "fired early: {:?}", waited);
        assert!(waited < Duration::from_millis(250), "fired late: {:?}", waited);
        assert!(!debounce.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_debounce_never_fires() {
        let mut debounce = Debounce::new(Duration::from_millis(10));
        let fired = tokio::time::timeout(Duration::from_secs(5), debounce.fired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_timer() {
        let mut debounce = Debounce::new(Duration::from_millis(10));
        debounce.arm();
        debounce.cancel();
        assert!(!debounce.is_armed());
        let fired = tokio::time::timeout(Duration::from_secs(1), debounce.fired()).await;
        assert!(fired.is_err());
    }

    #[test]
    fn test_pin_watches_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("routes.json");
        fs::write(&file, "{}").unwrap();

        let pin = WatchPin::resolve(&file).unwrap();
        assert_eq!(pin.watched_filename, OsString::from("routes.json"));
        assert_eq!(pin.watched_directory, dir.path());
        assert_eq!(pin.directories().len(), 1);
    }

    #[test]
    fn test_pin_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = WatchPin::resolve(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, WatchError::Resolve { .. }));
    }

    #[test]
    fn test_pin_matches_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("routes.json");
        fs::write(&file, "{}").unwrap();
        let pin = WatchPin::resolve(&file).unwrap();

        let modify = EventKind::Modify(ModifyKind::Any);
        assert!(pin.matches(&event(modify, "/somewhere/routes.json")));
        assert!(!pin.matches(&event(modify, "/somewhere/routes.json.swp")));
        assert!(!pin.matches(&event(modify, "/somewhere/other.json")));
    }

    #[test]
    fn test_reads_are_not_content_changes() {
        assert!(is_content_change(&event(EventKind::Modify(ModifyKind::Any), "a")));
        assert!(is_content_change(&event(EventKind::Create(CreateKind::File), "a")));
        assert!(!is_content_change(&event(EventKind::Access(AccessKind::Any), "a")));
    }

    #[cfg(unix)]
    #[test]
    fn test_reload_rejects_swapped_symlink() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        let evil = dir.path().join("evil.json");
        fs::write(&good, br#"{"routes":{"/a":{"method":"GET","response":1}}}"#).unwrap();
        fs::write(&evil, br#"{"routes":{"/pwned":{"method":"GET","response":1}}}"#).unwrap();
        let link = dir.path().join("routes.json");
        std::os::unix::fs::symlink(&good, &link).unwrap();

        let store = RouteStore::new(load_config(&link).unwrap().valid_routes);
        let (watcher, _rx) = ConfigWatcher::new(&link, store.clone());
        let pin = WatchPin::resolve(&link).unwrap();

        fs::remove_file(&link).unwrap();
        std::os::unix::fs::symlink(&evil, &link).unwrap();

        let outcome = watcher.reloader.reload(&pin);
        assert!(matches!(outcome, ReloadOutcome::SymlinkMismatch { .. }));
        assert!(store.snapshot().get("/a").is_some());
        assert!(store.snapshot().get("/pwned").is_none());
    }

    #[test]
    fn test_reload_keeps_last_known_good() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("routes.json");
        fs::write(&file, br#"{"routes":{"/a":{"method":"GET","response":1}}}"#).unwrap();

        let store = RouteStore::new(load_config(&file).unwrap().valid_routes);
        let (watcher, _rx) = ConfigWatcher::new(&file, store.clone());
        let pin = WatchPin::resolve(&file).unwrap();

        fs::write(&file, b"{ not json").unwrap();
        assert!(matches!(watcher.reloader.reload(&pin), ReloadOutcome::Failed(_)));
        assert!(store.snapshot().get("/a").is_some());

        fs::write(&file, br#"{"routes":{"/b":{"method":"PUT","response":2}}}"#).unwrap();
        assert_eq!(
            watcher.reloader.reload(&pin),
            ReloadOutcome::Applied { routes: 1, skipped: 0 }
        );
        assert!(store.snapshot().get("/b").is_some());
        assert!(store.snapshot().get("/a").is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_watch_loop_reloads_on_single_worker() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("routes.json");
        fs::write(&file, br#"{"routes":{"/a":{"method":"GET","response":1}}}"#).unwrap();

        let store = RouteStore::new(load_config(&file).unwrap().valid_routes);
        let (watcher, mut outcomes) = ConfigWatcher::new(&file, store.clone());
        let watcher = watcher.with_debounce(Duration::from_millis(20));
        let token = CancellationToken::new();
        let handle = watcher.spawn(token.clone()).unwrap();

        fs::write(&file, br#"{"routes":{"/b":{"method":"GET","response":2}}}"#).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(5), outcomes.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, ReloadOutcome::Applied { routes: 1, skipped: 0 });
        assert!(store.snapshot().get("/b").is_some());

        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
