//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config (fatal on error) → Print routes → Build limiter
//!     → Start watcher → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Cancel watcher (bounded grace)
//!     → Stop accepting → Drain in-flight requests (bounded timeout) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, listener last
//! - Ordered shutdown: watcher first, then the listener
//! - Shutdown has timeout: a drain that overruns is an error and exits 1

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, ServerOptions, StartupError};
