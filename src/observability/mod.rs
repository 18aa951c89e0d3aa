//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, access lines)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → optional Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event except the access line, whose format
//!   is fixed
//! - Metrics are cheap no-ops unless an exporter is installed

pub mod logging;
pub mod metrics;
