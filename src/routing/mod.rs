//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! ValidationResult
//!     → table.rs (freeze as immutable RouteTable)
//!     → store.rs (publish as the live snapshot)
//!
//! Per request:
//!     decode_path(uri.path()) (percent-decoding)
//!     → store.snapshot() once
//!     → RouteTable::get(path) (exact match)
//!     → Some(RouteSpec) or fall through to 404
//! ```
//!
//! # Design Decisions
//! - Tables are immutable; a reload builds a new one and swaps it in whole
//! - Exact, case-sensitive path match, no prefixes or patterns
//! - `/health` never lives in a table; the server answers it first

pub mod store;
pub mod table;

pub use store::RouteStore;
pub use table::{decode_path, is_health, RouteSpec, RouteTable, HEALTH_PATH};
