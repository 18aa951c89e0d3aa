//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! route file (JSON)
//!     → loader.rs (resolve symlinks, read, parse into drafts)
//!     → validation.rs (normalize methods, clamp status and delay)
//!     → ValidationResult (RouteTable + skipped count)
//!     → RouteStore (published as the live table)
//!
//! On file change:
//!     watcher.rs debounces directory events
//!     → re-checks the symlink pin
//!     → loader.rs loads new routes
//!     → validation.rs validates
//!     → atomic swap in RouteStore
//!     → subsequent requests observe the new table
//! ```
//!
//! # Design Decisions
//! - Routes are immutable once validated; changes require a full reload
//! - A failed reload keeps the last known good table
//! - Validation warns and corrects instead of failing the whole file

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{HttpMethod, MockConfig, RouteDraft};
pub use validation::{validate_routes, ValidationResult, MAX_DELAY_MS};
pub use watcher::{ConfigWatcher, Debounce, ReloadOutcome, WatchError, WatchPin, DEBOUNCE_WINDOW};
