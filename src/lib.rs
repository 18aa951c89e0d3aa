//! Hot-reloading mock HTTP server library.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::{load_config, ValidationResult};
pub use http::MockServer;
pub use lifecycle::{start, ServerOptions, Shutdown};
pub use routing::{RouteStore, RouteTable};
