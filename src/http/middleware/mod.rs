//! Cross-cutting request middleware that is not a security check.

pub mod access_log;

pub use access_log::access_log_middleware;
