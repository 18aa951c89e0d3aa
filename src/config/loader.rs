//! Configuration loading from disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::schema::MockConfig;
use crate::config::validation::{validate_routes, ValidationResult};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file '{}' not found", .0.display())]
    NotFound(PathBuf),

    #[error("error resolving config file path '{}': {source}", path.display())]
    Resolve { path: PathBuf, source: io::Error },

    #[error("error reading config file '{}': {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("error parsing config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Load, resolve and validate a JSON route file.
///
/// Symlinks are resolved before reading so the bytes always come from the
/// canonical target.
pub fn load_config(path: &Path) -> Result<ValidationResult, ConfigError> {
    match fs::metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        _ => {}
    }

    let resolved = fs::canonicalize(path).map_err(|source| ConfigError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;

    let content = fs::read(&resolved).map_err(|source| ConfigError::Read {
        path: resolved.clone(),
        source,
    })?;

    parse_config(&content)
}

/// Parse and validate raw route file bytes.
pub fn parse_config(content: &[u8]) -> Result<ValidationResult, ConfigError> {
    let config: MockConfig = serde_json::from_slice(content)?;
    Ok(validate_routes(config.routes))
}
