//! Configuration schema definitions.
//!
//! The route file is deserialized into loosely-typed drafts first. Nothing in
//! a draft is trusted: `status` and `delay` are signed so that out-of-range
//! values survive parsing and reach the validator, and `method` is a plain
//! string until it is checked against [`HttpMethod`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Root of the route file: `{"routes": {"<path>": {...}}}`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MockConfig {
    /// Route drafts keyed by exact request path.
    pub routes: HashMap<String, RouteDraft>,
}

/// A single route as written in the file, before validation.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct RouteDraft {
    /// HTTP method, any case.
    #[serde(default)]
    pub method: String,

    /// Response status. Absent means 200.
    #[serde(default)]
    pub status: Option<i64>,

    /// Artificial latency in milliseconds.
    #[serde(default)]
    pub delay: Option<i64>,

    /// Response body, any JSON value.
    #[serde(default)]
    pub response: serde_json::Value,
}

/// The closed set of methods a route may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Head,
        HttpMethod::Options,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a method string is outside [`HttpMethod::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported method '{0}'")]
pub struct UnsupportedMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnsupportedMethod;

    /// Case-insensitive parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| UnsupportedMethod(s.to_string()))
    }
}
