//! JSON response helpers.
//!
//! Every body this server writes, configured or generated, goes out as
//! `application/json; charset=utf-8`, except the plain-text 500 used when a
//! configured body cannot be encoded.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Pre-encoded JSON body with the given status.
pub fn json_bytes(status: StatusCode, body: Vec<u8>) -> Response {
    (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], body).into_response()
}

/// Encode `value` and send it with `status`; 500 if encoding fails.
pub fn json_value<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => json_bytes(status, body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode response body");
            internal_error()
        }
    }
}

/// `{"error": message}`.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    json_value(status, &serde_json::json!({ "error": message }))
}

pub fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}
