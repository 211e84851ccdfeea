//! Request handlers.

pub mod health;
pub mod jobs;
pub mod lectures;
pub mod videos;

use axum::http::HeaderMap;

use crate::error::{ApiError, ApiResult};

/// Identify the caller from the `X-User-Id` header.
///
/// Authentication itself is out of scope here; the deployment fronts this
/// service with a gateway that sets the header. Handlers still enforce
/// per-job ownership against it.
pub fn caller_id(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| ApiError::bad_request("Missing X-User-Id header"))
}
