// HTTP routes
pub mod analytics;
pub mod auth;
pub mod categories;
pub mod functions;
pub mod health;
pub mod news;
pub mod notifications;
pub mod profile;
pub mod saved_articles;
pub mod stream;

pub use health::*;
pub use stream::*;

use axum::http::HeaderMap;

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Client-supplied key that lets a retried create return the original row.
pub(crate) fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
