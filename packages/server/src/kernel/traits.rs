//! Seams for external services so domains can run against mocks in tests.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

// =============================================================================
// Push Gateway (FCM)
// =============================================================================

/// One push payload fanned out to many device tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// Delivered to the device untouched; values are strings on the wire.
    pub data: BTreeMap<String, String>,
}

#[async_trait]
pub trait BasePushGateway: Send + Sync {
    /// Send `message` to every token. Returns the gateway's raw response
    /// (one entry per request batch) for the caller to report back.
    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<serde_json::Value>;
}

// =============================================================================
// Image Storage
// =============================================================================

#[async_trait]
pub trait BaseImageStorage: Send + Sync {
    /// Store `bytes` under `path` inside the bucket, replacing any existing object.
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    async fn remove(&self, path: &str) -> Result<()>;

    /// Public URL for an object path.
    fn public_url(&self, path: &str) -> String;
}
