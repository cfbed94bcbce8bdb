//! In-process pub/sub for the realtime change feed.
//!
//! Domain actions publish `ChangeEvent`s after a write commits; the SSE
//! route subscribes per topic (`news`, `notifications`,
//! `saved_articles:<user_id>`, `auth:<user_id>`). Topics are opaque strings.

use newsdesk_shared::ChangeEvent;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Topic-keyed broadcast channels. Cloneable; payloads are JSON values.
#[derive(Clone)]
pub struct StreamHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<serde_json::Value>>>>,
    capacity: usize,
}

impl StreamHub {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Publish to a topic. No-op without subscribers.
    pub async fn publish(&self, topic: &str, value: serde_json::Value) {
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(topic) {
            let _ = tx.send(value);
        }
    }

    /// Publish a row change. Serialization failures are logged, never raised:
    /// the write has already committed.
    pub async fn publish_change<T: Serialize>(&self, topic: &str, event: &ChangeEvent<T>) {
        match serde_json::to_value(event) {
            Ok(value) => self.publish(topic, value).await,
            Err(e) => tracing::error!(topic, error = %e, "failed to serialize change event"),
        }
    }

    /// Subscribe to a topic, creating its channel on first use.
    pub async fn subscribe(&self, topic: &str) -> broadcast::Receiver<serde_json::Value> {
        let mut channels = self.channels.write().await;
        let tx = channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Drop channels nobody listens to.
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, tx| tx.receiver_count() > 0);
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}
