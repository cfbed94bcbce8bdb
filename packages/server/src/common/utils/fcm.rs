use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::kernel::{BasePushGateway, PushMessage};

const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// FCM accepts at most this many registration ids per request.
pub const FCM_BATCH_SIZE: usize = 1000;

/// Firebase Cloud Messaging client (legacy HTTP API).
pub struct FcmClient {
    client: Client,
    server_key: Option<String>,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    registration_ids: &'a [String],
    notification: FcmNotification<'a>,
    data: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
    sound: &'static str,
}

impl FcmClient {
    pub fn new(server_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            server_key,
            endpoint: FCM_SEND_URL.to_string(),
        }
    }

    /// Point the client at another endpoint (local gateway stubs).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn send_chunk(
        &self,
        server_key: &str,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<serde_json::Value> {
        let request = FcmRequest {
            registration_ids: tokens,
            notification: FcmNotification {
                title: &message.title,
                body: &message.body,
                sound: "default",
            },
            data: &message.data,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", server_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            error!(%status, body = %body, "FCM send failed");
            bail!("FCM API error {}: {}", status, body);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl BasePushGateway for FcmClient {
    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<serde_json::Value> {
        let Some(server_key) = self.server_key.as_deref() else {
            bail!("FCM_SERVER_KEY is not configured");
        };

        let mut results = Vec::new();
        for chunk in tokens.chunks(FCM_BATCH_SIZE) {
            info!(recipients = chunk.len(), title = %message.title, "sending FCM batch");
            results.push(self.send_chunk(server_key, chunk, message).await?);
        }

        // Single-batch sends report the gateway response as-is.
        Ok(match results.len() {
            1 => results.remove(0),
            _ => serde_json::Value::Array(results),
        })
    }
}
