// Mock services for tests.
//
// `TestDependencies` bundles a recording push gateway and an in-memory image
// bucket and turns them into `ServerDeps` around a test database pool.

use anyhow::{bail, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{BaseImageStorage, BasePushGateway, PushMessage, ServerDeps, StreamHub};
use crate::domains::auth::JwtService;

pub const TEST_JWT_SECRET: &str = "test_secret_key";
pub const TEST_JWT_ISSUER: &str = "newsdesk-test";

// =============================================================================
// Mock Push Gateway
// =============================================================================

#[derive(Debug, Clone)]
pub struct SentPush {
    pub tokens: Vec<String>,
    pub message: PushMessage,
}

pub struct MockPushGateway {
    sent: Mutex<Vec<SentPush>>,
    fail_with: Option<String>,
}

impl MockPushGateway {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    /// Every send fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<SentPush> {
        self.sent.lock().unwrap().clone()
    }

    pub fn was_sent_with_title(&self, title: &str) -> bool {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .any(|push| push.message.title == title)
    }
}

impl Default for MockPushGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePushGateway for MockPushGateway {
    async fn send(&self, tokens: &[String], message: &PushMessage) -> Result<serde_json::Value> {
        if let Some(error) = &self.fail_with {
            bail!("{}", error);
        }
        self.sent.lock().unwrap().push(SentPush {
            tokens: tokens.to_vec(),
            message: message.clone(),
        });
        Ok(serde_json::json!({
            "success": tokens.len(),
            "failure": 0,
        }))
    }
}

// =============================================================================
// In-memory Image Storage
// =============================================================================

pub struct InMemoryImageStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    fail_removals: bool,
}

impl InMemoryImageStorage {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_removals: false,
        }
    }

    /// Storage whose `remove` always errors.
    pub fn failing_removals() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            fail_removals: true,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

impl Default for InMemoryImageStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseImageStorage for InMemoryImageStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        if self.fail_removals {
            bail!("storage unavailable");
        }
        self.objects.lock().unwrap().remove(path);
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("http://storage.test/storage/news-images/{}", path)
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

pub struct TestDependencies {
    pub push_gateway: Arc<MockPushGateway>,
    pub image_storage: Arc<InMemoryImageStorage>,
    pub stream_hub: StreamHub,
    pub admin_emails: Vec<String>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            push_gateway: Arc::new(MockPushGateway::new()),
            image_storage: Arc::new(InMemoryImageStorage::new()),
            stream_hub: StreamHub::new(),
            admin_emails: Vec::new(),
        }
    }

    pub fn mock_push(mut self, gateway: MockPushGateway) -> Self {
        self.push_gateway = Arc::new(gateway);
        self
    }

    pub fn mock_storage(mut self, storage: InMemoryImageStorage) -> Self {
        self.image_storage = Arc::new(storage);
        self
    }

    pub fn admin_emails(mut self, emails: &[&str]) -> Self {
        self.admin_emails = emails.iter().map(|e| e.to_lowercase()).collect();
        self
    }

    pub fn into_deps(self, db_pool: PgPool) -> ServerDeps {
        ServerDeps::builder()
            .db_pool(db_pool)
            .push_gateway(self.push_gateway as Arc<dyn BasePushGateway>)
            .image_storage(self.image_storage as Arc<dyn BaseImageStorage>)
            .jwt_service(Arc::new(JwtService::new(
                TEST_JWT_SECRET,
                TEST_JWT_ISSUER.to_string(),
                3600,
            )))
            .stream_hub(self.stream_hub)
            .admin_emails(self.admin_emails)
            .build()
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}
