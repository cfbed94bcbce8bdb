//! Dependency container handed to every domain action.
//!
//! External services sit behind the `Base*` traits so tests can swap in the
//! mocks from `test_dependencies`.

use sqlx::PgPool;
use std::sync::Arc;
use typed_builder::TypedBuilder;

use crate::domains::auth::JwtService;
use crate::kernel::{stream_hub::StreamHub, BaseImageStorage, BasePushGateway};

#[derive(Clone, TypedBuilder)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub push_gateway: Arc<dyn BasePushGateway>,
    pub image_storage: Arc<dyn BaseImageStorage>,
    pub jwt_service: Arc<JwtService>,
    #[builder(default)]
    pub stream_hub: StreamHub,
    /// Lowercased; matching emails get the admin role at sign-up
    #[builder(default)]
    pub admin_emails: Vec<String>,
    #[builder(default = 30)]
    pub refresh_token_ttl_days: i64,
}

impl ServerDeps {
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.admin_emails.iter().any(|e| *e == email)
    }
}
