//! Test fixtures for creating test data.
//!
//! Users are created through the sign-up action so they get a profile and a
//! role row exactly like real accounts.

use newsdesk_core::common::{Actor, ArticleId, CategoryId, UserId};
use newsdesk_core::domains::auth::actions::sign_up;
use newsdesk_core::domains::categories::actions::create_category;
use newsdesk_core::domains::news::actions::create_article;
use newsdesk_core::domains::profiles::UserRoleRecord;
use newsdesk_core::kernel::ServerDeps;
use newsdesk_shared::{CategoryInput, Credentials, NewsArticleInput, NewsStatus, Role, Session};
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "correct-horse";

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, Uuid::new_v4().simple())
}

/// A signed-in account with a fresh session.
pub struct TestUser {
    pub session: Session,
    pub email: String,
}

impl TestUser {
    pub fn id(&self) -> UserId {
        UserId::from_uuid(self.session.user.id)
    }

    pub fn token(&self) -> &str {
        &self.session.access_token
    }

    pub fn actor(&self, role: Role) -> Actor {
        Actor::new(self.id(), role)
    }
}

pub async fn create_user(deps: &ServerDeps, prefix: &str) -> TestUser {
    let email = unique_email(prefix);
    let session = sign_up(
        Credentials {
            email: email.clone(),
            password: TEST_PASSWORD.to_string(),
        },
        deps,
    )
    .await
    .expect("sign up");
    TestUser { session, email }
}

pub async fn create_admin(deps: &ServerDeps) -> TestUser {
    let user = create_user(deps, "admin").await;
    UserRoleRecord::upsert(user.id(), Role::Admin, &deps.db_pool)
        .await
        .expect("grant admin");
    user
}

pub async fn create_test_category(deps: &ServerDeps, admin: &TestUser) -> CategoryId {
    let category = create_category(
        admin.actor(Role::Admin),
        CategoryInput {
            name: format!("Category {}", Uuid::new_v4().simple()),
            description: None,
            is_active: Some(true),
        },
        deps,
    )
    .await
    .expect("create category");
    CategoryId::from_uuid(category.id)
}

pub fn article_input(category_id: CategoryId, status: NewsStatus) -> NewsArticleInput {
    NewsArticleInput {
        title: format!("Visa update {}", Uuid::new_v4().simple()),
        summary: "New student visa rules take effect next month.".to_string(),
        content: Some("Full details of the new rules.".to_string()),
        image_url: Some(
            "http://storage.test/storage/news-images/original/1700000000000.png".to_string(),
        ),
        source_url: "https://example.com/visa".to_string(),
        source_name: Some("Example News".to_string()),
        category_id: Some(category_id.into_uuid()),
        status,
    }
}

pub async fn create_test_article(
    deps: &ServerDeps,
    admin: &TestUser,
    status: NewsStatus,
) -> ArticleId {
    let category_id = create_test_category(deps, admin).await;
    let article = create_article(
        admin.actor(Role::Admin),
        article_input(category_id, status),
        None,
        deps,
    )
    .await
    .expect("create article");
    ArticleId::from_uuid(article.id)
}
