//! Test harness with testcontainers for integration testing.
//!
//! One Postgres container and one migration run are shared by every test in
//! the binary. Tests isolate themselves with unique emails and ids instead of
//! truncating tables.

use anyhow::{Context, Result};
use newsdesk_core::kernel::{
    InMemoryImageStorage, MockPushGateway, ServerDeps, StreamHub, TestDependencies,
};
use newsdesk_core::server::build_router;
use sqlx::PgPool;
use std::sync::Arc;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use super::TestClient;

struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Per-test context: a fresh pool plus mock services.
///
/// ```ignore
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let client = ctx.client();
/// }
/// ```
pub struct TestHarness {
    pub db_pool: PgPool,
    pub push: Arc<MockPushGateway>,
    pub storage: Arc<InMemoryImageStorage>,
    pub stream_hub: StreamHub,
    pub deps: ServerDeps,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_dependencies(TestDependencies::new()).await
    }

    /// Build a harness around customised mocks (failing gateway, failing storage).
    pub async fn with_dependencies(test_deps: TestDependencies) -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        let push = test_deps.push_gateway.clone();
        let storage = test_deps.image_storage.clone();
        let stream_hub = test_deps.stream_hub.clone();
        let deps = test_deps.into_deps(db_pool.clone());

        Ok(Self {
            db_pool,
            push,
            storage,
            stream_hub,
            deps,
        })
    }

    /// HTTP client over the full router (auth middleware included).
    pub fn client(&self) -> TestClient {
        TestClient::new(build_router(self.deps.clone()))
    }
}
