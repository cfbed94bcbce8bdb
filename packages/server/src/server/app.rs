//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware,
    routing::get,
    Router,
};
use sqlx::PgPool;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::common::utils::FcmClient;
use crate::config::Config;
use crate::domains::auth::JwtService;
use crate::kernel::{LocalImageStorage, ServerDeps};
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{self, health_handler, stream_handler, IDEMPOTENCY_KEY_HEADER};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: ServerDeps,
}

/// API routes with authentication and tracing, no rate limiting or CORS.
///
/// Integration tests drive this router directly.
pub fn build_router(deps: ServerDeps) -> Router {
    let app_state = AxumAppState { deps: deps.clone() };

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/streams/:topic", get(stream_handler))
        .merge(routes::auth::router())
        .merge(routes::profile::router())
        .merge(routes::categories::router())
        .merge(routes::news::router())
        .merge(routes::saved_articles::router())
        .merge(routes::notifications::router())
        .merge(routes::analytics::router())
        .merge(routes::functions::router())
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(deps.clone(), req, next)
        }))
        .layer(Extension(app_state))
        .layer(TraceLayer::new_for_http())
}

/// Build the production application: dependencies, routes, static image
/// files, CORS and per-IP rate limiting.
///
/// Returns the deps as well so `main` can hand them to the scheduler.
pub fn build_app(config: &Config, pool: PgPool) -> Result<(Router, ServerDeps)> {
    let jwt_service = Arc::new(JwtService::new(
        &config.jwt_secret,
        config.jwt_issuer.clone(),
        config.access_token_ttl_secs,
    ));

    let deps = ServerDeps::builder()
        .db_pool(pool)
        .push_gateway(Arc::new(FcmClient::new(config.fcm_server_key.clone())))
        .image_storage(Arc::new(LocalImageStorage::new(
            &config.storage_root,
            &config.public_base_url,
        )))
        .jwt_service(jwt_service)
        .admin_emails(config.admin_emails.clone())
        .refresh_token_ttl_days(config.refresh_token_ttl_days)
        .build();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&config.allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(IDEMPOTENCY_KEY_HEADER),
        ]);

    // 10/sec per IP with bursts of 20
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .use_headers()
            .finish()
            .context("Invalid rate limiter configuration")?,
    );
    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    let app = build_router(deps.clone())
        .nest_service("/storage", ServeDir::new(&config.storage_root))
        .layer(rate_limit_layer)
        .layer(cors);

    Ok((app, deps))
}

fn allowed_origins(origins: &[String]) -> AllowOrigin {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(parsed)
    }
}
