//! Token refresh against an in-process API stub.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{Duration, Utc};
use newsdesk_console::retry::RetryPolicy;
use newsdesk_console::{ApiClient, ConsoleConfig};
use newsdesk_shared::{AuthChangeKind, RefreshRequest, Session, User};
use serde_json::json;
use uuid::Uuid;

const FRESH_ACCESS: &str = "fresh-access";
const VALID_REFRESH: &str = "still-valid-refresh";

#[derive(Clone)]
struct Backend {
    requests: Arc<Mutex<Vec<String>>>,
    refresh_accepted: bool,
    user: User,
}

impl Backend {
    fn new(refresh_accepted: bool) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            refresh_accepted,
            user: User {
                id: Uuid::new_v4(),
                email: "editor@example.com".to_string(),
            },
        }
    }

    fn log(&self, line: &str) {
        self.requests.lock().unwrap().push(line.to_string());
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Invalid or expired token" })),
    )
        .into_response()
}

async fn categories(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    backend.log("GET /api/categories");
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if bearer == format!("Bearer {}", FRESH_ACCESS) {
        Json(json!([])).into_response()
    } else {
        unauthorized()
    }
}

async fn refresh(State(backend): State<Backend>, Json(body): Json<RefreshRequest>) -> Response {
    backend.log("POST /api/auth/refresh");
    if !backend.refresh_accepted || body.refresh_token != VALID_REFRESH {
        return unauthorized();
    }
    Json(Session {
        access_token: FRESH_ACCESS.to_string(),
        refresh_token: "rotated-refresh".to_string(),
        expires_at: Utc::now() + Duration::hours(1),
        user: backend.user.clone(),
    })
    .into_response()
}

async fn serve(backend: Backend) -> String {
    let app = Router::new()
        .route("/api/categories", get(categories))
        .route("/api/auth/refresh", post(refresh))
        .with_state(backend);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(api_url: String, backend: &Backend, expires_in: Duration) -> ApiClient {
    let config = ConsoleConfig {
        api_url,
        retry: RetryPolicy::none(),
        ..ConsoleConfig::default()
    };
    ApiClient::new(&config).with_session(Session {
        access_token: "stale-access".to_string(),
        refresh_token: VALID_REFRESH.to_string(),
        expires_at: Utc::now() + expires_in,
        user: backend.user.clone(),
    })
}

#[tokio::test]
async fn expired_access_token_is_refreshed_before_the_request() {
    let backend = Backend::new(true);
    let url = serve(backend.clone()).await;
    let client = client_for(url, &backend, Duration::seconds(-5));

    let categories = client.categories().await.unwrap();

    assert!(categories.is_empty());
    assert_eq!(
        backend.requests(),
        vec!["POST /api/auth/refresh", "GET /api/categories"]
    );
    let session = client.session().expect("session kept");
    assert_eq!(session.access_token, FRESH_ACCESS);
    assert_eq!(session.refresh_token, "rotated-refresh");
}

#[tokio::test]
async fn rejected_access_token_is_refreshed_and_replayed() {
    let backend = Backend::new(true);
    let url = serve(backend.clone()).await;
    let client = client_for(url, &backend, Duration::minutes(10));
    let mut notices = client.auth_changes();

    client.categories().await.unwrap();

    assert_eq!(
        backend.requests(),
        vec![
            "GET /api/categories",
            "POST /api/auth/refresh",
            "GET /api/categories"
        ]
    );
    assert_eq!(client.session().unwrap().access_token, FRESH_ACCESS);
    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.kind, AuthChangeKind::TokenRefreshed);
    assert!(notices.try_recv().is_err());
}

#[tokio::test]
async fn rejected_refresh_token_signs_out_locally() {
    let backend = Backend::new(false);
    let url = serve(backend.clone()).await;
    let client = client_for(url, &backend, Duration::minutes(10));
    let mut notices = client.auth_changes();

    let err = client.categories().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(
        backend.requests(),
        vec!["GET /api/categories", "POST /api/auth/refresh"]
    );
    assert!(client.session().is_none());
    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.kind, AuthChangeKind::SignedOut);
    assert!(notice.session.is_none());
}

#[tokio::test]
async fn concurrent_requests_share_one_refresh() {
    let backend = Backend::new(true);
    let url = serve(backend.clone()).await;
    let client = client_for(url, &backend, Duration::seconds(-5));

    let (first, second) = tokio::join!(client.categories(), client.categories());

    assert!(first.is_ok() && second.is_ok());
    let refreshes = backend
        .requests()
        .iter()
        .filter(|line| line.as_str() == "POST /api/auth/refresh")
        .count();
    assert_eq!(refreshes, 1);
}
