//! Typed client for the newsdesk HTTP API.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use newsdesk_shared::{
    AnalyticsEvent, AnalyticsEventInput, ArticleStats, AuthChangeKind, Category, CategoryInput,
    Credentials, FormErrors, NewsArticle, NewsArticleInput, Notification, NotificationDraft,
    NotificationPage, NotificationPreferences, PreferencesUpdate, ProcessScheduledResponse,
    Profile, ProfileUpdate, PushTokenUpdate, ReadStatusRequest, RefreshRequest, Role,
    SaveArticleRequest, SavedArticle, SendPushRequest, SendPushResponse, Session, StatusFilter,
    TopArticle, User, UserRole,
};
use reqwest::{multipart, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::{AuthBootstrap, AuthHandle, AuthNotice, IdentitySource};
use crate::config::ConsoleConfig;
use crate::error::ClientError;
use crate::retry::{IdempotencyKey, RetryPolicy};
use crate::sse::{SseDecoder, SseFrame};

pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    #[serde(default)]
    fields: Option<FormErrors>,
}

/// Filters for the news management list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewsQuery {
    pub status: StatusFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// Which notification list to fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationList {
    #[default]
    Sent,
    Scheduled,
}

/// Image picked in the news form.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

#[derive(Serialize)]
struct LimitQuery {
    limit: i64,
}

#[derive(Serialize)]
struct PageQuery {
    limit: i64,
    offset: i64,
}

/// API client holding the current session.
///
/// Cloning is cheap; clones share the session and the auth notice channel.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
    session: Arc<RwLock<Option<Session>>>,
    refreshing: Arc<Mutex<()>>,
    notices: broadcast::Sender<AuthNotice>,
}

impl ApiClient {
    pub fn new(config: &ConsoleConfig) -> Self {
        let (notices, _) = broadcast::channel(32);
        Self {
            client: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            retry: config.retry,
            session: Arc::new(RwLock::new(None)),
            refreshing: Arc::new(Mutex::new(())),
            notices,
        }
    }

    /// Start from a session persisted by a previous run.
    pub fn with_session(self, session: Session) -> Self {
        self.store_session(Some(session));
        self
    }

    pub fn session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_session(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    fn announce(&self, kind: AuthChangeKind, session: Option<Session>) {
        // No receivers is fine: nothing is listening yet.
        let _ = self.notices.send(AuthNotice { kind, session });
    }

    fn sign_out_locally(&self) {
        if self.session().is_some() {
            self.store_session(None);
            self.announce(AuthChangeKind::SignedOut, None);
        }
    }

    /// Auth changes caused by this client (sign-in, refresh, sign-out, 401).
    pub fn auth_changes(&self) -> broadcast::Receiver<AuthNotice> {
        self.notices.subscribe()
    }

    /// Spawn the auth bootstrap against this client and keep it informed of
    /// every auth change the client causes.
    pub fn start_auth(self: &Arc<Self>, config: &ConsoleConfig) -> AuthHandle {
        let mut notices = self.auth_changes();
        let handle = AuthBootstrap::spawn(self.clone(), config);
        let notifier = handle.notifier();

        tokio::spawn(async move {
            loop {
                match notices.recv().await {
                    Ok(notice) => {
                        if notifier.send(notice).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth notices lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        handle
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Session to send with, refreshed first when its access token expired.
    async fn live_session(&self) -> Result<Session, ClientError> {
        let session = self.session().ok_or(ClientError::NotSignedIn)?;
        if !session.is_expired(Utc::now()) {
            return Ok(session);
        }
        debug!("access token expired; refreshing before request");
        self.refresh_after(&session.access_token).await
    }

    /// Refresh the session that carried `stale`, unless a concurrent caller
    /// already replaced it.
    async fn refresh_after(&self, stale: &str) -> Result<Session, ClientError> {
        let _guard = self.refreshing.lock().await;
        match self.session() {
            Some(current)
                if current.access_token != stale && !current.is_expired(Utc::now()) =>
            {
                Ok(current)
            }
            Some(_) => self.refresh_locked().await,
            None => Err(ClientError::NotSignedIn),
        }
    }

    async fn send_as<F>(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        build: &F,
    ) -> Result<Response, ClientError>
    where
        F: Fn(RequestBuilder) -> Result<RequestBuilder, ClientError>,
    {
        let request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(&session.access_token);
        Ok(build(request)?.send().await?)
    }

    /// Send an authenticated request and return the checked response.
    ///
    /// A 401 gets one refresh and one replay. The local session is dropped
    /// only when the refresh token is rejected or the refreshed session is
    /// refused as well.
    async fn send_authorized<F>(
        &self,
        method: Method,
        path: &str,
        build: F,
    ) -> Result<Response, ClientError>
    where
        F: Fn(RequestBuilder) -> Result<RequestBuilder, ClientError>,
    {
        let session = self.live_session().await?;
        let response = self.send_as(&session, method.clone(), path, &build).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return self.check(response).await;
        }

        debug!(%path, "access token rejected; refreshing and replaying");
        let session = self.refresh_after(&session.access_token).await?;
        let response = self.send_as(&session, method, path, &build).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(%path, "refreshed session rejected; signing out locally");
            self.sign_out_locally();
        }
        self.check(response).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = self.check(request.send().await?).await?;
        decode(response).await
    }

    async fn check(&self, response: Response) -> Result<Response, ClientError> {
        let code = response.status();
        if code.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();

        match parsed {
            Some(ErrorBody {
                fields: Some(fields),
                ..
            }) if code == StatusCode::BAD_REQUEST && !fields.is_empty() => {
                Err(ClientError::Validation(fields))
            }
            Some(ErrorBody {
                error: Some(message),
                ..
            }) => Err(ClientError::Status { code, message }),
            _ => Err(ClientError::Status {
                code,
                message: code
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
            }),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self
            .send_authorized(Method::GET, path, |request| Ok(request))
            .await?;
        decode(response).await
    }

    async fn get_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ClientError> {
        let response = self
            .send_authorized(Method::GET, path, |request| Ok(request.query(query)))
            .await?;
        decode(response).await
    }

    /// Authenticated write under the retry policy.
    ///
    /// One idempotency key covers every attempt.
    async fn write<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let key = IdempotencyKey::new();
        let key = &key;
        self.retry
            .run(|attempt| {
                if attempt > 1 {
                    debug!(%path, attempt, key = %key, "retrying write");
                }
                let method = method.clone();
                async move {
                    let response = self
                        .send_authorized(method, path, |request| {
                            let request = request.header(IDEMPOTENCY_KEY_HEADER, key.as_str());
                            Ok(match body {
                                Some(body) => request.json(body),
                                None => request,
                            })
                        })
                        .await?;
                    decode(response).await
                }
            })
            .await
    }

    async fn anonymous<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.client.post(self.url(path)).json(body))
            .await
    }

    // =========================================================================
    // Auth
    // =========================================================================

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let session: Session = self.anonymous("/api/auth/sign-up", &credentials).await?;
        self.store_session(Some(session.clone()));
        self.announce(AuthChangeKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let session: Session = self.anonymous("/api/auth/sign-in", &credentials).await?;
        self.store_session(Some(session.clone()));
        self.announce(AuthChangeKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Exchange the refresh token for a new session.
    ///
    /// A rejected refresh token clears the local session.
    pub async fn refresh(&self) -> Result<Session, ClientError> {
        let _guard = self.refreshing.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Session, ClientError> {
        let current = self.session().ok_or(ClientError::NotSignedIn)?;
        let request = RefreshRequest {
            refresh_token: current.refresh_token,
        };
        match self.anonymous::<_, Session>("/api/auth/refresh", &request).await {
            Ok(session) => {
                self.store_session(Some(session.clone()));
                self.announce(AuthChangeKind::TokenRefreshed, Some(session.clone()));
                Ok(session)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    warn!("Refresh token rejected; signing out locally");
                    self.sign_out_locally();
                }
                Err(e)
            }
        }
    }

    /// Sign out. Local state is cleared even if the server call fails.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let result = match self
            .send_authorized(Method::POST, "/api/auth/sign-out", |request| Ok(request))
            .await
        {
            Ok(response) => decode::<()>(response).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &result {
            warn!(error = %e, "Sign-out request failed");
        }
        self.sign_out_locally();
        result.or_else(|e| if e.is_unauthorized() { Ok(()) } else { Err(e) })
    }

    pub async fn current_user(&self) -> Result<User, ClientError> {
        self.get("/api/auth/session").await
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Own profile; `None` when no profile row exists yet.
    pub async fn profile(&self) -> Result<Option<Profile>, ClientError> {
        match self.get("/api/profile").await {
            Ok(profile) => Ok(Some(profile)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        self.write(Method::PUT, "/api/profile", Some(update)).await
    }

    pub async fn update_preferences(
        &self,
        update: &PreferencesUpdate,
    ) -> Result<NotificationPreferences, ClientError> {
        self.write(
            Method::PUT,
            "/api/profile/notification-preferences",
            Some(update),
        )
        .await
    }

    pub async fn set_push_token(
        &self,
        fcm_token: Option<String>,
    ) -> Result<NotificationPreferences, ClientError> {
        self.write(
            Method::PUT,
            "/api/profile/push-token",
            Some(&PushTokenUpdate { fcm_token }),
        )
        .await
    }

    pub async fn role(&self) -> Result<UserRole, ClientError> {
        self.get("/api/profile/role").await
    }

    pub async fn set_user_role(&self, user_id: Uuid, role: Role) -> Result<UserRole, ClientError> {
        self.write(
            Method::PUT,
            &format!("/api/users/{}/role", user_id),
            Some(&UserRole { role }),
        )
        .await
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        self.get("/api/categories").await
    }

    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, ClientError> {
        self.write(Method::POST, "/api/categories", Some(input)).await
    }

    pub async fn update_category(
        &self,
        id: Uuid,
        input: &CategoryInput,
    ) -> Result<Category, ClientError> {
        self.write(Method::PUT, &format!("/api/categories/{}", id), Some(input))
            .await
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), ClientError> {
        self.write::<(), _>(Method::DELETE, &format!("/api/categories/{}", id), None)
            .await
    }

    // =========================================================================
    // News
    // =========================================================================

    pub async fn list_news(&self, query: &NewsQuery) -> Result<Vec<NewsArticle>, ClientError> {
        self.get_query("/api/news", query).await
    }

    pub async fn news(&self, id: Uuid) -> Result<NewsArticle, ClientError> {
        self.get(&format!("/api/news/{}", id)).await
    }

    pub async fn create_news(&self, input: &NewsArticleInput) -> Result<NewsArticle, ClientError> {
        self.write(Method::POST, "/api/news", Some(input)).await
    }

    pub async fn update_news(
        &self,
        id: Uuid,
        input: &NewsArticleInput,
    ) -> Result<NewsArticle, ClientError> {
        self.write(Method::PUT, &format!("/api/news/{}", id), Some(input))
            .await
    }

    pub async fn delete_news(&self, id: Uuid) -> Result<(), ClientError> {
        self.write::<(), _>(Method::DELETE, &format!("/api/news/{}", id), None)
            .await
    }

    /// Audit entries for one article, newest first.
    pub async fn news_history(&self, id: Uuid) -> Result<Vec<serde_json::Value>, ClientError> {
        self.get(&format!("/api/news/{}/history", id)).await
    }

    /// Upload an image, or keep `existing_url` when no file is given.
    pub async fn upload_image(
        &self,
        file: Option<&ImageFile>,
        existing_url: Option<&str>,
    ) -> Result<String, ClientError> {
        let key = IdempotencyKey::new();
        let key = &key;
        let response: UploadResponse = self
            .retry
            .run(|_| async move {
                let response = self
                    .send_authorized(Method::POST, "/api/images", |request| {
                        let form = upload_form(file, existing_url)?;
                        Ok(request
                            .header(IDEMPOTENCY_KEY_HEADER, key.as_str())
                            .multipart(form))
                    })
                    .await?;
                decode(response).await
            })
            .await?;
        Ok(response.url)
    }

    // =========================================================================
    // Saved articles
    // =========================================================================

    pub async fn saved_articles(&self) -> Result<Vec<SavedArticle>, ClientError> {
        self.get("/api/saved-articles").await
    }

    pub async fn save_article(&self, article_id: Uuid) -> Result<SavedArticle, ClientError> {
        self.write(
            Method::POST,
            "/api/saved-articles",
            Some(&SaveArticleRequest { article_id }),
        )
        .await
    }

    pub async fn unsave_article(&self, article_id: Uuid) -> Result<(), ClientError> {
        self.write::<(), _>(
            Method::DELETE,
            &format!("/api/saved-articles/{}", article_id),
            None,
        )
        .await
    }

    pub async fn set_saved_read(
        &self,
        saved_id: Uuid,
        is_read: bool,
    ) -> Result<SavedArticle, ClientError> {
        self.write(
            Method::PUT,
            &format!("/api/saved-articles/{}/read", saved_id),
            Some(&ReadStatusRequest { is_read }),
        )
        .await
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub async fn notifications(
        &self,
        list: NotificationList,
    ) -> Result<Vec<Notification>, ClientError> {
        #[derive(Serialize)]
        struct StatusQuery {
            status: NotificationList,
        }
        self.get_query("/api/notifications", &StatusQuery { status: list })
            .await
    }

    pub async fn compose_notification(
        &self,
        draft: &NotificationDraft,
    ) -> Result<Notification, ClientError> {
        self.write(Method::POST, "/api/notifications", Some(draft))
            .await
    }

    /// Cancel a scheduled notification that has not gone out yet.
    pub async fn cancel_notification(&self, id: Uuid) -> Result<(), ClientError> {
        self.write::<(), _>(Method::DELETE, &format!("/api/notifications/{}", id), None)
            .await
    }

    pub async fn mark_notification_read(&self, id: Uuid) -> Result<Notification, ClientError> {
        self.write::<(), _>(
            Method::POST,
            &format!("/api/notifications/{}/read", id),
            None,
        )
        .await
    }

    pub async fn notification_feed(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<NotificationPage, ClientError> {
        self.get_query("/api/notifications/feed", &PageQuery { limit, offset })
            .await
    }

    pub async fn send_push(
        &self,
        request: &SendPushRequest,
    ) -> Result<SendPushResponse, ClientError> {
        self.write(
            Method::POST,
            "/functions/send-push-notification",
            Some(request),
        )
        .await
    }

    pub async fn process_scheduled(&self) -> Result<ProcessScheduledResponse, ClientError> {
        self.write::<(), _>(
            Method::POST,
            "/functions/process-scheduled-notifications",
            None,
        )
        .await
    }

    // =========================================================================
    // Analytics
    // =========================================================================

    pub async fn record_event(
        &self,
        input: &AnalyticsEventInput,
    ) -> Result<AnalyticsEvent, ClientError> {
        self.write(Method::POST, "/api/analytics/events", Some(input))
            .await
    }

    pub async fn article_stats(&self, article_id: Uuid) -> Result<ArticleStats, ClientError> {
        self.get(&format!("/api/analytics/articles/{}", article_id))
            .await
    }

    pub async fn top_articles(&self, limit: i64) -> Result<Vec<TopArticle>, ClientError> {
        self.get_query("/api/analytics/top", &LimitQuery { limit })
            .await
    }

    // =========================================================================
    // Realtime
    // =========================================================================

    /// Subscribe to a realtime topic.
    pub async fn open_stream(&self, topic: &str) -> Result<EventStream, ClientError> {
        let path = format!("/api/streams/{}", topic);
        let response = self
            .send_authorized(Method::GET, &path, |request| {
                Ok(request.header(reqwest::header::ACCEPT, "text/event-stream"))
            })
            .await?;
        debug!(%topic, "stream opened");
        Ok(EventStream {
            response,
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn upload_form(
    file: Option<&ImageFile>,
    existing_url: Option<&str>,
) -> Result<multipart::Form, ClientError> {
    let mut form = multipart::Form::new();
    if let Some(file) = file {
        let mut part = multipart::Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }
        form = form.part("file", part);
    }
    if let Some(url) = existing_url {
        form = form.text("existing_url", url.to_string());
    }
    Ok(form)
}

/// Frames from one open realtime stream.
pub struct EventStream {
    response: Response,
    decoder: SseDecoder,
    pending: VecDeque<SseFrame>,
}

impl EventStream {
    /// Next frame; `None` once the server closes the stream.
    pub async fn next(&mut self) -> Option<Result<SseFrame, ClientError>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Some(Ok(frame));
            }
            match self.response.chunk().await {
                Ok(Some(chunk)) => self.pending.extend(self.decoder.push(&chunk)),
                Ok(None) => return None,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

#[async_trait]
impl IdentitySource for ApiClient {
    async fn current_session(&self) -> Result<Option<Session>, ClientError> {
        let Some(session) = self.session() else {
            return Ok(None);
        };
        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        debug!("stored session expired; refreshing");
        match self.refresh().await {
            Ok(session) => Ok(Some(session)),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ClientError> {
        debug!(%user_id, "fetching profile");
        self.profile().await
    }

    async fn fetch_role(&self, user_id: Uuid) -> Result<Option<UserRole>, ClientError> {
        debug!(%user_id, "fetching role");
        Ok(Some(self.role().await?))
    }
}
