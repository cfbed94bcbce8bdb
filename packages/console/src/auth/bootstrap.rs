use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use newsdesk_shared::{AuthChangeKind, Profile, Session, UserRole};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::{reduce, AuthEffect, AuthEvent, AuthSnapshot, Ticket, Tracker};
use crate::config::ConsoleConfig;
use crate::error::ClientError;
use crate::guards::Route;

/// Where the bootstrap reads identity from. Implemented by [`crate::ApiClient`].
#[async_trait]
pub trait IdentitySource: Send + Sync + 'static {
    async fn current_session(&self) -> Result<Option<Session>, ClientError>;
    async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ClientError>;
    async fn fetch_role(&self, user_id: Uuid) -> Result<Option<UserRole>, ClientError>;
}

/// One auth state change as reported by the API client.
#[derive(Debug, Clone)]
pub struct AuthNotice {
    pub kind: AuthChangeKind,
    pub session: Option<Session>,
}

enum Inbound {
    Restored(Option<Session>),
    Fetched {
        user_id: Uuid,
        ticket: Ticket,
        profile: Option<Profile>,
        role: Option<UserRole>,
        cacheable: bool,
    },
}

struct CachedIdentity {
    fetched_at: Instant,
    profile: Option<Profile>,
    role: Option<UserRole>,
}

/// Handle to a running bootstrap task.
///
/// The task stops once the handle and every notifier are dropped.
pub struct AuthHandle {
    snapshots: watch::Receiver<AuthSnapshot>,
    redirects: broadcast::Sender<Route>,
    changes: mpsc::UnboundedSender<AuthNotice>,
    task: JoinHandle<()>,
}

impl AuthHandle {
    /// Current snapshot.
    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshots.clone()
    }

    pub fn redirects(&self) -> broadcast::Receiver<Route> {
        self.redirects.subscribe()
    }

    /// Sender for feeding auth changes from another task.
    pub fn notifier(&self) -> mpsc::UnboundedSender<AuthNotice> {
        self.changes.clone()
    }

    /// Report an auth state change (sign-in, refresh, sign-out).
    pub fn notify(&self, kind: AuthChangeKind, session: Option<Session>) {
        if self.changes.send(AuthNotice { kind, session }).is_err() {
            warn!("auth bootstrap stopped; dropping {:?}", kind);
        }
    }

    /// Wait until the first load has settled, by data or by timeout.
    pub async fn wait_until_loaded(&self) -> AuthSnapshot {
        let mut rx = self.snapshots.clone();
        let snapshot = match rx.wait_for(|s| s.initial_load_done && !s.loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    /// Wait for the first snapshot matching `predicate`.
    pub async fn wait_for(&self, predicate: impl FnMut(&AuthSnapshot) -> bool) -> AuthSnapshot {
        let mut rx = self.snapshots.clone();
        let snapshot = match rx.wait_for(predicate).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        snapshot
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Drives [`reduce`] on a tokio task.
pub struct AuthBootstrap<S: IdentitySource> {
    source: Arc<S>,
    safety_timeout: Duration,
    dedupe_window: Duration,
    cache_ttl: Duration,
    cache: HashMap<Uuid, CachedIdentity>,
    snapshots: watch::Sender<AuthSnapshot>,
    redirects: broadcast::Sender<Route>,
}

impl<S: IdentitySource> AuthBootstrap<S> {
    /// Start the bootstrap: request the current session, arm the safety
    /// timeout and begin listening for auth changes.
    pub fn spawn(source: Arc<S>, config: &ConsoleConfig) -> AuthHandle {
        let (snapshots_tx, snapshots_rx) = watch::channel(AuthSnapshot::initial());
        let (redirects_tx, _) = broadcast::channel(16);
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();

        let bootstrap = Self {
            source,
            safety_timeout: config.safety_timeout,
            dedupe_window: config.dedupe_window,
            cache_ttl: config.identity_cache_ttl,
            cache: HashMap::new(),
            snapshots: snapshots_tx,
            redirects: redirects_tx.clone(),
        };
        let task = tokio::spawn(bootstrap.run(changes_rx));

        AuthHandle {
            snapshots: snapshots_rx,
            redirects: redirects_tx,
            changes: changes_tx,
            task,
        }
    }

    async fn run(mut self, mut changes: mpsc::UnboundedReceiver<AuthNotice>) {
        let mut state = AuthSnapshot::initial();
        let mut tracker = Tracker::new(self.dedupe_window);
        let (inbound_tx, mut inbound) = mpsc::unbounded_channel::<Inbound>();

        let safety = tokio::time::sleep(self.safety_timeout);
        tokio::pin!(safety);
        let mut safety_armed = true;

        {
            let source = self.source.clone();
            let tx = inbound_tx.clone();
            tokio::spawn(async move {
                let session = match source.current_session().await {
                    Ok(session) => session,
                    Err(e) => {
                        warn!(error = %e, "Failed to restore session");
                        None
                    }
                };
                let _ = tx.send(Inbound::Restored(session));
            });
        }

        loop {
            let event = tokio::select! {
                change = changes.recv() => match change {
                    Some(AuthNotice { kind, session }) => {
                        debug!(?kind, "auth change");
                        AuthEvent::AuthChanged { kind, session, at: Instant::now() }
                    }
                    None => break,
                },
                Some(message) = inbound.recv() => self.accept(message),
                () = &mut safety, if safety_armed => {
                    safety_armed = false;
                    warn!(
                        timeout_ms = self.safety_timeout.as_millis() as u64,
                        "Auth load timed out; continuing without identity"
                    );
                    AuthEvent::SafetyTimeoutElapsed
                }
            };

            let (next, effects) = reduce(&state, &mut tracker, event);
            state = next;
            if state.user.is_none() {
                self.cache.clear();
            }
            self.publish(&state);

            for effect in effects {
                match effect {
                    AuthEffect::FetchIdentity { user_id, ticket } => {
                        self.fetch_identity(user_id, ticket, inbound_tx.clone());
                    }
                    AuthEffect::RedirectToLogin => {
                        let _ = self.redirects.send(Route::Login);
                    }
                    AuthEffect::CancelSafetyTimeout => safety_armed = false,
                }
            }
        }

        debug!("auth bootstrap stopped");
    }

    fn accept(&mut self, message: Inbound) -> AuthEvent {
        match message {
            Inbound::Restored(session) => AuthEvent::SessionRestored(session),
            Inbound::Fetched {
                user_id,
                ticket,
                profile,
                role,
                cacheable,
            } => {
                if cacheable {
                    self.cache.insert(
                        user_id,
                        CachedIdentity {
                            fetched_at: Instant::now(),
                            profile: profile.clone(),
                            role,
                        },
                    );
                }
                AuthEvent::IdentityFetched {
                    user_id,
                    ticket,
                    profile,
                    role,
                }
            }
        }
    }

    fn publish(&self, state: &AuthSnapshot) {
        self.snapshots.send_if_modified(|current| {
            if *current == *state {
                false
            } else {
                *current = state.clone();
                true
            }
        });
    }

    fn fetch_identity(&mut self, user_id: Uuid, ticket: Ticket, tx: mpsc::UnboundedSender<Inbound>) {
        if let Some(cached) = self.cache.get(&user_id) {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                debug!(%user_id, "identity served from cache");
                let _ = tx.send(Inbound::Fetched {
                    user_id,
                    ticket,
                    profile: cached.profile.clone(),
                    role: cached.role,
                    cacheable: false,
                });
                return;
            }
            self.cache.remove(&user_id);
        }

        let source = self.source.clone();
        tokio::spawn(async move {
            let (profile, role) =
                tokio::join!(source.fetch_profile(user_id), source.fetch_role(user_id));

            let mut cacheable = true;
            let profile = profile.unwrap_or_else(|e| {
                warn!(%user_id, error = %e, "Failed to fetch profile");
                cacheable = false;
                None
            });
            let role = role.unwrap_or_else(|e| {
                warn!(%user_id, error = %e, "Failed to fetch role; treating as user");
                cacheable = false;
                None
            });
            info!(%user_id, role = ?role.map(|r| r.role), "identity loaded");

            let _ = tx.send(Inbound::Fetched {
                user_id,
                ticket,
                profile,
                role,
                cacheable,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdesk_shared::{Role, User};
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        session: Mutex<Option<Session>>,
        role: Mutex<Option<Role>>,
        role_fails: bool,
        fetch_delay: Option<Duration>,
        profile_calls: AtomicUsize,
        role_calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentitySource for FakeSource {
        async fn current_session(&self) -> Result<Option<Session>, ClientError> {
            Ok(self.session.lock().unwrap().clone())
        }

        async fn fetch_profile(&self, user_id: Uuid) -> Result<Option<Profile>, ClientError> {
            self.profile_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(Some(Profile {
                id: user_id,
                username: Some("ed".to_string()),
                avatar_url: None,
                notification_preferences: None,
            }))
        }

        async fn fetch_role(&self, _user_id: Uuid) -> Result<Option<UserRole>, ClientError> {
            self.role_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.fetch_delay {
                tokio::time::sleep(delay).await;
            }
            if self.role_fails {
                return Err(ClientError::Status {
                    code: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "boom".to_string(),
                });
            }
            Ok(self.role.lock().unwrap().map(|role| UserRole { role }))
        }
    }

    fn session() -> Session {
        Session {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            user: User {
                id: Uuid::new_v4(),
                email: "editor@example.com".to_string(),
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restores_admin_session_on_mount() {
        let source = Arc::new(FakeSource {
            session: Mutex::new(Some(session())),
            role: Mutex::new(Some(Role::Admin)),
            ..Default::default()
        });
        let handle = AuthBootstrap::spawn(source.clone(), &ConsoleConfig::default());

        let state = handle.wait_until_loaded().await;
        assert!(state.is_admin());
        assert!(state.profile.is_some());
        assert_eq!(source.profile_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.role_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_session_settles_signed_out() {
        let source = Arc::new(FakeSource::default());
        let handle = AuthBootstrap::spawn(source.clone(), &ConsoleConfig::default());

        let state = handle.wait_until_loaded().await;
        assert!(state.user.is_none());
        assert_eq!(source.role_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_fetch_is_cut_off_by_safety_timeout() {
        let source = Arc::new(FakeSource {
            session: Mutex::new(Some(session())),
            role: Mutex::new(Some(Role::Admin)),
            fetch_delay: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        let started = Instant::now();
        let handle = AuthBootstrap::spawn(source, &ConsoleConfig::default());

        let state = handle.wait_until_loaded().await;
        assert!(started.elapsed() >= Duration::from_millis(3000));
        assert!(started.elapsed() < Duration::from_secs(60));
        assert!(state.initial_load_done);
        assert!(!state.is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_role_fetch_means_user() {
        let source = Arc::new(FakeSource {
            session: Mutex::new(Some(session())),
            role_fails: true,
            ..Default::default()
        });
        let handle = AuthBootstrap::spawn(source, &ConsoleConfig::default());

        let state = handle.wait_until_loaded().await;
        assert_eq!(state.user_role, Some(UserRole::user()));
        assert!(!state.is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn sign_out_redirects_and_clears() {
        let source = Arc::new(FakeSource {
            session: Mutex::new(Some(session())),
            role: Mutex::new(Some(Role::Admin)),
            ..Default::default()
        });
        let handle = AuthBootstrap::spawn(source, &ConsoleConfig::default());
        let mut redirects = handle.redirects();
        handle.wait_until_loaded().await;

        handle.notify(AuthChangeKind::SignedOut, None);
        assert_eq!(redirects.recv().await.unwrap(), Route::Login);

        let state = handle.wait_for(|s| s.user.is_none()).await;
        assert!(state.user_role.is_none());
        assert!(!state.is_admin());
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_sign_in_fetches_identity_once() {
        let source = Arc::new(FakeSource {
            role: Mutex::new(Some(Role::User)),
            ..Default::default()
        });
        let handle = AuthBootstrap::spawn(source.clone(), &ConsoleConfig::default());
        handle.wait_until_loaded().await;

        let signed_in = session();
        handle.notify(AuthChangeKind::SignedIn, Some(signed_in.clone()));
        handle.notify(AuthChangeKind::SignedIn, Some(signed_in.clone()));
        handle.notify(AuthChangeKind::TokenRefreshed, Some(signed_in));

        let state = handle.wait_for(|s| s.user_role.is_some()).await;
        assert!(!state.is_admin());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(source.profile_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.role_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn losing_the_session_drops_cached_identity() {
        let source = Arc::new(FakeSource {
            role: Mutex::new(Some(Role::Admin)),
            ..Default::default()
        });
        let handle = AuthBootstrap::spawn(source.clone(), &ConsoleConfig::default());
        handle.wait_until_loaded().await;

        let signed_in = session();
        handle.notify(AuthChangeKind::SignedIn, Some(signed_in.clone()));
        assert!(handle.wait_for(|s| s.user_role.is_some()).await.is_admin());

        // Demoted while the session is gone; not an explicit sign-out.
        *source.role.lock().unwrap() = Some(Role::User);
        handle.notify(AuthChangeKind::UserUpdated, None);
        handle.wait_for(|s| s.user.is_none()).await;

        handle.notify(AuthChangeKind::SignedIn, Some(signed_in));
        let state = handle
            .wait_for(|s| s.user.is_some() && s.user_role.is_some())
            .await;
        assert!(!state.is_admin());
        assert_eq!(source.role_calls.load(Ordering::SeqCst), 2);
    }
}
