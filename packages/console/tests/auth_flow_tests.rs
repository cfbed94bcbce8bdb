//! Bootstrap and guards together, with the clock paused.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use newsdesk_console::auth::{AuthBootstrap, IdentitySource};
use newsdesk_console::guards::{guard, DeniedBehavior, GuardDecision, Route};
use newsdesk_console::{ClientError, ConsoleConfig};
use newsdesk_shared::{AuthChangeKind, Profile, Role, Session, User, UserRole};
use uuid::Uuid;

#[derive(Default)]
struct Directory {
    session: Mutex<Option<Session>>,
    roles: Mutex<Vec<(Uuid, Role)>>,
    role_calls: AtomicUsize,
}

#[async_trait]
impl IdentitySource for Directory {
    async fn current_session(&self) -> Result<Option<Session>, ClientError> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn fetch_profile(&self, _user_id: Uuid) -> Result<Option<Profile>, ClientError> {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(None)
    }

    async fn fetch_role(&self, user_id: Uuid) -> Result<Option<UserRole>, ClientError> {
        self.role_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;
        Ok(self
            .roles
            .lock()
            .unwrap()
            .iter()
            .find(|(id, _)| *id == user_id)
            .map(|(_, role)| UserRole { role: *role }))
    }
}

fn session_for(email: &str) -> Session {
    Session {
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: Utc::now() + chrono::Duration::hours(1),
        user: User {
            id: Uuid::new_v4(),
            email: email.to_string(),
        },
    }
}

#[tokio::test(start_paused = true)]
async fn admin_route_spins_then_renders_for_admin() {
    let session = session_for("admin@example.com");
    let directory = Arc::new(Directory {
        session: Mutex::new(Some(session.clone())),
        roles: Mutex::new(vec![(session.user.id, Role::Admin)]),
        ..Default::default()
    });
    let handle = AuthBootstrap::spawn(directory, &ConsoleConfig::default());

    assert_eq!(
        guard(Route::News, &handle.snapshot(), DeniedBehavior::default()),
        GuardDecision::Spinner
    );

    let state = handle.wait_until_loaded().await;
    assert_eq!(
        guard(Route::News, &state, DeniedBehavior::default()),
        GuardDecision::Render
    );
}

#[tokio::test(start_paused = true)]
async fn user_without_role_row_is_sent_home_from_admin_routes() {
    let directory = Arc::new(Directory {
        session: Mutex::new(Some(session_for("reader@example.com"))),
        ..Default::default()
    });
    let handle = AuthBootstrap::spawn(directory, &ConsoleConfig::default());
    let state = handle.wait_until_loaded().await;

    assert_eq!(state.user_role, Some(UserRole::user()));
    assert_eq!(
        guard(Route::Analytics, &state, DeniedBehavior::default()),
        GuardDecision::Redirect(Route::Home)
    );
    assert_eq!(
        guard(Route::Saved, &state, DeniedBehavior::default()),
        GuardDecision::Render
    );
}

#[tokio::test(start_paused = true)]
async fn signed_out_visitor_is_sent_to_login() {
    let handle = AuthBootstrap::spawn(Arc::new(Directory::default()), &ConsoleConfig::default());
    let state = handle.wait_until_loaded().await;
    assert_eq!(
        guard(Route::Home, &state, DeniedBehavior::default()),
        GuardDecision::Redirect(Route::Login)
    );
}

#[tokio::test(start_paused = true)]
async fn switching_accounts_never_leaks_admin_role() {
    let admin = session_for("admin@example.com");
    let reader = session_for("reader@example.com");
    let directory = Arc::new(Directory {
        session: Mutex::new(Some(admin.clone())),
        roles: Mutex::new(vec![(admin.user.id, Role::Admin)]),
        ..Default::default()
    });
    let handle = AuthBootstrap::spawn(directory.clone(), &ConsoleConfig::default());
    assert!(handle.wait_until_loaded().await.is_admin());

    handle.notify(AuthChangeKind::SignedOut, None);
    handle.notify(AuthChangeKind::SignedIn, Some(reader.clone()));

    let state = handle
        .wait_for(|s| {
            s.user.as_ref().map(|u| u.id) == Some(reader.user.id) && s.user_role.is_some()
        })
        .await;
    assert!(!state.is_admin());
    assert_eq!(
        guard(Route::News, &state, DeniedBehavior::AccessDenied),
        GuardDecision::AccessDenied
    );
    assert_eq!(directory.role_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn custom_safety_timeout_is_respected() {
    struct Stuck;

    #[async_trait]
    impl IdentitySource for Stuck {
        async fn current_session(&self) -> Result<Option<Session>, ClientError> {
            std::future::pending().await
        }
        async fn fetch_profile(&self, _: Uuid) -> Result<Option<Profile>, ClientError> {
            std::future::pending().await
        }
        async fn fetch_role(&self, _: Uuid) -> Result<Option<UserRole>, ClientError> {
            std::future::pending().await
        }
    }

    let config = ConsoleConfig::default().with_safety_timeout(Duration::from_millis(1500));
    let started = tokio::time::Instant::now();
    let handle = AuthBootstrap::spawn(Arc::new(Stuck), &config);

    let state = handle.wait_until_loaded().await;
    assert!(state.initial_load_done);
    assert!(state.user.is_none());
    assert!(started.elapsed() >= Duration::from_millis(1500));
    assert!(started.elapsed() < Duration::from_millis(3000));
    assert_eq!(
        guard(Route::Profile, &state, DeniedBehavior::default()),
        GuardDecision::Redirect(Route::Login)
    );
}
