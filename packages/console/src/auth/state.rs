use std::time::Duration;

use newsdesk_shared::{AuthChangeKind, Profile, Role, Session, User, UserRole};
use tokio::time::Instant;
use uuid::Uuid;

/// Identifies one identity fetch. Only the latest ticket for the current
/// user is allowed to write into the snapshot.
pub type Ticket = u64;

/// Everything the console knows about who is signed in.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub user_role: Option<UserRole>,
    pub loading: bool,
    pub initial_load_done: bool,
}

impl AuthSnapshot {
    /// State before the mount-time session request returns.
    pub fn initial() -> Self {
        Self {
            session: None,
            user: None,
            profile: None,
            user_role: None,
            loading: true,
            initial_load_done: false,
        }
    }

    /// Check if the signed-in user holds the admin role.
    pub fn is_admin(&self) -> bool {
        matches!(self.user_role, Some(UserRole { role: Role::Admin }))
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Protected views wait on this before deciding anything.
    pub fn is_resolving(&self) -> bool {
        self.loading && !self.initial_load_done
    }
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

#[derive(Debug, Clone)]
pub enum AuthEvent {
    /// Result of the mount-time session request.
    SessionRestored(Option<Session>),
    AuthChanged {
        kind: AuthChangeKind,
        session: Option<Session>,
        at: Instant,
    },
    /// Profile and role for `user_id`. `None` means absent or failed.
    IdentityFetched {
        user_id: Uuid,
        ticket: Ticket,
        profile: Option<Profile>,
        role: Option<UserRole>,
    },
    SafetyTimeoutElapsed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEffect {
    FetchIdentity { user_id: Uuid, ticket: Ticket },
    RedirectToLogin,
    CancelSafetyTimeout,
}

/// Bookkeeping that lives next to the snapshot but is never shown.
#[derive(Debug, Clone)]
pub struct Tracker {
    next_ticket: Ticket,
    pending: Option<(Uuid, Ticket)>,
    loaded_for: Option<Uuid>,
    last_change: Option<(AuthChangeKind, Option<Uuid>, Instant)>,
    saw_change: bool,
    dedupe_window: Duration,
}

impl Tracker {
    pub fn new(dedupe_window: Duration) -> Self {
        Self {
            next_ticket: 0,
            pending: None,
            loaded_for: None,
            last_change: None,
            saw_change: false,
            dedupe_window,
        }
    }

    fn issue(&mut self, user_id: Uuid) -> Ticket {
        self.next_ticket += 1;
        self.pending = Some((user_id, self.next_ticket));
        self.next_ticket
    }

    fn forget_identity(&mut self) {
        self.pending = None;
        self.loaded_for = None;
    }

    fn is_duplicate(&self, kind: AuthChangeKind, user_id: Option<Uuid>, at: Instant) -> bool {
        match self.last_change {
            Some((last_kind, last_user, last_at)) => {
                last_kind == kind
                    && last_user == user_id
                    && at.saturating_duration_since(last_at) < self.dedupe_window
            }
            None => false,
        }
    }

    pub fn in_flight(&self) -> Option<Uuid> {
        self.pending.map(|(user_id, _)| user_id)
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

/// Apply one event to the snapshot.
///
/// Returns the next snapshot and the effects the driver must perform. This
/// is the only place auth state changes.
pub fn reduce(
    current: &AuthSnapshot,
    tracker: &mut Tracker,
    event: AuthEvent,
) -> (AuthSnapshot, Vec<AuthEffect>) {
    let mut next = current.clone();
    let mut effects = Vec::new();

    match event {
        AuthEvent::SessionRestored(session) => {
            // A live auth change already told us more than the mount request can.
            if !tracker.saw_change {
                apply_session(&mut next, tracker, session, &mut effects);
            }
        }
        AuthEvent::AuthChanged { kind, session, at } => {
            tracker.saw_change = true;
            let user_id = session.as_ref().map(|s| s.user.id);
            if tracker.is_duplicate(kind, user_id, at) {
                return (next, effects);
            }
            tracker.last_change = Some((kind, user_id, at));

            if kind == AuthChangeKind::SignedOut {
                apply_session(&mut next, tracker, None, &mut effects);
                effects.push(AuthEffect::RedirectToLogin);
            } else {
                apply_session(&mut next, tracker, session, &mut effects);
            }
        }
        AuthEvent::IdentityFetched {
            user_id,
            ticket,
            profile,
            role,
        } => {
            if tracker.pending == Some((user_id, ticket)) {
                tracker.pending = None;
                tracker.loaded_for = Some(user_id);
                next.profile = profile;
                next.user_role = Some(role.unwrap_or_else(UserRole::user));
                finish(&mut next, &mut effects);
            }
        }
        AuthEvent::SafetyTimeoutElapsed => {
            if !next.initial_load_done {
                next.loading = false;
                next.initial_load_done = true;
            }
        }
    }

    (next, effects)
}

fn apply_session(
    next: &mut AuthSnapshot,
    tracker: &mut Tracker,
    session: Option<Session>,
    effects: &mut Vec<AuthEffect>,
) {
    let Some(session) = session else {
        next.session = None;
        next.user = None;
        next.profile = None;
        next.user_role = None;
        tracker.forget_identity();
        finish(next, effects);
        return;
    };

    let user_id = session.user.id;
    let same_user = next.user.as_ref().is_some_and(|u| u.id == user_id);
    next.user = Some(session.user.clone());
    next.session = Some(session);

    if tracker.loaded_for == Some(user_id) && same_user {
        finish(next, effects);
        return;
    }
    if tracker.in_flight() == Some(user_id) {
        return;
    }

    if !same_user {
        next.profile = None;
        next.user_role = None;
        tracker.loaded_for = None;
    }
    next.loading = true;
    let ticket = tracker.issue(user_id);
    effects.push(AuthEffect::FetchIdentity { user_id, ticket });
}

fn finish(next: &mut AuthSnapshot, effects: &mut Vec<AuthEffect>) {
    next.loading = false;
    if !next.initial_load_done {
        next.initial_load_done = true;
        effects.push(AuthEffect::CancelSafetyTimeout);
    }
}
