//! Route table and access decisions for the console.

use crate::auth::AuthSnapshot;

/// Every page the console can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Callback,
    Home,
    Profile,
    Notifications,
    Saved,
    News,
    Analytics,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

impl Route {
    /// Resolve a browser path. Query strings and trailing slashes are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Route::Home,
            "/auth/login" => Route::Login,
            "/auth/register" => Route::Register,
            "/auth/callback" => Route::Callback,
            "/profile" => Route::Profile,
            "/notifications" => Route::Notifications,
            "/saved" => Route::Saved,
            "/news" => Route::News,
            "/analytics" => Route::Analytics,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/auth/login",
            Route::Register => "/auth/register",
            Route::Callback => "/auth/callback",
            Route::Home => "/",
            Route::Profile => "/profile",
            Route::Notifications => "/notifications",
            Route::Saved => "/saved",
            Route::News => "/news",
            Route::Analytics => "/analytics",
            Route::NotFound => "/404",
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Login | Route::Register | Route::Callback | Route::NotFound => Access::Public,
            Route::Home | Route::Profile | Route::Notifications | Route::Saved => {
                Access::Authenticated
            }
            Route::News | Route::Analytics => Access::Admin,
        }
    }
}

/// What a non-admin sees on an admin route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeniedBehavior {
    #[default]
    RedirectHome,
    AccessDenied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Spinner,
    Render,
    Redirect(Route),
    AccessDenied,
}

/// Decide what to show for `route` given the current auth snapshot.
pub fn guard(route: Route, snapshot: &AuthSnapshot, denied: DeniedBehavior) -> GuardDecision {
    let access = route.access();
    if access == Access::Public {
        return GuardDecision::Render;
    }
    if snapshot.is_resolving() {
        return GuardDecision::Spinner;
    }
    if !snapshot.is_authenticated() {
        return GuardDecision::Redirect(Route::Login);
    }
    if access == Access::Admin && !snapshot.is_admin() {
        return match denied {
            DeniedBehavior::RedirectHome => GuardDecision::Redirect(Route::Home),
            DeniedBehavior::AccessDenied => GuardDecision::AccessDenied,
        };
    }
    GuardDecision::Render
}

/// Where the OAuth-style callback page sends the user.
pub fn callback_target<S, E>(result: &Result<Option<S>, E>) -> Route {
    match result {
        Ok(Some(_)) => Route::Home,
        _ => Route::Login,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavEntry {
    pub route: Route,
    pub label: &'static str,
}

const NAVIGATION: [NavEntry; 6] = [
    NavEntry { route: Route::Home, label: "Dashboard" },
    NavEntry { route: Route::News, label: "News Management" },
    NavEntry { route: Route::Notifications, label: "Notifications" },
    NavEntry { route: Route::Saved, label: "Saved Articles" },
    NavEntry { route: Route::Analytics, label: "Analytics" },
    NavEntry { route: Route::Profile, label: "Profile" },
];

/// Sidebar entries visible to the current user.
pub fn navigation(snapshot: &AuthSnapshot) -> Vec<NavEntry> {
    if !snapshot.is_authenticated() {
        return Vec::new();
    }
    NAVIGATION
        .iter()
        .filter(|entry| entry.route.access() != Access::Admin || snapshot.is_admin())
        .cloned()
        .collect()
}
