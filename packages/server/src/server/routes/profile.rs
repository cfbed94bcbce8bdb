//! Own profile, preferences, device token and role; admin role changes.

use axum::{
    extract::{Extension, Path},
    routing::{get, put},
    Json, Router,
};
use newsdesk_shared::{
    NotificationPreferences, PreferencesUpdate, Profile, ProfileUpdate, PushTokenUpdate, UserRole,
};

use crate::common::{ApiResult, UserId};
use crate::domains::profiles::actions;
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route("/api/profile", get(get_profile).put(update_profile))
        .route(
            "/api/profile/notification-preferences",
            put(update_preferences),
        )
        .route("/api/profile/push-token", put(set_push_token))
        .route("/api/profile/role", get(get_role))
        .route("/api/users/:id/role", put(set_user_role))
}

async fn get_profile(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
) -> ApiResult<Json<Profile>> {
    Ok(Json(actions::get_profile(user.user_id, &state.deps).await?))
}

async fn update_profile(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(
        actions::update_profile(user.user_id, update, &state.deps).await?,
    ))
}

async fn update_preferences(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Json(update): Json<PreferencesUpdate>,
) -> ApiResult<Json<NotificationPreferences>> {
    Ok(Json(
        actions::update_notification_preferences(user.user_id, update, &state.deps).await?,
    ))
}

async fn set_push_token(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Json(update): Json<PushTokenUpdate>,
) -> ApiResult<Json<NotificationPreferences>> {
    Ok(Json(
        actions::set_push_token(user.user_id, update.fcm_token, &state.deps).await?,
    ))
}

async fn get_role(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
) -> ApiResult<Json<UserRole>> {
    Ok(Json(actions::get_role(user.user_id, &state.deps).await?))
}

async fn set_user_role(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
    Path(target): Path<UserId>,
    Json(body): Json<UserRole>,
) -> ApiResult<Json<UserRole>> {
    let actor = user.actor(&state.deps).await?;
    Ok(Json(
        actions::set_user_role(actor, target, body.role, &state.deps).await?,
    ))
}
