//! Profile actions

use newsdesk_shared::{
    AuthChangeKind, NotificationPreferences, PreferencesUpdate, Profile, ProfileUpdate, Role,
    UserRole,
};
use tracing::info;

use crate::common::{Actor, ApiError, ApiResult, Capability, UserId};
use crate::domains::auth::actions::publish_auth_change;
use crate::domains::auth::models::UserAccount;
use crate::domains::profiles::models::{ProfileRecord, UserRoleRecord};
use crate::kernel::ServerDeps;

pub async fn get_profile(user_id: UserId, deps: &ServerDeps) -> ApiResult<Profile> {
    ProfileRecord::find_by_id(user_id, &deps.db_pool)
        .await?
        .map(|record| record.to_profile())
        .ok_or(ApiError::NotFound("Profile"))
}

pub async fn update_profile(
    user_id: UserId,
    update: ProfileUpdate,
    deps: &ServerDeps,
) -> ApiResult<Profile> {
    let record = ProfileRecord::update_details(user_id, &update, &deps.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;
    publish_auth_change(user_id, AuthChangeKind::UserUpdated, deps).await;
    Ok(record.to_profile())
}

/// Merge the provided preference fields into the stored ones.
pub async fn update_notification_preferences(
    user_id: UserId,
    update: PreferencesUpdate,
    deps: &ServerDeps,
) -> ApiResult<NotificationPreferences> {
    let current = ProfileRecord::find_by_id(user_id, &deps.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;

    let merged = update.apply(&current.preferences());
    ProfileRecord::set_preferences(user_id, &merged, &deps.db_pool).await?;
    Ok(merged)
}

/// Register (or with `None`, clear) the device token used for push.
pub async fn set_push_token(
    user_id: UserId,
    token: Option<String>,
    deps: &ServerDeps,
) -> ApiResult<NotificationPreferences> {
    let token = token.filter(|t| !t.trim().is_empty());
    let record = ProfileRecord::set_push_token(user_id, token.as_deref(), &deps.db_pool)
        .await?
        .ok_or(ApiError::NotFound("Profile"))?;
    info!(user_id = %user_id, registered = token.is_some(), "push token updated");
    Ok(record.preferences())
}

pub async fn get_role(user_id: UserId, deps: &ServerDeps) -> ApiResult<UserRole> {
    let role = UserRoleRecord::role_for(user_id, &deps.db_pool).await?;
    Ok(UserRole { role })
}

/// Admin-only: change another user's role.
pub async fn set_user_role(
    actor: Actor,
    target: UserId,
    role: Role,
    deps: &ServerDeps,
) -> ApiResult<UserRole> {
    let actor = actor.can(Capability::ManageUsers).check()?;

    if UserAccount::find_by_id(target, &deps.db_pool).await?.is_none() {
        return Err(ApiError::NotFound("User"));
    }

    let record = UserRoleRecord::upsert(target, role, &deps.db_pool).await?;
    info!(
        actor = %actor.user_id(),
        target = %target,
        role = role.as_str(),
        "user role changed"
    );
    publish_auth_change(target, AuthChangeKind::UserUpdated, deps).await;

    Ok(UserRole { role: record.role })
}
