use anyhow::Result;
use chrono::{Duration, Utc};
use newsdesk_shared::{realtime::topics, AuthChangeKind, Session, User};

use crate::common::{ApiError, ApiResult, UserId};
use crate::domains::auth::models::{AuthSession, UserAccount};
use crate::domains::auth::password::{generate_refresh_token, hash_refresh_token};
use crate::kernel::ServerDeps;

/// Open a new session row and mint its token pair.
pub async fn issue_session(account: &UserAccount, deps: &ServerDeps) -> Result<Session> {
    let refresh_token = generate_refresh_token();
    let session_expires = Utc::now() + Duration::days(deps.refresh_token_ttl_days);
    let session = AuthSession::create(
        account.id,
        &hash_refresh_token(&refresh_token),
        session_expires,
        &deps.db_pool,
    )
    .await?;

    let (access_token, expires_at) = deps.jwt_service.create_token(
        account.id.into_uuid(),
        session.id.into_uuid(),
        &account.email,
    )?;

    Ok(Session {
        access_token,
        refresh_token,
        expires_at,
        user: account.to_user(),
    })
}

/// The signed-in user behind an authenticated request.
pub async fn current_user(user_id: UserId, deps: &ServerDeps) -> ApiResult<User> {
    UserAccount::find_by_id(user_id, &deps.db_pool)
        .await?
        .map(|account| account.to_user())
        .ok_or(ApiError::NotFound("User"))
}

/// Tell the user's other tabs and devices that their auth state moved.
pub async fn publish_auth_change(user_id: UserId, kind: AuthChangeKind, deps: &ServerDeps) {
    deps.stream_hub
        .publish(
            &topics::auth(user_id.into_uuid()),
            serde_json::json!({
                "kind": kind,
                "user_id": user_id,
                "at": Utc::now(),
            }),
        )
        .await;
}
