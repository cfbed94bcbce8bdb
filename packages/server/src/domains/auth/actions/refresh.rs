//! Refresh session action

use chrono::{Duration, Utc};
use newsdesk_shared::{Session, AuthChangeKind};
use tracing::{debug, warn};

use crate::common::{ApiResult, AuthError};
use crate::domains::auth::actions::publish_auth_change;
use crate::domains::auth::models::{AuthSession, UserAccount};
use crate::domains::auth::password::{generate_refresh_token, hash_refresh_token};
use crate::kernel::ServerDeps;

/// Exchange a refresh token for a new token pair on the same session.
///
/// The presented refresh token is single-use: it is replaced atomically, so
/// replaying it afterwards fails.
pub async fn refresh_session(refresh_token: &str, deps: &ServerDeps) -> ApiResult<Session> {
    let next_token = generate_refresh_token();
    let session_expires = Utc::now() + Duration::days(deps.refresh_token_ttl_days);

    let Some(session) = AuthSession::rotate(
        &hash_refresh_token(refresh_token),
        &hash_refresh_token(&next_token),
        session_expires,
        &deps.db_pool,
    )
    .await?
    else {
        warn!("refresh with unknown, revoked or expired token");
        return Err(AuthError::InvalidToken.into());
    };

    let account = UserAccount::find_by_id(session.user_id, &deps.db_pool)
        .await?
        .ok_or(AuthError::InvalidToken)?;

    let (access_token, expires_at) = deps.jwt_service.create_token(
        account.id.into_uuid(),
        session.id.into_uuid(),
        &account.email,
    )?;

    debug!(user_id = %account.id, session_id = %session.id, "session refreshed");
    publish_auth_change(account.id, AuthChangeKind::TokenRefreshed, deps).await;

    Ok(Session {
        access_token,
        refresh_token: next_token,
        expires_at,
        user: account.to_user(),
    })
}
