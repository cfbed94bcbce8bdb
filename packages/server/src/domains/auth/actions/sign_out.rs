//! Sign out action

use newsdesk_shared::AuthChangeKind;
use tracing::{info, warn};

use crate::common::{ApiResult, SessionId, UserId};
use crate::domains::auth::actions::publish_auth_change;
use crate::domains::auth::models::AuthSession;
use crate::domains::profiles::ProfileRecord;
use crate::kernel::ServerDeps;

/// Revoke the caller's session and forget the device push token. Idempotent.
pub async fn sign_out(user_id: UserId, session_id: SessionId, deps: &ServerDeps) -> ApiResult<()> {
    if AuthSession::revoke(session_id, &deps.db_pool).await? {
        info!(user_id = %user_id, session_id = %session_id, "user signed out");
        publish_auth_change(user_id, AuthChangeKind::SignedOut, deps).await;
    }

    // A signed-out device must stop receiving pushes.
    if let Err(e) = ProfileRecord::set_push_token(user_id, None, &deps.db_pool).await {
        warn!(user_id = %user_id, error = %e, "failed to clear push token on sign-out");
    }
    Ok(())
}
