//! Sign in action

use newsdesk_shared::{Credentials, Session};
use tracing::{info, warn};

use crate::common::{ApiResult, AuthError};
use crate::domains::auth::actions::issue_session;
use crate::domains::auth::models::UserAccount;
use crate::domains::auth::password::verify_password;
use crate::kernel::ServerDeps;

/// Check credentials and open a session.
///
/// Unknown email and wrong password fail the same way.
pub async fn sign_in(credentials: Credentials, deps: &ServerDeps) -> ApiResult<Session> {
    let email = credentials.email.trim().to_lowercase();

    let Some(account) = UserAccount::find_by_email(&email, &deps.db_pool).await? else {
        warn!("sign-in for unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    if !verify_password(&account.password_hash, &credentials.password)? {
        warn!(user_id = %account.id, "sign-in with wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let session = issue_session(&account, deps).await?;
    info!(user_id = %account.id, "user signed in");
    Ok(session)
}
