//! Sign up action

use newsdesk_shared::{Credentials, Role, Session};
use tracing::info;

use crate::common::{ApiError, ApiResult, AuthError};
use crate::domains::auth::actions::issue_session;
use crate::domains::auth::models::UserAccount;
use crate::domains::auth::password::{hash_password, MIN_PASSWORD_LENGTH};
use crate::domains::profiles::models::{ProfileRecord, UserRoleRecord};
use crate::kernel::ServerDeps;

/// Create an account with its profile and role, then sign it in.
///
/// Emails listed in `ADMIN_EMAILS` start out as admins; everyone else gets
/// an explicit `user` role row.
pub async fn sign_up(credentials: Credentials, deps: &ServerDeps) -> ApiResult<Session> {
    let email = credentials.email.trim().to_lowercase();
    validate_credentials(&email, &credentials.password)?;

    let password_hash = hash_password(&credentials.password)?;
    let role = if deps.is_admin_email(&email) {
        Role::Admin
    } else {
        Role::User
    };

    let mut tx = deps.db_pool.begin().await?;
    let account = UserAccount::create(&email, &password_hash, &mut *tx)
        .await?
        .ok_or(AuthError::EmailTaken)?;
    ProfileRecord::create_default(account.id, &mut *tx).await?;
    UserRoleRecord::create(account.id, role, &mut *tx).await?;
    tx.commit().await?;

    info!(user_id = %account.id, role = role.as_str(), "user signed up");

    Ok(issue_session(&account, deps).await?)
}

fn validate_credentials(email: &str, password: &str) -> ApiResult<()> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ApiError::bad_request(
            "Unable to validate email address: invalid format",
        ));
    };
    if local.is_empty() || domain.is_empty() {
        return Err(ApiError::bad_request(
            "Unable to validate email address: invalid format",
        ));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}
