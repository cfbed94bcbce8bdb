//! Email/password session endpoints.

use axum::{
    extract::Extension,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use newsdesk_shared::{Credentials, RefreshRequest, Session, User};

use crate::common::ApiResult;
use crate::domains::auth::actions;
use crate::server::app::AxumAppState;
use crate::server::middleware::AuthUser;

pub fn router() -> Router {
    Router::new()
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/session", get(session))
}

async fn sign_up(
    Extension(state): Extension<AxumAppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let session = actions::sign_up(credentials, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

async fn sign_in(
    Extension(state): Extension<AxumAppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<Session>> {
    Ok(Json(actions::sign_in(credentials, &state.deps).await?))
}

async fn refresh(
    Extension(state): Extension<AxumAppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<Session>> {
    Ok(Json(
        actions::refresh_session(&request.refresh_token, &state.deps).await?,
    ))
}

async fn sign_out(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
) -> ApiResult<StatusCode> {
    actions::sign_out(user.user_id, user.session_id, &state.deps).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The user bound to the bearer token.
async fn session(
    Extension(state): Extension<AxumAppState>,
    user: AuthUser,
) -> ApiResult<Json<User>> {
    Ok(Json(actions::current_user(user.user_id, &state.deps).await?))
}
