use crate::common::{Actor, ApiError, ApiResult, SessionId, UserId};
use crate::domains::auth::models::AuthSession;
use crate::domains::auth::{Claims, JwtService};
use crate::kernel::ServerDeps;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

/// Authenticated user information from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub email: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: UserId::from_uuid(claims.user_id),
            session_id: SessionId::from_uuid(claims.session_id),
            email: claims.email,
        }
    }
}

impl AuthUser {
    /// Resolve the caller's current role for capability checks.
    pub async fn actor(&self, deps: &ServerDeps) -> ApiResult<Actor> {
        Ok(Actor::load(self.user_id, &deps.db_pool).await?)
    }
}

/// JWT authentication middleware
///
/// Verifies the bearer token and checks that its session has not been revoked.
/// Requests without a valid token continue without an `AuthUser`; handlers that
/// need one reject them through the extractor.
pub async fn jwt_auth_middleware(
    deps: ServerDeps,
    mut request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if let Some(user) = extract_auth_user(&request, &deps.jwt_service) {
        match AuthSession::is_active(user.session_id, &deps.db_pool).await {
            Ok(true) => {
                debug!(user_id = %user.user_id, "authenticated request");
                request.extensions_mut().insert(user);
            }
            Ok(false) => debug!(session_id = %user.session_id, "token for inactive session"),
            Err(e) => warn!(error = %e, "session lookup failed"),
        }
    } else {
        debug!("No valid authentication token");
    }

    next.run(request).await
}

/// Extract and verify JWT token from request
fn extract_auth_user(
    request: &axum::http::Request<axum::body::Body>,
    jwt_service: &JwtService,
) -> Option<AuthUser> {
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    // Accept both "Bearer <token>" and a raw token
    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str);

    let claims = jwt_service.verify_token(token).ok()?;
    Some(claims.into())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthenticated("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn service() -> JwtService {
        JwtService::new("test_secret", "test_issuer".to_string(), 3600)
    }

    #[test]
    fn test_extract_token_with_bearer() {
        let jwt_service = service();
        let user_id = Uuid::new_v4();
        let (token, _) = jwt_service
            .create_token(user_id, Uuid::new_v4(), "reader@example.com")
            .unwrap();

        let request = axum::http::Request::builder()
            .header("authorization", format!("Bearer {}", token))
            .body(axum::body::Body::empty())
            .unwrap();

        let auth_user = extract_auth_user(&request, &jwt_service).unwrap();
        assert_eq!(auth_user.user_id, UserId::from_uuid(user_id));
        assert_eq!(auth_user.email, "reader@example.com");
    }

    #[test]
    fn test_extract_token_without_bearer() {
        let jwt_service = service();
        let session_id = Uuid::new_v4();
        let (token, _) = jwt_service
            .create_token(Uuid::new_v4(), session_id, "reader@example.com")
            .unwrap();

        let request = axum::http::Request::builder()
            .header("authorization", token)
            .body(axum::body::Body::empty())
            .unwrap();

        let auth_user = extract_auth_user(&request, &jwt_service).unwrap();
        assert_eq!(auth_user.session_id, SessionId::from_uuid(session_id));
    }

    #[test]
    fn test_no_auth_header() {
        let request = axum::http::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();

        assert!(extract_auth_user(&request, &service()).is_none());
    }

    #[test]
    fn test_invalid_token() {
        let request = axum::http::Request::builder()
            .header("authorization", "Bearer invalid_token")
            .body(axum::body::Body::empty())
            .unwrap();

        assert!(extract_auth_user(&request, &service()).is_none());
    }

    #[tokio::test]
    async fn extractor_rejects_missing_user() {
        let (mut parts, _) = axum::http::Request::builder()
            .body(())
            .unwrap()
            .into_parts();

        let err = AuthUser::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }
}
