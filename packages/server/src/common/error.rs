//! Error type returned by domain actions and rendered by the HTTP layer.

use newsdesk_shared::FormErrors;
use thiserror::Error;

use super::auth::AuthError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Form-level validation failure; `fields` maps field name to message.
    #[error("{message}")]
    Validation {
        message: String,
        fields: Option<FormErrors>,
    },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// First field message becomes the top-level error text.
    pub fn invalid_form(fields: FormErrors) -> Self {
        let message = fields
            .iter()
            .next()
            .map(|(_, message)| message.to_string())
            .unwrap_or_else(|| "Invalid input".to_string());
        Self::Validation {
            message,
            fields: Some(fields),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationRequired
            | AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::SessionRevoked => Self::Unauthenticated(err.to_string()),
            AuthError::EmailTaken => Self::Conflict(err.to_string()),
            AuthError::AdminRequired => Self::Forbidden(err.to_string()),
            AuthError::DatabaseError(e) => Self::Internal(e.into()),
            AuthError::InternalError(e) => Self::Internal(e),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Whether a model error came from a unique constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}
