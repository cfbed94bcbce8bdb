use newsdesk_shared::FormErrors;
use reqwest::StatusCode;

/// Error type for API operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success response; `message` is the body's `error` text.
    #[error("{message}")]
    Status { code: StatusCode, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected by form rules, locally or by the server.
    #[error("Please fix the errors in the form")]
    Validation(FormErrors),

    #[error("Not signed in")]
    NotSignedIn,
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    ///
    /// Network failures, 5xx and 429 are transient; every other status fails
    /// immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Network(e) => !e.is_builder() && !e.is_decode(),
            ClientError::Status { code, .. } => {
                code.is_server_error() || *code == StatusCode::TOO_MANY_REQUESTS
            }
            ClientError::Serialization(_)
            | ClientError::Validation(_)
            | ClientError::NotSignedIn => false,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { code, .. } => Some(*code),
            ClientError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Session is gone server side; local auth state should be cleared.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED) || matches!(self, ClientError::NotSignedIn)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}
