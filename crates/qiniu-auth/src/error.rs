//! Auth error types.

use thiserror::Error;

/// Result type for signing operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors raised while building credentials or tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid upload policy: {0}")]
    InvalidPolicy(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AuthError {
    pub fn invalid_credentials(msg: impl Into<String>) -> Self {
        Self::InvalidCredentials(msg.into())
    }

    pub fn invalid_policy(msg: impl Into<String>) -> Self {
        Self::InvalidPolicy(msg.into())
    }
}
