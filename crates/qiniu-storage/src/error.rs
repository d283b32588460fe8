//! Storage error types.

use qiniu_auth::AuthError;
use qiniu_models::FailureKind;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {message}")]
    Remote {
        status: u16,
        message: String,
        req_id: Option<String>,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build a remote error from a non-success response body.
    ///
    /// The service answers `{"error": "..."}`; other bodies are kept verbatim.
    pub fn from_http_status(status: u16, body: &str, req_id: Option<String>) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.trim().to_string());

        Self::Remote {
            status,
            message,
            req_id,
        }
    }

    /// Classification used by the response envelope.
    pub fn kind(&self) -> FailureKind {
        match self {
            StorageError::Validation(_) | StorageError::Auth(_) => FailureKind::Validation,
            StorageError::Remote { .. } => FailureKind::Remote,
            StorageError::Network(_)
            | StorageError::InvalidResponse(_)
            | StorageError::Io(_)
            | StorageError::Json(_) => FailureKind::Transport,
        }
    }

    /// HTTP status, when the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            StorageError::Remote { status, .. } => Some(*status),
            StorageError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the failure is transient.
    ///
    /// 6xx codes are application errors (612 missing, 614 exists) and 579
    /// means the upload succeeded but the callback failed, so both are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            StorageError::Remote { status, .. } => {
                ((500..600).contains(status) && *status != 579) || *status == 429 || *status == 406
            }
            _ => false,
        }
    }
}
