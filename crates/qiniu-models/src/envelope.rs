//! Uniform `{code, data}` response envelope.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Status code used for every locally captured failure.
pub const FAILURE_CODE: u16 = 400;

/// Broad classification of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Rejected locally before any request was sent.
    Validation,
    /// The request never produced a usable response (network, decode).
    Transport,
    /// The service answered and refused the request.
    Remote,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Transport => "transport",
            FailureKind::Remote => "remote",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result returned by every envelope-level operation.
///
/// On success `code` carries the HTTP status and `data` the parsed body.
/// On failure `code` is [`FAILURE_CODE`] and `data` is
/// `{"error": ..., "kind": ..., "status": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub code: u16,
    pub data: Value,
}

impl OperationResult {
    /// Successful envelope.
    pub fn success(code: u16, data: Value) -> Self {
        Self { code, data }
    }

    /// Failure envelope. `status` is the remote status, when the service answered.
    pub fn failure(error: impl Into<String>, kind: FailureKind, status: Option<u16>) -> Self {
        let mut data = json!({
            "error": error.into(),
            "kind": kind.as_str(),
        });
        if let Some(status) = status {
            data["status"] = json!(status);
        }
        Self {
            code: FAILURE_CODE,
            data,
        }
    }

    /// True when the envelope carries a failure.
    pub fn is_failure(&self) -> bool {
        self.code == FAILURE_CODE && self.data.get("error").is_some()
    }

    /// Error message of a failure envelope.
    pub fn error(&self) -> Option<&str> {
        if !self.is_failure() {
            return None;
        }
        self.data.get("error").and_then(Value::as_str)
    }

    /// Failure kind of a failure envelope.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        if !self.is_failure() {
            return None;
        }
        self.data
            .get("kind")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
    }
}
