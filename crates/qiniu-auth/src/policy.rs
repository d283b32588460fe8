//! Upload policy (`PutPolicy`).

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};
use crate::mac::Mac;

/// Default policy lifetime (1 hour).
pub const DEFAULT_POLICY_TTL_SECS: u64 = 3600;

/// Scoped, expiring upload authorization. Field names follow the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutPolicy {
    /// `bucket` or `bucket:key`
    pub scope: String,
    /// Unix seconds after which the token is refused
    pub deadline: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_only: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fsize_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_body_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_ops: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_pipeline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistent_notify_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_after_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<u8>,
}

impl PutPolicy {
    /// Policy for `scope` expiring at `deadline`.
    pub fn new(scope: impl Into<String>, deadline: i64) -> Self {
        Self {
            scope: scope.into(),
            deadline,
            insert_only: None,
            fsize_limit: None,
            mime_limit: None,
            return_body: None,
            callback_url: None,
            callback_body: None,
            callback_body_type: None,
            persistent_ops: None,
            persistent_pipeline: None,
            persistent_notify_url: None,
            delete_after_days: None,
            file_type: None,
        }
    }

    /// True once `now` has reached the deadline.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.deadline
    }

    /// Bucket part of the scope.
    pub fn bucket(&self) -> &str {
        self.scope.split(':').next().unwrap_or(&self.scope)
    }

    /// Sign the policy into an upload token.
    pub fn upload_token(&self, mac: &Mac) -> AuthResult<String> {
        if self.scope.is_empty() {
            return Err(AuthError::invalid_policy("scope is empty"));
        }
        let json = serde_json::to_vec(self)?;
        Ok(mac.sign_with_data(&json))
    }
}

/// Optional constraints copied onto every regenerated policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyTemplate {
    pub insert_only: bool,
    pub fsize_limit: Option<u64>,
    pub mime_limit: Option<String>,
    pub return_body: Option<String>,
    pub callback_url: Option<String>,
    pub callback_body: Option<String>,
    pub callback_body_type: Option<String>,
    pub persistent_ops: Option<String>,
    pub persistent_pipeline: Option<String>,
    pub persistent_notify_url: Option<String>,
    pub delete_after_days: Option<u32>,
    pub file_type: Option<u8>,
}

impl PolicyTemplate {
    /// Build a policy for `scope` with these constraints.
    pub fn build(&self, scope: &str, deadline: i64) -> PutPolicy {
        PutPolicy {
            insert_only: self.insert_only.then_some(1),
            fsize_limit: self.fsize_limit,
            mime_limit: self.mime_limit.clone(),
            return_body: self.return_body.clone(),
            callback_url: self.callback_url.clone(),
            callback_body: self.callback_body.clone(),
            callback_body_type: self.callback_body_type.clone(),
            persistent_ops: self.persistent_ops.clone(),
            persistent_pipeline: self.persistent_pipeline.clone(),
            persistent_notify_url: self.persistent_notify_url.clone(),
            delete_after_days: self.delete_after_days,
            file_type: self.file_type,
            ..PutPolicy::new(scope, deadline)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::{urlsafe_base64, Credentials};
    use base64::{engine::general_purpose::URL_SAFE, Engine};

    #[test]
    fn test_policy_serializes_only_set_fields() {
        let policy = PutPolicy::new("media", 1_700_000_000);
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"scope":"media","deadline":1700000000}"#);
    }

    #[test]
    fn test_template_fields_use_wire_names() {
        let template = PolicyTemplate {
            insert_only: true,
            fsize_limit: Some(1024),
            mime_limit: Some("image/*".to_string()),
            callback_url: Some("https://example.com/cb".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(template.build("media", 10)).unwrap();
        assert_eq!(value["insertOnly"], 1);
        assert_eq!(value["fsizeLimit"], 1024);
        assert_eq!(value["mimeLimit"], "image/*");
        assert_eq!(value["callbackUrl"], "https://example.com/cb");
    }

    #[test]
    fn test_expiry_boundary() {
        let policy = PutPolicy::new("media", 100);
        assert!(!policy.is_expired_at(99));
        assert!(policy.is_expired_at(100));
    }

    #[test]
    fn test_upload_token_embeds_policy() {
        let mac = Mac::new(&Credentials::new("ak", "sk").unwrap()).unwrap();
        let policy = PutPolicy::new("media:a.txt", 42);
        assert_eq!(policy.bucket(), "media");

        let token = policy.upload_token(&mac).unwrap();
        let encoded = token.rsplit(':').next().unwrap();
        assert_eq!(encoded, urlsafe_base64(serde_json::to_vec(&policy).unwrap()));

        let decoded: PutPolicy = serde_json::from_slice(&URL_SAFE.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, policy);
    }
}
