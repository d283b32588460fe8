//! Upload token issuing with policy caching.
//!
//! The issuer keeps one signed policy per bucket and reuses it until it is
//! close to its deadline:
//! - Fast path: read lock, return the cached token if still fresh
//! - Slow path: write lock, double-check, regenerate and sign
//!
//! Concurrent first use therefore produces exactly one policy.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::AuthResult;
use crate::mac::Mac;
use crate::policy::{PolicyTemplate, PutPolicy, DEFAULT_POLICY_TTL_SECS};

/// Regenerate the policy this long before its deadline.
pub const POLICY_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct CachedPolicy {
    policy: PutPolicy,
    token: String,
}

/// Issues upload tokens scoped to one bucket.
pub struct UploadTokenIssuer {
    mac: Arc<Mac>,
    bucket: String,
    ttl: Duration,
    template: PolicyTemplate,
    cache: RwLock<Option<CachedPolicy>>,
}

impl UploadTokenIssuer {
    /// Create an issuer with the default one hour policy lifetime.
    pub fn new(mac: Arc<Mac>, bucket: impl Into<String>) -> Self {
        Self {
            mac,
            bucket: bucket.into(),
            ttl: Duration::from_secs(DEFAULT_POLICY_TTL_SECS),
            template: PolicyTemplate::default(),
            cache: RwLock::new(None),
        }
    }

    /// Override the policy lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Constraints applied to every generated policy.
    pub fn with_policy_template(mut self, template: PolicyTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn refresh_margin(&self) -> i64 {
        POLICY_REFRESH_MARGIN.min(self.ttl / 2).as_secs() as i64
    }

    fn is_fresh(&self, policy: &PutPolicy, now: i64) -> bool {
        !policy.is_expired_at(now + self.refresh_margin())
    }

    /// Get an upload token for the bucket, regenerating the policy if needed.
    pub async fn upload_token(&self) -> AuthResult<String> {
        self.upload_token_at(Utc::now().timestamp()).await
    }

    /// Same as [`upload_token`](Self::upload_token) with an explicit clock (unix seconds).
    pub async fn upload_token_at(&self, now: i64) -> AuthResult<String> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if self.is_fresh(&cached.policy, now) {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;

        // Another task may have regenerated while we waited
        if let Some(cached) = cache.as_ref() {
            if self.is_fresh(&cached.policy, now) {
                return Ok(cached.token.clone());
            }
        }

        let deadline = now + self.ttl.as_secs() as i64;
        let policy = self.template.build(&self.bucket, deadline);
        let token = policy.upload_token(&self.mac)?;

        debug!(bucket = %self.bucket, deadline, "Generated upload policy");

        *cache = Some(CachedPolicy {
            policy,
            token: token.clone(),
        });
        Ok(token)
    }

    /// The cached policy, if one was generated.
    pub async fn current_policy(&self) -> Option<PutPolicy> {
        self.cache.read().await.as_ref().map(|c| c.policy.clone())
    }

    /// Drop the cached policy so the next call regenerates it.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::Credentials;

    fn issuer() -> UploadTokenIssuer {
        let mac = Arc::new(Mac::new(&Credentials::new("ak", "sk").unwrap()).unwrap());
        UploadTokenIssuer::new(mac, "media")
    }

    #[tokio::test]
    async fn test_tokens_within_ttl_reuse_policy() {
        let issuer = issuer();
        let first = issuer.upload_token_at(1_000).await.unwrap();
        let policy_a = issuer.current_policy().await.unwrap();

        let second = issuer.upload_token_at(1_500).await.unwrap();
        let policy_b = issuer.current_policy().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(policy_a, policy_b);
        assert_eq!(policy_a.scope, "media");
        assert_eq!(policy_a.deadline, 1_000 + 3600);
    }

    #[tokio::test]
    async fn test_expired_policy_is_regenerated_with_later_deadline() {
        let issuer = issuer();
        issuer.upload_token_at(1_000).await.unwrap();
        let old = issuer.current_policy().await.unwrap();

        let token = issuer.upload_token_at(old.deadline + 1).await.unwrap();
        let new = issuer.current_policy().await.unwrap();

        assert!(new.deadline > old.deadline);
        assert_eq!(token, new.upload_token(&issuer.mac).unwrap());
    }

    #[tokio::test]
    async fn test_policy_near_deadline_is_regenerated() {
        let issuer = issuer();
        issuer.upload_token_at(0).await.unwrap();

        // inside the refresh margin but not yet expired
        issuer.upload_token_at(3600 - 30).await.unwrap();
        let policy = issuer.current_policy().await.unwrap();
        assert_eq!(policy.deadline, 3600 - 30 + 3600);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_issues_one_policy() {
        let issuer = Arc::new(issuer());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let issuer = Arc::clone(&issuer);
            handles.push(tokio::spawn(async move { issuer.upload_token_at(5_000).await.unwrap() }));
        }

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap());
        }
        tokens.dedup();
        assert_eq!(tokens.len(), 1);
    }

    #[tokio::test]
    async fn test_template_applies_to_regenerated_policy() {
        let issuer = issuer().with_policy_template(PolicyTemplate {
            fsize_limit: Some(10),
            ..Default::default()
        });
        issuer.upload_token_at(0).await.unwrap();
        assert_eq!(issuer.current_policy().await.unwrap().fsize_limit, Some(10));

        issuer.invalidate().await;
        assert!(issuer.current_policy().await.is_none());
    }

    #[test]
    fn test_short_ttl_margin_is_bounded() {
        let issuer = issuer().with_ttl(Duration::from_secs(10));
        assert_eq!(issuer.refresh_margin(), 5);
    }
}
