//! Client configuration.

use std::path::PathBuf;
use std::time::Duration;

use qiniu_auth::{PolicyTemplate, DEFAULT_POLICY_TTL_SECS};
use validator::Validate;

use crate::error::{StorageError, StorageResult};
use crate::region::{Endpoints, Region, Zone, DEFAULT_FUSION_HOST};
use crate::retry::RetryConfig;

/// Default resumable block size (4 MiB, fixed by the service).
pub const DEFAULT_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// HTTP transport settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Max idle connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
            pool_max_idle_per_host: 10,
        }
    }
}

impl HttpConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: std::env::var("QINIU_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            connect_timeout: std::env::var("QINIU_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            pool_max_idle_per_host: defaults.pool_max_idle_per_host,
        }
    }
}

/// Resumable upload settings.
#[derive(Debug, Clone)]
pub struct ResumeConfig {
    /// Block size; the public service only accepts 4 MiB blocks
    pub block_size: u64,
    /// Directory for resume records of file uploads; no persistence when unset
    pub record_dir: Option<PathBuf>,
    /// Per-block retry policy
    pub retry: RetryConfig,
}

impl Default for ResumeConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            record_dir: None,
            retry: RetryConfig::default(),
        }
    }
}

/// Client configuration. Immutable once a client is built from it.
#[derive(Clone, Validate)]
pub struct ClientConfig {
    #[validate(length(min = 1, message = "access key is required"))]
    pub access_key: String,
    #[validate(length(min = 1, message = "secret key is required"))]
    pub secret_key: String,
    /// Zone identifier (`z0`, `Zone_z0`, ...)
    #[validate(length(min = 1, message = "zone is required"))]
    pub zone: String,
    #[validate(length(min = 1, message = "bucket is required"))]
    pub bucket: String,
    pub use_https_domain: bool,
    pub use_cdn_domain: bool,
    /// Log the raw body of every completed operation
    pub enable_logging: bool,
    /// Host table overriding the zone's (private deployments, tests)
    pub region: Option<Region>,
    pub fusion_host: String,
    /// Constraints applied to every upload policy
    pub policy: PolicyTemplate,
    /// Lifetime of generated upload policies
    pub token_ttl: Duration,
    pub http: HttpConfig,
    pub resume: ResumeConfig,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("zone", &self.zone)
            .field("bucket", &self.bucket)
            .field("use_https_domain", &self.use_https_domain)
            .field("use_cdn_domain", &self.use_cdn_domain)
            .field("enable_logging", &self.enable_logging)
            .field("region", &self.region)
            .field("fusion_host", &self.fusion_host)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl ClientConfig {
    /// Config with the four mandatory fields and defaults elsewhere.
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        zone: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            zone: zone.into(),
            bucket: bucket.into(),
            use_https_domain: false,
            use_cdn_domain: false,
            enable_logging: false,
            region: None,
            fusion_host: DEFAULT_FUSION_HOST.to_string(),
            policy: PolicyTemplate::default(),
            token_ttl: Duration::from_secs(DEFAULT_POLICY_TTL_SECS),
            http: HttpConfig::default(),
            resume: ResumeConfig::default(),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let required = |name: &str| {
            std::env::var(name).map_err(|_| StorageError::validation(format!("{} not set", name)))
        };
        let flag = |name: &str| {
            std::env::var(name)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false)
        };

        let mut config = Self::new(
            required("QINIU_ACCESS_KEY")?,
            required("QINIU_SECRET_KEY")?,
            required("QINIU_ZONE")?,
            required("QINIU_BUCKET")?,
        );
        config.use_https_domain = flag("QINIU_USE_HTTPS");
        config.use_cdn_domain = flag("QINIU_USE_CDN_DOMAIN");
        config.enable_logging = flag("QINIU_ENABLE_LOGGING");
        config.http = HttpConfig::from_env();
        config.resume.retry = RetryConfig::from_env();
        Ok(config)
    }

    pub fn use_https_domain(mut self, enabled: bool) -> Self {
        self.use_https_domain = enabled;
        self
    }

    pub fn use_cdn_domain(mut self, enabled: bool) -> Self {
        self.use_cdn_domain = enabled;
        self
    }

    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.enable_logging = enabled;
        self
    }

    /// Serve every role (including CDN calls) from one host.
    pub fn with_single_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        self.fusion_host = host.clone();
        self.region = Some(Region::single_host(host));
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_policy_template(mut self, policy: PolicyTemplate) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.resume.block_size = block_size;
        self
    }

    pub fn with_record_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resume.record_dir = Some(dir.into());
        self
    }

    pub fn with_upload_retry(mut self, retry: RetryConfig) -> Self {
        self.resume.retry = retry;
        self
    }

    /// Validate mandatory fields and resolve the zone into endpoints.
    pub fn endpoints(&self) -> StorageResult<Endpoints> {
        self.validate()
            .map_err(|e| StorageError::validation(e.to_string()))?;

        if self.resume.block_size == 0 {
            return Err(StorageError::validation("block size must be positive"));
        }
        if self.token_ttl.as_secs() == 0 {
            return Err(StorageError::validation("token ttl must be at least one second"));
        }

        // The zone must be known even when a region override is present
        let zone: Zone = self.zone.parse()?;
        let region = self.region.clone().unwrap_or_else(|| zone.region());

        Ok(Endpoints::new(
            region,
            self.use_https_domain,
            self.use_cdn_domain,
            self.fusion_host.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_missing_fields_fail_validation() {
        let err = ClientConfig::new("ak", "sk", "z0", "").endpoints().unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
        assert!(err.to_string().contains("bucket is required"));

        let err = ClientConfig::new("", "sk", "z0", "media").endpoints().unwrap_err();
        assert!(err.to_string().contains("access key is required"));
    }

    #[test]
    fn test_unknown_zone_fails() {
        let err = ClientConfig::new("ak", "sk", "moon", "media").endpoints().unwrap_err();
        assert!(err.to_string().contains("unknown zone"));
    }

    #[test]
    fn test_zero_block_size_fails() {
        let config = ClientConfig::new("ak", "sk", "z0", "media").with_block_size(0);
        assert!(config.endpoints().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ClientConfig::new("ak", "very-secret", "z0", "media");
        assert!(!format!("{:?}", config).contains("very-secret"));
    }

    #[test]
    #[serial]
    fn test_from_env_requires_credentials() {
        std::env::remove_var("QINIU_ACCESS_KEY");
        let err = ClientConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("QINIU_ACCESS_KEY"));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_flags() {
        std::env::set_var("QINIU_ACCESS_KEY", "ak");
        std::env::set_var("QINIU_SECRET_KEY", "sk");
        std::env::set_var("QINIU_ZONE", "Zone_z1");
        std::env::set_var("QINIU_BUCKET", "media");
        std::env::set_var("QINIU_USE_HTTPS", "true");
        std::env::remove_var("QINIU_USE_CDN_DOMAIN");
        std::env::remove_var("QINIU_CONNECT_TIMEOUT_SECS");

        let config = ClientConfig::from_env().unwrap();
        assert!(config.use_https_domain);
        assert!(!config.use_cdn_domain);
        assert_eq!(config.http.connect_timeout, Duration::from_secs(5));
        assert_eq!(
            config.endpoints().unwrap().rs_url("/x"),
            "https://rs-z1.qbox.me/x"
        );

        for name in ["QINIU_ACCESS_KEY", "QINIU_SECRET_KEY", "QINIU_ZONE", "QINIU_BUCKET", "QINIU_USE_HTTPS"] {
            std::env::remove_var(name);
        }
    }
}
