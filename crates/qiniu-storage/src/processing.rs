//! Persistent data processing (pfop) on the API host.

use std::sync::Arc;

use qiniu_auth::urlsafe_base64;
use qiniu_models::{PfopOptions, PfopResult, PrefopStatus};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::http::{form_body, HttpClient, Reply};
use crate::region::Endpoints;

/// Encode one fop: the segment after the last `/` is URL-safe base64
/// encoded, the rest is kept verbatim.
pub fn encode_fop(fop: &str) -> String {
    match fop.rfind('/') {
        Some(idx) => format!("{}{}", &fop[..=idx], urlsafe_base64(&fop[idx + 1..])),
        None => urlsafe_base64(fop),
    }
}

/// Encode every fop and join them into the `fops` form field.
pub fn encode_fops<S: AsRef<str>>(fops: &[S]) -> String {
    fops.iter()
        .map(|f| encode_fop(f.as_ref()))
        .collect::<Vec<_>>()
        .join(";")
}

/// Submits and polls persistent processing jobs for one bucket.
pub struct ProcessingManager {
    http: Arc<HttpClient>,
    endpoints: Endpoints,
    bucket: String,
}

impl ProcessingManager {
    pub fn new(http: Arc<HttpClient>, endpoints: Endpoints, bucket: impl Into<String>) -> Self {
        Self {
            http,
            endpoints,
            bucket: bucket.into(),
        }
    }

    /// Submit `fops` against `key`, optionally on a named pipeline.
    pub async fn submit_pipeline<S: AsRef<str>>(
        &self,
        key: &str,
        fops: &[S],
        pipeline: Option<&str>,
        options: &PfopOptions,
    ) -> StorageResult<Reply<PfopResult>> {
        self.submit_pipeline_as(key, fops, pipeline, options).await
    }

    /// [`submit_pipeline`](Self::submit_pipeline) decoded into any body type.
    pub async fn submit_pipeline_as<T: DeserializeOwned, S: AsRef<str>>(
        &self,
        key: &str,
        fops: &[S],
        pipeline: Option<&str>,
        options: &PfopOptions,
    ) -> StorageResult<Reply<T>> {
        if fops.is_empty() {
            return Err(StorageError::validation("at least one fop is required"));
        }
        if key.is_empty() {
            return Err(StorageError::validation("key is required"));
        }

        let encoded = encode_fops(fops);
        let mut fields = vec![
            ("bucket", self.bucket.as_str()),
            ("key", key),
            ("fops", encoded.as_str()),
        ];
        if let Some(pipeline) = pipeline.filter(|p| !p.is_empty()) {
            fields.push(("pipeline", pipeline));
        }
        if let Some(notify_url) = options.notify_url.as_deref() {
            fields.push(("notifyURL", notify_url));
        }
        if options.force {
            fields.push(("force", "1"));
        }

        let reply = self
            .http
            .post_form_signed("pfop", &self.endpoints.api_url("/pfop/"), Some(form_body(fields)))
            .await?;

        info!(
            "Submitted pfop for {}: {}",
            key,
            reply.body.get("persistentId").and_then(serde_json::Value::as_str).unwrap_or("-")
        );
        reply.decode()
    }

    /// Status of a submitted job. The status endpoint needs no signature.
    pub async fn poll_job(&self, persistent_id: &str) -> StorageResult<Reply<PrefopStatus>> {
        self.poll_job_as(persistent_id).await
    }

    pub async fn poll_job_as<T: DeserializeOwned>(
        &self,
        persistent_id: &str,
    ) -> StorageResult<Reply<T>> {
        if persistent_id.is_empty() {
            return Err(StorageError::validation("persistent id is required"));
        }
        let url = self.endpoints.api_url(&format!(
            "/status/get/prefop?id={}",
            urlencoding::encode(persistent_id)
        ));
        self.http.get("prefop", &url).await?.decode()
    }
}
