//! The `Qiniu` client facade.

use std::path::PathBuf;
use std::sync::Arc;

use qiniu_auth::{Credentials, Mac, UploadTokenIssuer};
use qiniu_models::{
    BatchOperation, Granularity, ListOptions, MoveOptions, OperationResult, PfopOptions, PutExtra,
    StorageClass, Transfer,
};
use qiniu_storage::{
    CdnManager, ClientConfig, FormUploader, HttpClient, ProcessingManager, Reply, ResourceManager,
    ResumeUploader, StorageResult, UploadSource,
};
use serde_json::{json, Value};
use tokio::io::AsyncRead;
use tracing::debug;

use crate::normalize::{failure, normalize};

const FORM_UPLOADER: &str = "FormUploader";
const RESUME_UPLOADER: &str = "ResumeUploader";
const RESOURCE_MANAGER: &str = "ResourceManager";
const PROCESSING_MANAGER: &str = "ProcessingManager";
const CDN_MANAGER: &str = "CdnManager";

/// Storage client bound to one bucket.
///
/// Every manager is built in [`Qiniu::new`] and shared for the lifetime of
/// the client. Envelope operations never fail: errors come back as
/// `{code: 400, data: {error, kind, status?}}`.
pub struct Qiniu {
    config: ClientConfig,
    mac: Arc<Mac>,
    tokens: Arc<UploadTokenIssuer>,
    form_uploader: FormUploader,
    resume_uploader: ResumeUploader,
    resources: ResourceManager,
    processing: ProcessingManager,
    cdn: CdnManager,
}

impl std::fmt::Debug for Qiniu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Qiniu")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Qiniu {
    /// Build a client. Invalid configuration fails before any network use.
    pub fn new(config: ClientConfig) -> StorageResult<Self> {
        let endpoints = config.endpoints()?;
        let credentials = Credentials::new(&config.access_key, &config.secret_key)?;
        let mac = Arc::new(Mac::new(&credentials)?);
        let http = Arc::new(HttpClient::new(&config.http, mac.clone())?);

        let tokens = Arc::new(
            UploadTokenIssuer::new(mac.clone(), &config.bucket)
                .with_ttl(config.token_ttl)
                .with_policy_template(config.policy.clone()),
        );

        let form_uploader = FormUploader::new(http.clone(), tokens.clone(), endpoints.clone());
        let resume_uploader = ResumeUploader::new(
            http.clone(),
            tokens.clone(),
            endpoints.clone(),
            config.resume.clone(),
        );
        let resources = ResourceManager::new(http.clone(), endpoints.clone(), &config.bucket);
        let processing = ProcessingManager::new(http.clone(), endpoints.clone(), &config.bucket);
        let cdn = CdnManager::new(http, endpoints);

        debug!(bucket = %config.bucket, zone = %config.zone, "Created Qiniu client");

        Ok(Self {
            config,
            mac,
            tokens,
            form_uploader,
            resume_uploader,
            resources,
            processing,
            cdn,
        })
    }

    /// Build a client from `QINIU_*` environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    pub fn mac(&self) -> &Mac {
        &self.mac
    }

    pub fn token_issuer(&self) -> &UploadTokenIssuer {
        &self.tokens
    }

    pub fn form_uploader(&self) -> &FormUploader {
        &self.form_uploader
    }

    pub fn resume_uploader(&self) -> &ResumeUploader {
        &self.resume_uploader
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn processing(&self) -> &ProcessingManager {
        &self.processing
    }

    pub fn cdn(&self) -> &CdnManager {
        &self.cdn
    }

    fn log_bodies(&self) -> bool {
        self.config.enable_logging
    }

    fn envelope<T: serde::Serialize>(
        &self,
        component: &str,
        method: &str,
        result: StorageResult<Reply<T>>,
    ) -> OperationResult {
        normalize(component, method, result, self.log_bodies())
    }

    /// Current upload token for the bucket.
    pub async fn upload_token(&self) -> StorageResult<String> {
        Ok(self.tokens.upload_token().await?)
    }

    // =========================================================================
    // Uploads
    // =========================================================================

    /// Upload `source` under `key` with the chosen transfer mode.
    pub async fn upload(&self, key: &str, source: UploadSource, transfer: Transfer) -> OperationResult {
        self.upload_with(key, source, transfer, &PutExtra::default())
            .await
    }

    /// [`upload`](Self::upload) with per-upload parameters.
    pub async fn upload_with(
        &self,
        key: &str,
        source: UploadSource,
        transfer: Transfer,
        extra: &PutExtra,
    ) -> OperationResult {
        let method = upload_method(&source);
        match transfer {
            Transfer::Form => {
                let result = self.form_uploader.upload(key, source, extra).await;
                self.envelope(FORM_UPLOADER, method, result)
            }
            Transfer::Resumable => {
                let result = self.resume_uploader.upload(key, source, extra).await;
                self.envelope(RESUME_UPLOADER, method, result)
            }
        }
    }

    /// Upload a local file.
    pub async fn put_file(&self, key: &str, path: impl Into<PathBuf>, resumable: bool) -> OperationResult {
        self.upload(key, UploadSource::file(path), transfer_for(resumable))
            .await
    }

    /// Upload everything readable from `reader`.
    pub async fn put_stream(
        &self,
        key: &str,
        reader: impl AsyncRead + Send + Unpin + 'static,
        resumable: bool,
    ) -> OperationResult {
        self.upload(key, UploadSource::stream(reader), transfer_for(resumable))
            .await
    }

    /// Upload an in-memory payload with a form upload.
    pub async fn put(&self, key: &str, data: impl Into<Vec<u8>>) -> OperationResult {
        self.upload(key, UploadSource::bytes(data), Transfer::Form)
            .await
    }

    // =========================================================================
    // Resource management
    // =========================================================================

    pub async fn stat(&self, key: &str) -> OperationResult {
        let result = self.resources.stat_as::<Value>(key).await;
        self.envelope(RESOURCE_MANAGER, "stat", result)
    }

    pub async fn change_mime(&self, key: &str, mime: &str) -> OperationResult {
        let result = self.resources.change_mime(key, mime).await;
        self.envelope(RESOURCE_MANAGER, "changeMime", result)
    }

    pub async fn change_type(&self, key: &str, storage_class: StorageClass) -> OperationResult {
        let result = self.resources.change_type(key, storage_class).await;
        self.envelope(RESOURCE_MANAGER, "changeType", result)
    }

    pub async fn delete(&self, key: &str) -> OperationResult {
        let result = self.resources.delete(key).await;
        self.envelope(RESOURCE_MANAGER, "delete", result)
    }

    /// `days = 0` cancels a previously set lifecycle rule.
    pub async fn delete_after_days(&self, key: &str, days: u32) -> OperationResult {
        let result = self.resources.delete_after_days(key, days).await;
        self.envelope(RESOURCE_MANAGER, "deleteAfterDays", result)
    }

    pub async fn list_prefix(&self, options: &ListOptions) -> OperationResult {
        let result = self.resources.list_prefix_as::<Value>(options).await;
        self.envelope(RESOURCE_MANAGER, "listPrefix", result)
    }

    /// Every object under `prefix`; `data` is `{items: [...]}`.
    pub async fn list_all(&self, prefix: &str) -> OperationResult {
        match self.resources.list_all_as::<Value>(prefix).await {
            Ok(items) => {
                let result = Ok(Reply {
                    status: 200,
                    req_id: None,
                    body: json!({ "items": items }),
                });
                self.envelope(RESOURCE_MANAGER, "listAll", result)
            }
            Err(e) => failure(RESOURCE_MANAGER, "listAll", e),
        }
    }

    pub async fn fetch(&self, url: &str, key: &str) -> OperationResult {
        let result = self.resources.fetch(url, key).await;
        self.envelope(RESOURCE_MANAGER, "fetch", result)
    }

    pub async fn prefetch(&self, key: &str) -> OperationResult {
        let result = self.resources.prefetch(key).await;
        self.envelope(RESOURCE_MANAGER, "prefetch", result)
    }

    pub async fn move_object(
        &self,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
        options: MoveOptions,
    ) -> OperationResult {
        let result = self
            .resources
            .move_object(src_key, dest_bucket, dest_key, options)
            .await;
        self.envelope(RESOURCE_MANAGER, "move", result)
    }

    pub async fn copy_object(
        &self,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
        options: MoveOptions,
    ) -> OperationResult {
        let result = self
            .resources
            .copy_object(src_key, dest_bucket, dest_key, options)
            .await;
        self.envelope(RESOURCE_MANAGER, "copy", result)
    }

    /// Batch of operations; `code` is 200 or 298 and `data` the ordered item results.
    pub async fn batch(&self, ops: &[BatchOperation]) -> OperationResult {
        let result = self.resources.batch_as::<Value>(ops).await;
        self.envelope(RESOURCE_MANAGER, "batch", result)
    }

    // =========================================================================
    // Persistent processing
    // =========================================================================

    pub async fn submit_pipeline<S: AsRef<str>>(
        &self,
        key: &str,
        fops: &[S],
        pipeline: Option<&str>,
        options: &PfopOptions,
    ) -> OperationResult {
        let result = self
            .processing
            .submit_pipeline_as::<Value, S>(key, fops, pipeline, options)
            .await;
        self.envelope(PROCESSING_MANAGER, "pfop", result)
    }

    pub async fn poll_job(&self, persistent_id: &str) -> OperationResult {
        let result = self.processing.poll_job_as::<Value>(persistent_id).await;
        self.envelope(PROCESSING_MANAGER, "prefop", result)
    }

    // =========================================================================
    // CDN
    // =========================================================================

    pub async fn refresh_urls(&self, urls: &[String]) -> OperationResult {
        let result = self.cdn.refresh_urls_as::<Value>(urls).await;
        self.envelope(CDN_MANAGER, "refreshUrls", result)
    }

    pub async fn refresh_dirs(&self, dirs: &[String]) -> OperationResult {
        let result = self.cdn.refresh_dirs_as::<Value>(dirs).await;
        self.envelope(CDN_MANAGER, "refreshDirs", result)
    }

    pub async fn prefetch_urls(&self, urls: &[String]) -> OperationResult {
        let result = self.cdn.prefetch_urls_as::<Value>(urls).await;
        self.envelope(CDN_MANAGER, "prefetchUrls", result)
    }

    pub async fn get_flux_data(
        &self,
        start_date: &str,
        end_date: &str,
        granularity: Granularity,
        domains: &[String],
    ) -> OperationResult {
        let result = self
            .cdn
            .get_flux_data_as::<Value>(start_date, end_date, granularity, domains)
            .await;
        self.envelope(CDN_MANAGER, "getFluxData", result)
    }

    pub async fn get_bandwidth_data(
        &self,
        start_date: &str,
        end_date: &str,
        granularity: Granularity,
        domains: &[String],
    ) -> OperationResult {
        let result = self
            .cdn
            .get_bandwidth_data_as::<Value>(start_date, end_date, granularity, domains)
            .await;
        self.envelope(CDN_MANAGER, "getBandwidthData", result)
    }

    pub async fn get_log_list(&self, domains: &[String], day: &str) -> OperationResult {
        let result = self.cdn.get_log_list_as::<Value>(domains, day).await;
        self.envelope(CDN_MANAGER, "getCdnLogList", result)
    }
}

/// Method name used in log lines for an upload of `source`.
fn upload_method(source: &UploadSource) -> &'static str {
    match source {
        UploadSource::File(_) => "putFile",
        UploadSource::Stream(_) => "putStream",
        UploadSource::Bytes(_) => "put",
    }
}

fn transfer_for(resumable: bool) -> Transfer {
    if resumable {
        Transfer::Resumable
    } else {
        Transfer::Form
    }
}
