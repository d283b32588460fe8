//! Bucket and object management (RS, RSF and IO hosts).

use std::sync::Arc;

use qiniu_auth::{encoded_entry, urlsafe_base64};
use qiniu_models::{
    BatchItemResult, BatchOperation, FileInfo, ListItem, ListOptions, ListPage, MoveOptions,
    StorageClass,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::http::{form_body, HttpClient, Reply};
use crate::region::Endpoints;

/// Maximum number of operations in one batch request.
pub const MAX_BATCH_OPS: usize = 1000;

/// Maximum page size of a listing.
pub const MAX_LIST_LIMIT: u32 = 1000;

/// Batch responses use 298 when some items failed.
pub const PARTIAL_SUCCESS_STATUS: u16 = 298;

/// Control-plane operations against one bucket.
pub struct ResourceManager {
    http: Arc<HttpClient>,
    endpoints: Endpoints,
    bucket: String,
}

impl ResourceManager {
    pub fn new(http: Arc<HttpClient>, endpoints: Endpoints, bucket: impl Into<String>) -> Self {
        Self {
            http,
            endpoints,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn entry(&self, key: &str) -> String {
        encoded_entry(&self.bucket, key)
    }

    /// RS path of a batchable operation.
    pub fn operation_path(&self, op: &BatchOperation) -> String {
        match op {
            BatchOperation::Stat { key } => format!("/stat/{}", self.entry(key)),
            BatchOperation::ChangeMime { key, mime } => {
                format!("/chgm/{}/mime/{}", self.entry(key), urlsafe_base64(mime))
            }
            BatchOperation::ChangeType { key, storage_class } => {
                format!("/chtype/{}/type/{}", self.entry(key), storage_class.code())
            }
            BatchOperation::Delete { key } => format!("/delete/{}", self.entry(key)),
            BatchOperation::DeleteAfterDays { key, days } => {
                format!("/deleteAfterDays/{}/{}", self.entry(key), days)
            }
            BatchOperation::Move {
                src_key,
                dest_bucket,
                dest_key,
                force,
            } => format!(
                "/move/{}/{}/force/{}",
                self.entry(src_key),
                encoded_entry(dest_bucket, dest_key),
                force
            ),
            BatchOperation::Copy {
                src_key,
                dest_bucket,
                dest_key,
                force,
            } => format!(
                "/copy/{}/{}/force/{}",
                self.entry(src_key),
                encoded_entry(dest_bucket, dest_key),
                force
            ),
        }
    }

    async fn rs_call(&self, op: &BatchOperation) -> StorageResult<Reply<Value>> {
        let url = self.endpoints.rs_url(&self.operation_path(op));
        self.http.post_form_signed(op.name(), &url, None).await
    }

    /// Object metadata. A missing key is a remote rejection with status 612.
    pub async fn stat(&self, key: &str) -> StorageResult<Reply<FileInfo>> {
        self.stat_as(key).await
    }

    /// [`stat`](Self::stat) decoded into any body type. `Value` keeps every field.
    pub async fn stat_as<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Reply<T>> {
        self.rs_call(&BatchOperation::stat(key)).await?.decode()
    }

    pub async fn change_mime(&self, key: &str, mime: &str) -> StorageResult<Reply<Value>> {
        self.rs_call(&BatchOperation::change_mime(key, mime)).await
    }

    pub async fn change_type(
        &self,
        key: &str,
        storage_class: StorageClass,
    ) -> StorageResult<Reply<Value>> {
        self.rs_call(&BatchOperation::change_type(key, storage_class))
            .await
    }

    pub async fn delete(&self, key: &str) -> StorageResult<Reply<Value>> {
        self.rs_call(&BatchOperation::delete(key)).await
    }

    /// Schedule deletion `days` after upload. `0` cancels the lifecycle rule.
    pub async fn delete_after_days(&self, key: &str, days: u32) -> StorageResult<Reply<Value>> {
        self.rs_call(&BatchOperation::delete_after_days(key, days))
            .await
    }

    pub async fn move_object(
        &self,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
        options: MoveOptions,
    ) -> StorageResult<Reply<Value>> {
        self.rs_call(&BatchOperation::move_to(
            src_key,
            dest_bucket,
            dest_key,
            options,
        ))
        .await
    }

    pub async fn copy_object(
        &self,
        src_key: &str,
        dest_bucket: &str,
        dest_key: &str,
        options: MoveOptions,
    ) -> StorageResult<Reply<Value>> {
        self.rs_call(&BatchOperation::copy_to(
            src_key,
            dest_bucket,
            dest_key,
            options,
        ))
        .await
    }

    /// One page of the listing described by `options`.
    pub async fn list_prefix(&self, options: &ListOptions) -> StorageResult<Reply<ListPage>> {
        self.list_prefix_as(options).await
    }

    pub async fn list_prefix_as<T: DeserializeOwned>(
        &self,
        options: &ListOptions,
    ) -> StorageResult<Reply<T>> {
        if let Some(limit) = options.limit {
            if limit == 0 || limit > MAX_LIST_LIMIT {
                return Err(StorageError::validation(format!(
                    "limit must be between 1 and {}",
                    MAX_LIST_LIMIT
                )));
            }
        }

        let limit = options.limit.map(|l| l.to_string()).unwrap_or_default();
        let query = form_body([
            ("bucket", self.bucket.as_str()),
            ("prefix", options.prefix.as_deref().unwrap_or_default()),
            ("delimiter", options.delimiter.as_deref().unwrap_or_default()),
            ("limit", limit.as_str()),
            ("marker", options.marker.as_deref().unwrap_or_default()),
        ]);
        let url = self.endpoints.rsf_url(&format!("/list?{}", query));

        self.http.post_form_signed("list", &url, None).await?.decode()
    }

    /// Every object under `prefix`, following markers until the listing ends.
    pub async fn list_all(&self, prefix: &str) -> StorageResult<Vec<ListItem>> {
        self.list_all_as(prefix).await
    }

    /// [`list_all`](Self::list_all) with items decoded into any type.
    pub async fn list_all_as<T: DeserializeOwned>(&self, prefix: &str) -> StorageResult<Vec<T>> {
        let mut options = ListOptions::with_prefix(prefix);
        let mut items = Vec::new();
        let mut pages = 0u32;

        loop {
            let mut page = self.list_prefix_as::<Value>(&options).await?.body;
            pages += 1;

            if let Some(Value::Array(page_items)) = page.get_mut("items").map(Value::take) {
                items.extend(page_items);
            }
            match page
                .get("marker")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
            {
                Some(marker) => options.marker = Some(marker.to_string()),
                None => break,
            }
        }

        debug!("Listed {} objects under '{}' in {} pages", items.len(), prefix, pages);
        serde_json::from_value(Value::Array(items))
            .map_err(|e| StorageError::invalid_response(format!("unexpected list item: {}", e)))
    }

    /// Fetch `url` into the bucket under `key`. Completes synchronously.
    pub async fn fetch(&self, url: &str, key: &str) -> StorageResult<Reply<Value>> {
        if url.is_empty() {
            return Err(StorageError::validation("fetch url is required"));
        }
        let path = format!("/fetch/{}/to/{}", urlsafe_base64(url), self.entry(key));
        let reply = self
            .http
            .post_form_signed("fetch", &self.endpoints.io_url(&path), None)
            .await?;
        info!("Fetched {} into {}", url, key);
        Ok(reply)
    }

    /// Refresh the mirrored copy of `key` from the bucket's origin.
    pub async fn prefetch(&self, key: &str) -> StorageResult<Reply<Value>> {
        let path = format!("/prefetch/{}", self.entry(key));
        self.http
            .post_form_signed("prefetch", &self.endpoints.io_url(&path), None)
            .await
    }

    /// Run up to [`MAX_BATCH_OPS`] operations in one request.
    ///
    /// Items succeed or fail independently; the reply status is 200 when all
    /// succeeded and 298 otherwise.
    pub async fn batch(&self, ops: &[BatchOperation]) -> StorageResult<Reply<Vec<BatchItemResult>>> {
        self.batch_as(ops).await
    }

    /// [`batch`](Self::batch) with items decoded into any type.
    pub async fn batch_as<T: DeserializeOwned>(
        &self,
        ops: &[BatchOperation],
    ) -> StorageResult<Reply<Vec<T>>> {
        if ops.is_empty() {
            return Err(StorageError::validation("batch requires at least one operation"));
        }
        if ops.len() > MAX_BATCH_OPS {
            return Err(StorageError::validation(format!(
                "batch accepts at most {} operations, got {}",
                MAX_BATCH_OPS,
                ops.len()
            )));
        }

        let paths: Vec<String> = ops.iter().map(|op| self.operation_path(op)).collect();
        let body = form_body(paths.iter().map(|p| ("op", p.as_str())));

        let reply = self
            .http
            .post_form_signed("batch", &self.endpoints.rs_url("/batch"), Some(body))
            .await?;

        if reply.status != 200 && reply.status != PARTIAL_SUCCESS_STATUS {
            return Err(StorageError::Remote {
                status: reply.status,
                message: format!("unexpected batch status {}", reply.status),
                req_id: reply.req_id,
            });
        }

        let reply: Reply<Vec<T>> = reply.decode()?;
        if reply.body.len() != ops.len() {
            return Err(StorageError::invalid_response(format!(
                "batch returned {} results for {} operations",
                reply.body.len(),
                ops.len()
            )));
        }

        Ok(reply)
    }
}
