//! Resumable (block) upload.
//!
//! The payload is cut into fixed-size blocks. Each block is sent with
//! `mkblk` and yields a context; `mkfile` then assembles the object from the
//! ordered contexts. Blocks are retried on transient failures, and file
//! uploads can persist their progress in a [`ResumeRecord`].

use std::io::SeekFrom;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use qiniu_auth::{urlsafe_base64, UploadTokenIssuer};
use qiniu_models::{PutExtra, PutRet};
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use super::record::{block_digest, BlockContext, ResumeRecord};
use super::UploadSource;
use crate::config::ResumeConfig;
use crate::error::{StorageError, StorageResult};
use crate::http::{HttpClient, Reply};
use crate::region::Endpoints;
use crate::retry::with_retry;

const OCTET_STREAM: &str = "application/octet-stream";
const TEXT_PLAIN: &str = "text/plain";

/// Progress of a resumable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeState {
    Idle,
    ScanningLocalFile,
    /// `total` is unknown for streams
    UploadingBlocks { done: u64, total: Option<u64> },
    MakingFile,
    Done,
}

#[derive(Debug, Deserialize)]
struct BlockReply {
    ctx: String,
    #[serde(default)]
    expired_at: i64,
}

/// Uploads payloads block by block.
pub struct ResumeUploader {
    http: Arc<HttpClient>,
    tokens: Arc<UploadTokenIssuer>,
    endpoints: Endpoints,
    config: ResumeConfig,
}

impl ResumeUploader {
    pub fn new(
        http: Arc<HttpClient>,
        tokens: Arc<UploadTokenIssuer>,
        endpoints: Endpoints,
        config: ResumeConfig,
    ) -> Self {
        Self {
            http,
            tokens,
            endpoints,
            config,
        }
    }

    pub fn block_size(&self) -> u64 {
        self.config.block_size
    }

    /// Start a session whose progress can be observed while it runs.
    pub fn session(&self, key: impl Into<String>, extra: PutExtra) -> ResumableSession<'_> {
        let (state, _) = watch::channel(ResumeState::Idle);
        ResumableSession {
            uploader: self,
            key: key.into(),
            extra,
            state,
        }
    }

    /// Upload `source` under `key`.
    pub async fn upload(
        &self,
        key: &str,
        source: UploadSource,
        extra: &PutExtra,
    ) -> StorageResult<Reply<PutRet>> {
        self.session(key, extra.clone()).run(source).await
    }

    async fn make_block(&self, data: &[u8]) -> StorageResult<BlockReply> {
        let token = self.tokens.upload_token().await?;
        let url = self.endpoints.up_url(&format!("/mkblk/{}", data.len()))?;
        let reply = self
            .http
            .post_with_upload_token("mkblk", &url, &token, OCTET_STREAM, data.to_vec())
            .await?
            .decode::<BlockReply>()?;
        Ok(reply.body)
    }

    fn mkfile_path(&self, key: &str, size: u64, extra: &PutExtra) -> String {
        let mut path = format!("/mkfile/{}/key/{}", size, urlsafe_base64(key));
        if let Some(mime) = &extra.mime_type {
            path.push_str(&format!("/mimeType/{}", urlsafe_base64(mime)));
        }
        if let Some(fname) = &extra.fname {
            path.push_str(&format!("/fname/{}", urlsafe_base64(fname)));
        }
        for (name, value) in &extra.params {
            path.push_str(&format!("/{}/{}", name, urlsafe_base64(value)));
        }
        path
    }

    async fn make_file(
        &self,
        key: &str,
        size: u64,
        extra: &PutExtra,
        contexts: &[BlockContext],
    ) -> StorageResult<Reply<PutRet>> {
        let token = self.tokens.upload_token().await?;
        let url = self.endpoints.up_url(&self.mkfile_path(key, size, extra))?;
        let body = contexts
            .iter()
            .map(|c| c.ctx.as_str())
            .collect::<Vec<_>>()
            .join(",");

        self.http
            .post_with_upload_token("mkfile", &url, &token, TEXT_PLAIN, body.into_bytes())
            .await?
            .decode::<PutRet>()
    }
}

/// One resumable upload.
pub struct ResumableSession<'a> {
    uploader: &'a ResumeUploader,
    key: String,
    extra: PutExtra,
    state: watch::Sender<ResumeState>,
}

impl ResumableSession<'_> {
    pub fn state(&self) -> ResumeState {
        *self.state.borrow()
    }

    /// Receive state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ResumeState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ResumeState) {
        self.state.send_replace(state);
    }

    /// Run the session to completion.
    pub async fn run(&self, source: UploadSource) -> StorageResult<Reply<PutRet>> {
        let span = info_span!("resumable_upload", key = %self.key, source = source.kind());
        self.run_inner(source).instrument(span).await
    }

    async fn run_inner(&self, source: UploadSource) -> StorageResult<Reply<PutRet>> {
        let uploader = self.uploader;
        let block_size = uploader.config.block_size;
        if block_size == 0 {
            return Err(StorageError::validation("block size must be positive"));
        }

        self.set_state(ResumeState::ScanningLocalFile);

        let mut record_path: Option<PathBuf> = None;
        let mut record = ResumeRecord::new(self.key.clone(), 0, block_size);
        let mut known_size = None;

        let mut reader: Box<dyn AsyncRead + Send + Unpin> = match source {
            UploadSource::File(path) => {
                let mut file = tokio::fs::File::open(&path).await?;
                let size = file.metadata().await?.len();
                known_size = Some(size);
                record.file_size = size;

                if let Some(dir) = &uploader.config.record_dir {
                    let record_file =
                        ResumeRecord::path_for(dir, uploader.tokens.bucket(), &self.key, &path);
                    if let Some(mut saved) = ResumeRecord::load(&record_file).await {
                        if saved.matches(&self.key, size, block_size) {
                            saved.retain_unexpired(Utc::now().timestamp());
                            if !saved.contexts.is_empty() {
                                saved.retain_matching(&mut file).await?;
                            }
                            record.contexts = saved.contexts;
                        }
                    }
                    record_path = Some(record_file);
                }

                let offset = record.contexts.len() as u64 * block_size;
                file.seek(SeekFrom::Start(offset)).await?;
                if offset > 0 {
                    info!("Resuming {} after {} blocks", self.key, record.contexts.len());
                }
                Box::new(file)
            }
            UploadSource::Bytes(data) => {
                known_size = Some(data.len() as u64);
                Box::new(std::io::Cursor::new(data))
            }
            UploadSource::Stream(reader) => reader,
        };

        let total = known_size.map(|size| size.div_ceil(block_size));
        let mut uploaded = record.contexts.len() as u64 * block_size;
        let mut block = Vec::with_capacity(block_size as usize);

        self.set_state(ResumeState::UploadingBlocks {
            done: record.contexts.len() as u64,
            total,
        });

        loop {
            block.clear();
            let read = (&mut reader).take(block_size).read_to_end(&mut block).await?;
            if read == 0 {
                break;
            }

            let data = &block;
            let reply = with_retry(&uploader.config.retry, "mkblk", || uploader.make_block(data)).await?;
            uploaded += read as u64;
            record.contexts.push(BlockContext {
                ctx: reply.ctx,
                expired_at: reply.expired_at,
                digest: block_digest(data),
            });

            let done = record.contexts.len() as u64;
            debug!("Uploaded block {} of {}", done, self.key);
            self.set_state(ResumeState::UploadingBlocks { done, total });

            if let Some(path) = &record_path {
                if let Err(e) = record.save(path).await {
                    warn!("Failed to persist resume record for {}: {}", self.key, e);
                }
            }

            if (read as u64) < block_size {
                break;
            }
        }

        self.set_state(ResumeState::MakingFile);
        let size = known_size.unwrap_or(uploaded);
        let contexts = &record.contexts;
        let reply = with_retry(&uploader.config.retry, "mkfile", || {
            uploader.make_file(&self.key, size, &self.extra, contexts)
        })
        .await?;

        if let Some(path) = &record_path {
            ResumeRecord::remove(path).await;
        }

        self.set_state(ResumeState::Done);
        info!("Uploaded {} in {} blocks", self.key, record.contexts.len());
        Ok(reply)
    }
}
