//! Qiniu Kodo storage managers.
//!
//! This crate provides:
//! - Zone host tables and endpoint resolution
//! - Form and resumable upload sessions
//! - Resource management (stat, move, copy, batch, listing, fetch)
//! - Persistent processing (pfop / prefop)
//! - CDN refresh, prefetch, analytics and logs
//! - Qiniu etag computation for local payloads

pub mod cdn;
pub mod config;
pub mod error;
pub mod etag;
pub mod http;
pub mod metrics;
pub mod processing;
pub mod region;
pub mod resource;
pub mod retry;
pub mod upload;

pub use cdn::CdnManager;
pub use config::{ClientConfig, HttpConfig, ResumeConfig, DEFAULT_BLOCK_SIZE};
pub use error::{StorageError, StorageResult};
pub use http::{HttpClient, Reply};
pub use processing::{encode_fops, ProcessingManager};
pub use region::{Endpoints, Region, Zone, DEFAULT_FUSION_HOST};
pub use resource::{ResourceManager, MAX_BATCH_OPS};
pub use retry::{with_retry, RetryConfig};
pub use upload::{
    BlockContext, FormUploader, ResumableSession, ResumeRecord, ResumeState, ResumeUploader,
    UploadSource,
};
