//! Qiniu storage client with uniform `{code, data}` results.
//!
//! ```no_run
//! use qiniu_client::{ClientConfig, Qiniu, Transfer, UploadSource};
//!
//! # async fn run() -> Result<(), qiniu_client::StorageError> {
//! let client = Qiniu::new(ClientConfig::new("ak", "sk", "z0", "media").enable_logging(true))?;
//! let result = client
//!     .upload("clips/a.mp4", UploadSource::file("/tmp/a.mp4"), Transfer::Resumable)
//!     .await;
//! println!("{} {}", result.code, result.data);
//! # Ok(())
//! # }
//! ```

pub mod client;
mod normalize;

pub use client::Qiniu;

// Re-export the types needed to call the client
pub use qiniu_auth::{PolicyTemplate, PutPolicy};
pub use qiniu_models::{
    BatchItemResult, BatchOperation, FailureKind, FileInfo, Granularity, ListOptions, ListPage,
    MoveOptions, OperationResult, PfopOptions, PrefopStatus, PutExtra, PutRet, StorageClass,
    Transfer, FAILURE_CODE,
};
pub use qiniu_storage::{
    ClientConfig, Region, ResumeState, RetryConfig, StorageError, StorageResult, UploadSource,
    Zone,
};
