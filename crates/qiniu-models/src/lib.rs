//! Shared models for the Qiniu storage client.
//!
//! This crate provides Serde-serializable types for:
//! - The uniform `{code, data}` operation envelope
//! - Object metadata, listings and batch operations
//! - Upload options and results
//! - Persistent processing jobs
//! - CDN refresh, prefetch and analytics responses

pub mod cdn;
pub mod envelope;
pub mod processing;
pub mod resource;
pub mod upload;

// Re-export common types
pub use cdn::{
    Granularity, LogFile, LogListResponse, PrefetchResponse, RefreshResponse, TrafficResponse,
    MAX_REFRESH_DIRS, MAX_REFRESH_URLS,
};
pub use envelope::{FailureKind, OperationResult, FAILURE_CODE};
pub use processing::{JobState, PfopOptions, PfopResult, PrefopItem, PrefopStatus};
pub use resource::{
    BatchItemResult, BatchOperation, FileInfo, ListItem, ListOptions, ListPage, MoveOptions,
    StorageClass,
};
pub use upload::{PutExtra, PutRet, Transfer};
