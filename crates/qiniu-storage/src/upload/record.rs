//! Resume records for resumable file uploads.
//!
//! A record lists the contexts of the blocks already acknowledged by the
//! upload host, each with the SHA-1 of the bytes it was made from. It is
//! rewritten after every block and removed once `mkfile` succeeds.

use std::path::{Path, PathBuf};

use qiniu_auth::urlsafe_base64;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::error::StorageResult;

/// Blocks expiring within this many seconds are uploaded again.
const EXPIRY_MARGIN_SECS: i64 = 600;

/// URL-safe base64 SHA-1 of a block's content.
pub fn block_digest(data: &[u8]) -> String {
    urlsafe_base64(Sha1::digest(data))
}

/// Context of one acknowledged block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub ctx: String,
    /// Unix seconds after which the host forgets the block
    pub expired_at: i64,
    /// [`block_digest`] of the uploaded bytes; empty never matches
    #[serde(default)]
    pub digest: String,
}

/// Persisted progress of one resumable upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeRecord {
    pub key: String,
    pub file_size: u64,
    pub block_size: u64,
    /// Contexts in block order
    pub contexts: Vec<BlockContext>,
}

impl ResumeRecord {
    pub fn new(key: impl Into<String>, file_size: u64, block_size: u64) -> Self {
        Self {
            key: key.into(),
            file_size,
            block_size,
            contexts: Vec::new(),
        }
    }

    /// Record location for an upload of `file` to `bucket:key`.
    pub fn path_for(dir: &Path, bucket: &str, key: &str, file: &Path) -> PathBuf {
        let id = format!("{}:{}:{}", bucket, key, file.display());
        dir.join(urlsafe_base64(id))
    }

    /// Whether the record belongs to an upload with these parameters.
    pub fn matches(&self, key: &str, file_size: u64, block_size: u64) -> bool {
        self.key == key && self.file_size == file_size && self.block_size == block_size
    }

    /// Drop every context from the first one that is expired (or about to) at `now`.
    pub fn retain_unexpired(&mut self, now: i64) {
        let usable = self
            .contexts
            .iter()
            .take_while(|c| c.expired_at > now + EXPIRY_MARGIN_SECS)
            .count();
        self.contexts.truncate(usable);
    }

    /// Drop every context from the first block whose content in `reader`
    /// no longer hashes to the recorded digest.
    ///
    /// `reader` must be positioned at the start of the file. It is left at an
    /// unspecified position.
    pub async fn retain_matching<R: AsyncRead + Unpin>(&mut self, reader: &mut R) -> StorageResult<()> {
        let mut block = Vec::with_capacity(self.block_size as usize);
        let mut verified = 0;

        for context in &self.contexts {
            block.clear();
            (&mut *reader).take(self.block_size).read_to_end(&mut block).await?;
            if block.is_empty() || block_digest(&block) != context.digest {
                break;
            }
            verified += 1;
        }

        if verified < self.contexts.len() {
            info!(
                "Local file changed since last run of {}; keeping {} of {} blocks",
                self.key,
                verified,
                self.contexts.len()
            );
            self.contexts.truncate(verified);
        }
        Ok(())
    }

    /// Load a record; missing or unreadable records yield `None`.
    pub async fn load(path: &Path) -> Option<Self> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read resume record {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&data) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Ignoring corrupt resume record {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write the record, replacing any previous version.
    pub async fn save(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(self)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!("Saved resume record with {} blocks", self.contexts.len());
        Ok(())
    }

    pub async fn remove(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove resume record {}: {}", path.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(expired_at: i64) -> BlockContext {
        BlockContext {
            ctx: format!("ctx-{}", expired_at),
            expired_at,
            digest: String::new(),
        }
    }

    fn block(data: &[u8]) -> BlockContext {
        BlockContext {
            ctx: String::from_utf8_lossy(data).into_owned(),
            expired_at: i64::MAX,
            digest: block_digest(data),
        }
    }

    #[test]
    fn test_retain_unexpired_keeps_leading_blocks() {
        let mut record = ResumeRecord::new("k", 10, 4);
        record.contexts = vec![ctx(10_000), ctx(100), ctx(10_000)];
        record.retain_unexpired(1_000);
        assert_eq!(record.contexts, vec![ctx(10_000)]);
    }

    #[test]
    fn test_matches() {
        let record = ResumeRecord::new("k", 10, 4);
        assert!(record.matches("k", 10, 4));
        assert!(!record.matches("k", 11, 4));
        assert!(!record.matches("other", 10, 4));
    }

    #[tokio::test]
    async fn test_retain_matching_keeps_unchanged_prefix() {
        let mut record = ResumeRecord::new("k", 10, 4);
        record.contexts = vec![block(b"abcd"), block(b"efgh")];

        let mut same = std::io::Cursor::new(b"abcdefghij".to_vec());
        record.retain_matching(&mut same).await.unwrap();
        assert_eq!(record.contexts.len(), 2);

        let mut changed = std::io::Cursor::new(b"abcdXfghij".to_vec());
        record.retain_matching(&mut changed).await.unwrap();
        assert_eq!(record.contexts, vec![block(b"abcd")]);
    }

    #[tokio::test]
    async fn test_retain_matching_rejects_rewritten_first_block() {
        let mut record = ResumeRecord::new("k", 10, 4);
        record.contexts = vec![block(b"abcd"), block(b"efgh")];

        let mut rewritten = std::io::Cursor::new(b"XXXXefghij".to_vec());
        record.retain_matching(&mut rewritten).await.unwrap();
        assert!(record.contexts.is_empty());
    }

    #[tokio::test]
    async fn test_context_without_digest_is_not_trusted() {
        let mut record = ResumeRecord::new("k", 4, 4);
        record.contexts = vec![ctx(42)];

        let mut file = std::io::Cursor::new(b"abcd".to_vec());
        record.retain_matching(&mut file).await.unwrap();
        assert!(record.contexts.is_empty());
    }

    #[test]
    fn test_path_is_stable_per_upload() {
        let dir = Path::new("/tmp/records");
        let a = ResumeRecord::path_for(dir, "media", "a", Path::new("/data/a.bin"));
        let b = ResumeRecord::path_for(dir, "media", "b", Path::new("/data/a.bin"));
        assert_ne!(a, b);
        assert_eq!(a, ResumeRecord::path_for(dir, "media", "a", Path::new("/data/a.bin")));
    }

    #[tokio::test]
    async fn test_save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("record");

        let mut record = ResumeRecord::new("k", 10, 4);
        record.contexts.push(ctx(42));
        record.save(&path).await.unwrap();

        assert_eq!(ResumeRecord::load(&path).await, Some(record));

        ResumeRecord::remove(&path).await;
        assert_eq!(ResumeRecord::load(&path).await, None);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        assert_eq!(ResumeRecord::load(&path).await, None);
    }
}
