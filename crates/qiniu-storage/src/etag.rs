//! Qiniu etag (`qetag`) of local payloads.
//!
//! Payloads of at most one block hash as `0x16 || sha1(data)`; larger ones as
//! `0x96 || sha1(sha1(block_0) || sha1(block_1) || ...)`. Both are URL-safe
//! base64 encoded.

use std::path::Path;

use qiniu_auth::urlsafe_base64;
use sha1::digest::Output;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::DEFAULT_BLOCK_SIZE;
use crate::error::StorageResult;

const SINGLE_BLOCK_PREFIX: u8 = 0x16;
const MULTI_BLOCK_PREFIX: u8 = 0x96;

fn finish(block_digests: Vec<Output<Sha1>>) -> String {
    let mut out = Vec::with_capacity(21);
    if block_digests.len() <= 1 {
        out.push(SINGLE_BLOCK_PREFIX);
        match block_digests.first() {
            Some(digest) => out.extend_from_slice(digest.as_slice()),
            None => out.extend_from_slice(&Sha1::digest(b"")),
        }
    } else {
        out.push(MULTI_BLOCK_PREFIX);
        let mut hasher = Sha1::new();
        for digest in &block_digests {
            hasher.update(digest.as_slice());
        }
        out.extend_from_slice(&hasher.finalize());
    }
    urlsafe_base64(out)
}

/// Etag of an in-memory payload with the standard 4 MiB block size.
pub fn compute(data: &[u8]) -> String {
    compute_with_block_size(data, DEFAULT_BLOCK_SIZE as usize)
}

/// Etag with an explicit block size (private deployments).
pub fn compute_with_block_size(data: &[u8], block_size: usize) -> String {
    let block_size = block_size.max(1);
    let digests = data
        .chunks(block_size)
        .map(|block| Sha1::digest(block))
        .collect();
    finish(digests)
}

/// Etag of everything readable from `reader`.
pub async fn compute_reader<R: AsyncRead + Unpin>(
    reader: &mut R,
    block_size: usize,
) -> StorageResult<String> {
    let block_size = block_size.max(1);
    let mut digests = Vec::new();
    let mut block = Vec::with_capacity(block_size);

    loop {
        block.clear();
        let read = (&mut *reader)
            .take(block_size as u64)
            .read_to_end(&mut block)
            .await?;
        if read == 0 {
            break;
        }
        digests.push(Sha1::digest(&block));
        if read < block_size {
            break;
        }
    }

    Ok(finish(digests))
}

/// Etag of a local file.
pub async fn compute_file(path: impl AsRef<Path>) -> StorageResult<String> {
    let mut file = tokio::fs::File::open(path).await?;
    compute_reader(&mut file, DEFAULT_BLOCK_SIZE as usize).await
}
