//! Tests against a real Qiniu bucket.
//!
//! Requires `QINIU_ACCESS_KEY`, `QINIU_SECRET_KEY`, `QINIU_ZONE` and
//! `QINIU_BUCKET` (a `.env` file is honoured).

use qiniu_client::{ListOptions, Qiniu, Transfer, UploadSource};
use qiniu_storage::etag;

fn live_client() -> Qiniu {
    dotenvy::dotenv().ok();
    Qiniu::from_env().expect("Failed to create Qiniu client")
}

/// Unique key under the `integration/` prefix.
fn test_key(name: &str) -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("integration/{}-{}", millis, name)
}

/// Upload, stat and delete one object.
#[tokio::test]
#[ignore = "requires Qiniu credentials"]
async fn test_upload_stat_delete() {
    let client = live_client();
    let key = test_key("hello.txt");
    let payload = b"hello from the integration suite".to_vec();

    let uploaded = client.put(&key, payload.clone()).await;
    assert_eq!(uploaded.code, 200, "upload failed: {}", uploaded.data);

    let stat = client.stat(&key).await;
    assert_eq!(stat.code, 200);
    assert_eq!(stat.data["fsize"], payload.len() as u64);
    assert_eq!(stat.data["hash"], etag::compute(&payload).as_str());

    let deleted = client.delete(&key).await;
    assert_eq!(deleted.code, 200);

    let missing = client.stat(&key).await;
    assert_eq!(missing.code, 400);
    assert_eq!(missing.data["status"], 612);
}

/// Resumable upload of a payload spanning several 4 MiB blocks.
#[tokio::test]
#[ignore = "requires Qiniu credentials"]
async fn test_resumable_upload() {
    let client = live_client();
    let key = test_key("big.bin");
    let payload: Vec<u8> = (0..9 * 1024 * 1024).map(|i| (i % 251) as u8).collect();

    let uploaded = client
        .upload(&key, UploadSource::bytes(payload.clone()), Transfer::Resumable)
        .await;
    assert_eq!(uploaded.code, 200, "upload failed: {}", uploaded.data);
    assert_eq!(uploaded.data["hash"], etag::compute(&payload).as_str());

    assert_eq!(client.delete(&key).await.code, 200);
}

/// Listing the test prefix succeeds.
#[tokio::test]
#[ignore = "requires Qiniu credentials"]
async fn test_list_prefix() {
    let client = live_client();
    let page = client
        .list_prefix(&ListOptions::with_prefix("integration/").limit(10))
        .await;
    assert_eq!(page.code, 200, "list failed: {}", page.data);
    assert!(page.data["items"].is_array());
}
