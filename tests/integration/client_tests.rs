//! End-to-end client tests against a mock Qiniu service.

use qiniu_client::{
    BatchOperation, ClientConfig, FailureKind, ListOptions, MoveOptions, PfopOptions, Qiniu,
    RetryConfig, Transfer, UploadSource, FAILURE_CODE,
};
use qiniu_storage::etag;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client_for(host: String) -> Qiniu {
    let config = ClientConfig::new("ak", "sk", "z0", "media")
        .with_single_host(host)
        .with_block_size(4)
        .with_upload_retry(RetryConfig {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 2,
        })
        .enable_logging(true);
    Qiniu::new(config).expect("valid config")
}

fn client(server: &MockServer) -> Qiniu {
    client_for(server.address().to_string())
}

/// Client whose every host refuses connections.
fn unreachable_client() -> Qiniu {
    client_for("127.0.0.1:1".to_string())
}

#[tokio::test]
async fn test_form_upload_then_stat_reports_etag() {
    let server = MockServer::start().await;
    let payload = b"hello world".to_vec();
    let hash = etag::compute(&payload);

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("hello world"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "hello.txt", "hash": hash})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/stat/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "fsize": payload.len(),
            "hash": hash,
            "mimeType": "text/plain",
            "putTime": 17_000_000_000_000_000i64,
            "type": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let uploaded = client.put("hello.txt", payload.clone()).await;
    assert_eq!(uploaded.code, 200);
    assert_eq!(uploaded.data["hash"], hash.as_str());

    let stat = client.stat("hello.txt").await;
    assert_eq!(stat.code, 200);
    assert_eq!(stat.data["fsize"], payload.len() as u64);
    assert_eq!(stat.data["hash"], hash.as_str());
}

#[tokio::test]
async fn test_stat_envelope_keeps_response_body() {
    let server = MockServer::start().await;
    let body = json!({
        "fsize": 3,
        "hash": "h",
        "mimeType": "a/b",
        "putTime": 1,
        "type": 0,
        "endUser": "u1",
        "metaData": {"x-qn-meta-owner": "ops"},
        "restoreStatus": 2
    });
    Mock::given(method("POST"))
        .and(path_regex(r"^/stat/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let result = client(&server).stat("a").await;
    assert_eq!(result.code, 200);
    assert_eq!(result.data, body);
}

#[tokio::test]
async fn test_stat_envelope_accepts_sparse_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/stat/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fsize": 3, "hash": "h"})))
        .mount(&server)
        .await;

    let result = client(&server).stat("a").await;
    assert_eq!(result.code, 200);
    assert_eq!(result.data, json!({"fsize": 3, "hash": "h"}));
}

#[tokio::test]
async fn test_list_envelope_keeps_unmodelled_item_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"key": "p/1", "hash": "h", "fsize": 1, "mimeType": "a/b", "putTime": 1, "type": 0, "status": 1}],
            "commonPrefixes": ["p/dir/"]
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let page = client.list_prefix(&ListOptions::with_prefix("p/")).await;
    assert_eq!(page.code, 200);
    assert_eq!(page.data["items"][0]["status"], 1);
    assert_eq!(page.data["commonPrefixes"][0], "p/dir/");

    let all = client.list_all("p/").await;
    assert_eq!(all.data["items"][0]["status"], 1);
}

#[tokio::test]
async fn test_resumable_upload_block_count_and_shape() {
    let server = MockServer::start().await;
    let payload = b"0123456789abc".to_vec(); // 13 bytes, 4 blocks of 4

    Mock::given(method("POST"))
        .and(path_regex(r"^/mkblk/\d+$"))
        .respond_with(|request: &Request| {
            ResponseTemplate::new(200).set_body_json(json!({
                "ctx": format!("ctx{}", request.body.len()),
                "expired_at": 4_102_444_800i64
            }))
        })
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/mkfile/13/key/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "big.bin", "hash": "lhash"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .upload("big.bin", UploadSource::bytes(payload), Transfer::Resumable)
        .await;

    assert_eq!(result.code, 200);
    assert_eq!(result.data, json!({"key": "big.bin", "hash": "lhash"}));
}

#[tokio::test]
async fn test_tokens_within_ttl_are_identical() {
    let client = unreachable_client();
    let first = client.upload_token().await.unwrap();
    let second = client.upload_token().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_batch_partial_success_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batch"))
        .respond_with(ResponseTemplate::new(298).set_body_json(json!([
            {"code": 200},
            {"code": 612, "data": {"error": "no such file or directory"}},
            {"code": 200}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .batch(&[
            BatchOperation::delete("a"),
            BatchOperation::delete("missing"),
            BatchOperation::copy_to("b", "media", "c", MoveOptions::force()),
        ])
        .await;

    assert_eq!(result.code, 298);
    let items = result.data.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["code"], 200);
    assert_eq!(items[1]["code"], 612);
    assert_eq!(items[2]["code"], 200);
}

#[tokio::test]
async fn test_pfop_encodes_final_segment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pfop/"))
        .and(body_string_contains("avthumb%2Fmp4%7Csaveas%2FYnVja2V0Om91dGtleQ%3D%3D"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"persistentId": "z0.job"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .submit_pipeline(
            "in.mov",
            &["avthumb/mp4|saveas/bucket:outkey"],
            None,
            &PfopOptions::default(),
        )
        .await;

    assert_eq!(result.code, 200);
    assert_eq!(result.data["persistentId"], "z0.job");
}

#[tokio::test]
async fn test_transport_failures_become_400_envelopes() {
    let client = unreachable_client();

    let results = vec![
        client.stat("a").await,
        client.delete("a").await,
        client
            .copy_object("a", "media", "b", MoveOptions::default())
            .await,
        client.put("a", b"data".to_vec()).await,
        client
            .upload("a", UploadSource::bytes(b"data".to_vec()), Transfer::Resumable)
            .await,
    ];

    for result in results {
        assert_eq!(result.code, FAILURE_CODE);
        assert_eq!(result.failure_kind(), Some(FailureKind::Transport));
        assert!(!result.error().unwrap_or_default().is_empty());
    }
}

#[tokio::test]
async fn test_remote_rejection_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/stat/"))
        .respond_with(ResponseTemplate::new(612).set_body_json(json!({"error": "no such file or directory"})))
        .mount(&server)
        .await;

    let result = client(&server).stat("missing").await;
    assert_eq!(result.code, FAILURE_CODE);
    assert_eq!(result.failure_kind(), Some(FailureKind::Remote));
    assert_eq!(result.data["status"], 612);
}

#[tokio::test]
async fn test_list_prefix_marker_chaining() {
    let server = MockServer::start().await;
    let item = |key: &str| json!({"key": key, "hash": "h", "fsize": 1, "mimeType": "a/b", "putTime": 1, "type": 0});

    Mock::given(method("POST"))
        .and(path("/list"))
        .and(query_param("marker", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [item("p/1"), item("p/2")],
            "marker": "next"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/list"))
        .and(query_param("marker", "next"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [item("p/3")]})))
        .mount(&server)
        .await;

    let client = client(&server);

    let mut keys = Vec::new();
    let mut options = ListOptions::with_prefix("p/").limit(2);
    loop {
        let page = client.list_prefix(&options).await;
        assert_eq!(page.code, 200);
        for item in page.data["items"].as_array().unwrap() {
            keys.push(item["key"].as_str().unwrap().to_string());
        }
        match page.data["marker"].as_str().filter(|m| !m.is_empty()) {
            Some(marker) => options = options.marker(marker),
            None => break,
        }
    }
    assert_eq!(keys, vec!["p/1", "p/2", "p/3"]);

    let all = client.list_all("p/").await;
    assert_eq!(all.code, 200);
    let all_keys: Vec<_> = all.data["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["key"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(all_keys, keys);
}

#[tokio::test]
async fn test_delete_after_days_zero_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/deleteAfterDays/[^/]+/0$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).delete_after_days("a", 0).await;
    assert_eq!(result.code, 200);
    assert!(result.data.is_null());
}

#[tokio::test]
async fn test_put_file_form_and_resumable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "f", "hash": "h"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/mkblk/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ctx": "c", "expired_at": 4_102_444_800i64})))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/mkfile/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "f", "hash": "h"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("f.bin");
    tokio::fs::write(&file, b"abcdefg").await.unwrap();

    let client = client(&server);
    assert_eq!(client.put_file("f", &file, false).await.code, 200);
    assert_eq!(client.put_file("f", &file, true).await.code, 200);
}
