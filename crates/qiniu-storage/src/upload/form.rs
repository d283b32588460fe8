//! Direct form upload.

use std::sync::Arc;

use qiniu_auth::UploadTokenIssuer;
use qiniu_models::{PutExtra, PutRet};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use tokio::io::AsyncReadExt;
use tracing::{debug, info, warn};

use super::UploadSource;
use crate::error::{StorageError, StorageResult};
use crate::etag;
use crate::http::{HttpClient, Reply};
use crate::region::Endpoints;

/// Uploads a payload with one multipart request to the upload host.
pub struct FormUploader {
    http: Arc<HttpClient>,
    tokens: Arc<UploadTokenIssuer>,
    endpoints: Endpoints,
}

impl FormUploader {
    pub fn new(http: Arc<HttpClient>, tokens: Arc<UploadTokenIssuer>, endpoints: Endpoints) -> Self {
        Self {
            http,
            tokens,
            endpoints,
        }
    }

    /// Upload `source` under `key`.
    pub async fn upload(
        &self,
        key: &str,
        source: UploadSource,
        extra: &PutExtra,
    ) -> StorageResult<Reply<PutRet>> {
        let url = self.endpoints.up_url("/")?;
        let token = self.tokens.upload_token().await?;
        debug!("Form upload of {} ({}) to {}", key, source.kind(), url);

        let file_name = extra.fname.clone().unwrap_or_else(|| key.to_string());
        let mut local_etag = None;

        let part = match source {
            UploadSource::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let len = file.metadata().await?.len();
                Part::stream_with_length(Body::from(file), len)
            }
            UploadSource::Stream(mut reader) => {
                let mut data = Vec::new();
                reader.read_to_end(&mut data).await?;
                local_etag = Some(etag::compute(&data));
                Part::bytes(data)
            }
            UploadSource::Bytes(data) => {
                local_etag = Some(etag::compute(&data));
                Part::bytes(data)
            }
        };

        let mut part = part.file_name(file_name);
        if let Some(mime) = &extra.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|_| StorageError::validation(format!("invalid mime type: {}", mime)))?;
        }

        let mut form = Form::new().text("token", token).text("key", key.to_string());
        for (name, value) in &extra.params {
            form = form.text(name.clone(), value.clone());
        }
        let form = form.part("file", part);

        let reply = self
            .http
            .post_multipart("form_upload", &url, form)
            .await?
            .decode::<PutRet>()?;

        if let (Some(expected), Some(actual)) = (&local_etag, &reply.body.hash) {
            if expected != actual {
                warn!(key = %key, expected = %expected, actual = %actual, "Uploaded hash differs from local etag");
            }
        }

        info!("Uploaded {} via form", key);
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::region::Region;
    use qiniu_auth::{Credentials, Mac};
    use serde_json::json;
    use std::io::Write;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn uploader(server: &MockServer) -> FormUploader {
        let mac = Arc::new(Mac::new(&Credentials::new("ak", "sk").unwrap()).unwrap());
        let http = Arc::new(HttpClient::new(&HttpConfig::default(), mac.clone()).unwrap());
        let tokens = Arc::new(UploadTokenIssuer::new(mac, "media"));
        let host = server.address().to_string();
        FormUploader::new(http, tokens, Endpoints::new(Region::single_host(host.clone()), false, false, host))
    }

    #[tokio::test]
    async fn test_form_upload_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_string_contains("name=\"token\""))
            .and(body_string_contains("name=\"key\""))
            .and(body_string_contains("hello world"))
            .and(body_string_contains("name=\"x:user\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "a.txt",
                "hash": "FiqubDXJT8-0FdvpX0CLnOke6Ebt"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let extra = PutExtra::default().param("x:user", "alice");
        let reply = uploader(&server)
            .upload("a.txt", UploadSource::bytes(b"hello world".to_vec()), &extra)
            .await
            .unwrap();

        assert_eq!(reply.status, 200);
        assert_eq!(reply.body.key.as_deref(), Some("a.txt"));
        assert_eq!(reply.body.hash.as_deref(), Some("FiqubDXJT8-0FdvpX0CLnOke6Ebt"));
    }

    #[tokio::test]
    async fn test_form_upload_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("file contents"))
            .and(body_string_contains("text/plain"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "f.txt", "hash": "h"})))
            .expect(1)
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"file contents").unwrap();

        let extra = PutExtra::default().mime_type("text/plain");
        let reply = uploader(&server)
            .upload("f.txt", UploadSource::file(file.path()), &extra)
            .await
            .unwrap();
        assert_eq!(reply.body.key.as_deref(), Some("f.txt"));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let server = MockServer::start().await;
        let err = uploader(&server)
            .upload("x", UploadSource::file("/definitely/not/here"), &PutExtra::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[tokio::test]
    async fn test_rejected_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "bad token"})))
            .mount(&server)
            .await;

        let err = uploader(&server)
            .upload("x", UploadSource::stream(std::io::Cursor::new(b"data".to_vec())), &PutExtra::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Request failed with status 401: bad token");
    }
}
