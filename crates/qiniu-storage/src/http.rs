//! HTTP transport shared by every manager.
//!
//! - One pooled `reqwest` client per storage client
//! - `QBox` / `UpToken` authorization
//! - Status checking and `{"error": ...}` body mapping
//! - Tracing spans and request metrics

use std::sync::Arc;
use std::time::Instant;

use qiniu_auth::Mac;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info_span, Instrument};
use url::Url;

use crate::config::HttpConfig;
use crate::error::{StorageError, StorageResult};
use crate::metrics::record_request;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Request id header set by the service.
pub const REQ_ID_HEADER: &str = "x-reqid";

/// A successful response: status, request id and parsed body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply<T> {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub req_id: Option<String>,
    pub body: T,
}

impl<T> Reply<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            status: self.status,
            req_id: self.req_id,
            body: f(self.body),
        }
    }
}

impl Reply<Value> {
    /// Decode the JSON body into a typed value.
    pub fn decode<T: DeserializeOwned>(self) -> StorageResult<Reply<T>> {
        let body = serde_json::from_value(self.body).map_err(|e| {
            StorageError::invalid_response(format!("unexpected response body: {}", e))
        })?;
        Ok(Reply {
            status: self.status,
            req_id: self.req_id,
            body,
        })
    }
}

/// Encode `key=value` pairs as a form body. Pairs with empty values are kept.
pub fn form_body<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// `path?query` of a URL, as covered by the management signature.
fn path_and_query(url: &str) -> StorageResult<String> {
    let parsed = Url::parse(url)
        .map_err(|e| StorageError::validation(format!("invalid url {}: {}", url, e)))?;
    let mut signed = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        signed.push('?');
        signed.push_str(query);
    }
    Ok(signed)
}

/// Pooled HTTP client with signing.
pub struct HttpClient {
    http: Client,
    mac: Arc<Mac>,
}

impl HttpClient {
    /// Create a new transport.
    pub fn new(config: &HttpConfig, mac: Arc<Mac>) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(std::time::Duration::from_secs(90))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(concat!("qiniu-storage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StorageError::Network)?;

        Ok(Self { http, mac })
    }

    pub fn mac(&self) -> &Mac {
        &self.mac
    }

    /// POST a form-encoded management request, `QBox`-signed over path, query and body.
    pub async fn post_form_signed(
        &self,
        operation: &str,
        url: &str,
        form: Option<String>,
    ) -> StorageResult<Reply<Value>> {
        let signed_path = path_and_query(url)?;
        let body = form.unwrap_or_default();
        let authorization = self
            .mac
            .qbox_authorization(&signed_path, Some(body.as_bytes()));

        let request = self
            .http
            .post(url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, FORM_URLENCODED)
            .body(body);

        self.execute(operation, url, request).await
    }

    /// POST a JSON management request, `QBox`-signed over path and query only.
    pub async fn post_json_signed<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        url: &str,
        body: &B,
    ) -> StorageResult<Reply<Value>> {
        let signed_path = path_and_query(url)?;
        let authorization = self.mac.qbox_authorization(&signed_path, None);

        let request = self
            .http
            .post(url)
            .header(AUTHORIZATION, authorization)
            .json(body);

        self.execute(operation, url, request).await
    }

    /// Unsigned GET.
    pub async fn get(&self, operation: &str, url: &str) -> StorageResult<Reply<Value>> {
        let request = self.http.get(url);
        self.execute(operation, url, request).await
    }

    /// POST a multipart form (form upload; the token travels inside the form).
    pub async fn post_multipart(
        &self,
        operation: &str,
        url: &str,
        form: reqwest::multipart::Form,
    ) -> StorageResult<Reply<Value>> {
        let request = self.http.post(url).multipart(form);
        self.execute(operation, url, request).await
    }

    /// POST a raw body authorized with an upload token (resumable steps).
    pub async fn post_with_upload_token(
        &self,
        operation: &str,
        url: &str,
        upload_token: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> StorageResult<Reply<Value>> {
        let request = self
            .http
            .post(url)
            .header(AUTHORIZATION, format!("UpToken {}", upload_token))
            .header(CONTENT_TYPE, content_type)
            .body(body);

        self.execute(operation, url, request).await
    }

    async fn execute(
        &self,
        operation: &str,
        url: &str,
        request: RequestBuilder,
    ) -> StorageResult<Reply<Value>> {
        let span = info_span!("qiniu_request", operation = %operation);

        async {
            debug!("{} {}", operation, url);
            let start = Instant::now();

            let result = match request.send().await {
                Ok(response) => Self::read_response(response).await,
                Err(e) => Err(StorageError::Network(e)),
            };

            let status = match &result {
                Ok(reply) => reply.status,
                Err(e) => e.status().unwrap_or(0),
            };
            record_request(operation, status, start.elapsed().as_millis() as f64);

            result
        }
        .instrument(span)
        .await
    }

    async fn read_response(response: Response) -> StorageResult<Reply<Value>> {
        let status = response.status().as_u16();
        let req_id = response
            .headers()
            .get(REQ_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response.text().await?;

        if !(200..300).contains(&status) {
            return Err(StorageError::from_http_status(status, &text, req_id));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                StorageError::invalid_response(format!("malformed JSON body: {}", e))
            })?
        };

        Ok(Reply {
            status,
            req_id,
            body,
        })
    }
}
