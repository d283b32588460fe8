//! HMAC-SHA1 request signing.
//!
//! Every signature is `urlsafe_base64(hmac_sha1(secret_key, data))`, prefixed
//! with the access key. Management requests carry it as
//! `Authorization: QBox <ak>:<sig>`; upload tokens append the signed data.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use hmac::{Hmac, Mac as _};
use sha1::Sha1;

use crate::error::{AuthError, AuthResult};

type HmacSha1 = Hmac<Sha1>;

/// URL-safe base64 with padding, as used in every path segment and token.
pub fn urlsafe_base64(data: impl AsRef<[u8]>) -> String {
    URL_SAFE.encode(data)
}

/// Encoded `bucket:key` entry used in control-plane paths.
pub fn encoded_entry(bucket: &str, key: &str) -> String {
    urlsafe_base64(format!("{}:{}", bucket, key))
}

/// Access key / secret key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    /// Create credentials; both keys must be non-blank.
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> AuthResult<Self> {
        let access_key = access_key.into();
        let secret_key = secret_key.into();

        if access_key.trim().is_empty() {
            return Err(AuthError::invalid_credentials("access key is empty"));
        }
        if secret_key.trim().is_empty() {
            return Err(AuthError::invalid_credentials("secret key is empty"));
        }

        Ok(Self {
            access_key,
            secret_key,
        })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Keyed signer built once from a credential pair.
#[derive(Clone)]
pub struct Mac {
    access_key: String,
    keyed: HmacSha1,
}

impl Mac {
    /// Build a signer. Fails only if the HMAC key is rejected.
    pub fn new(credentials: &Credentials) -> AuthResult<Self> {
        let keyed = HmacSha1::new_from_slice(credentials.secret_key.as_bytes())
            .map_err(|e| AuthError::invalid_credentials(format!("Invalid HMAC key: {}", e)))?;

        Ok(Self {
            access_key: credentials.access_key.clone(),
            keyed,
        })
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    fn digest(&self, data: &[u8]) -> String {
        let mut mac = self.keyed.clone();
        mac.update(data);
        urlsafe_base64(mac.finalize().into_bytes())
    }

    /// `<ak>:<sig>` over raw data.
    pub fn sign(&self, data: &[u8]) -> String {
        format!("{}:{}", self.access_key, self.digest(data))
    }

    /// `<ak>:<sig>:<encoded>` where `encoded` is the base64 of `data` and the
    /// signature covers `encoded`.
    pub fn sign_with_data(&self, data: &[u8]) -> String {
        let encoded = urlsafe_base64(data);
        format!("{}:{}", self.sign(encoded.as_bytes()), encoded)
    }

    /// Management token over `path?query`, plus the body for form-encoded requests.
    pub fn sign_request(&self, path_and_query: &str, form_body: Option<&[u8]>) -> String {
        let mut data = Vec::with_capacity(path_and_query.len() + 1);
        data.extend_from_slice(path_and_query.as_bytes());
        data.push(b'\n');
        if let Some(body) = form_body {
            data.extend_from_slice(body);
        }
        self.sign(&data)
    }

    /// `Authorization` header value for a management request.
    pub fn qbox_authorization(&self, path_and_query: &str, form_body: Option<&[u8]>) -> String {
        format!("QBox {}", self.sign_request(path_and_query, form_body))
    }
}

impl std::fmt::Debug for Mac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mac")
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}
