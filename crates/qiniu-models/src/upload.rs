//! Upload models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the payload travels to the upload host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Transfer {
    /// Single multipart/form-data request
    #[default]
    Form,
    /// Block-wise upload committed with `mkfile`
    Resumable,
}

/// Optional per-upload parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutExtra {
    /// Original file name reported to the service
    pub fname: Option<String>,
    /// Explicit MIME type; detected by the service when absent
    pub mime_type: Option<String>,
    /// Custom variables, keys must start with `x:`
    pub params: BTreeMap<String, String>,
}

impl PutExtra {
    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn fname(mut self, fname: impl Into<String>) -> Self {
        self.fname = Some(fname.into());
        self
    }

    /// Add a custom variable. Names without the `x:` prefix are ignored by the service.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Body returned by a completed upload.
///
/// The default return body is `{key, hash}`; a policy `returnBody` may add
/// fields, which are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PutRet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
