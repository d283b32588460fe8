//! Resource management models: object metadata, listings and batch operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storage class of an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(into = "u8", try_from = "u8")]
pub enum StorageClass {
    #[default]
    Standard,
    InfrequentAccess,
    Archive,
    DeepArchive,
}

impl StorageClass {
    /// Numeric code used on the wire.
    pub fn code(&self) -> u8 {
        match self {
            StorageClass::Standard => 0,
            StorageClass::InfrequentAccess => 1,
            StorageClass::Archive => 2,
            StorageClass::DeepArchive => 3,
        }
    }
}

impl From<StorageClass> for u8 {
    fn from(class: StorageClass) -> Self {
        class.code()
    }
}

impl TryFrom<u8> for StorageClass {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(StorageClass::Standard),
            1 => Ok(StorageClass::InfrequentAccess),
            2 => Ok(StorageClass::Archive),
            3 => Ok(StorageClass::DeepArchive),
            other => Err(format!("unknown storage class: {}", other)),
        }
    }
}

/// Object metadata returned by `stat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// Size in bytes
    pub fsize: u64,
    /// Qiniu etag of the content
    pub hash: String,
    pub mime_type: String,
    /// Upload time in 100ns units since the epoch
    pub put_time: i64,
    #[serde(rename = "type", default)]
    pub storage_class: StorageClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5: Option<String>,
    /// 0 enabled, 1 disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u8>,
    /// Scheduled deletion time (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<i64>,
}

/// Options for one page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    /// Page size (the service caps it at 1000)
    pub limit: Option<u32>,
    /// Continuation marker from the previous page
    pub marker: Option<String>,
}

impl ListOptions {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }
}

/// One object in a listing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    pub key: String,
    pub hash: String,
    pub fsize: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub put_time: i64,
    #[serde(rename = "type", default)]
    pub storage_class: StorageClass,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    #[serde(default)]
    pub items: Vec<ListItem>,
    #[serde(default)]
    pub common_prefixes: Vec<String>,
    /// Marker for the next page; absent or empty at the end of the listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

impl ListPage {
    /// Marker to request the next page, `None` once the listing is exhausted.
    pub fn next_marker(&self) -> Option<&str> {
        self.marker.as_deref().filter(|m| !m.is_empty())
    }

    pub fn is_last(&self) -> bool {
        self.next_marker().is_none()
    }
}

/// Options for move and copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOptions {
    /// Overwrite the destination if it exists
    pub force: bool,
}

impl MoveOptions {
    pub fn force() -> Self {
        Self { force: true }
    }
}

/// One control-plane action inside a batch, applied to the client's bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BatchOperation {
    Stat {
        key: String,
    },
    ChangeMime {
        key: String,
        mime: String,
    },
    ChangeType {
        key: String,
        storage_class: StorageClass,
    },
    Delete {
        key: String,
    },
    DeleteAfterDays {
        key: String,
        days: u32,
    },
    Move {
        src_key: String,
        dest_bucket: String,
        dest_key: String,
        #[serde(default)]
        force: bool,
    },
    Copy {
        src_key: String,
        dest_bucket: String,
        dest_key: String,
        #[serde(default)]
        force: bool,
    },
}

impl BatchOperation {
    pub fn stat(key: impl Into<String>) -> Self {
        Self::Stat { key: key.into() }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    pub fn change_mime(key: impl Into<String>, mime: impl Into<String>) -> Self {
        Self::ChangeMime {
            key: key.into(),
            mime: mime.into(),
        }
    }

    pub fn change_type(key: impl Into<String>, storage_class: StorageClass) -> Self {
        Self::ChangeType {
            key: key.into(),
            storage_class,
        }
    }

    pub fn delete_after_days(key: impl Into<String>, days: u32) -> Self {
        Self::DeleteAfterDays {
            key: key.into(),
            days,
        }
    }

    pub fn move_to(
        src_key: impl Into<String>,
        dest_bucket: impl Into<String>,
        dest_key: impl Into<String>,
        options: MoveOptions,
    ) -> Self {
        Self::Move {
            src_key: src_key.into(),
            dest_bucket: dest_bucket.into(),
            dest_key: dest_key.into(),
            force: options.force,
        }
    }

    pub fn copy_to(
        src_key: impl Into<String>,
        dest_bucket: impl Into<String>,
        dest_key: impl Into<String>,
        options: MoveOptions,
    ) -> Self {
        Self::Copy {
            src_key: src_key.into(),
            dest_bucket: dest_bucket.into(),
            dest_key: dest_key.into(),
            force: options.force,
        }
    }

    /// Name of the action, as used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            BatchOperation::Stat { .. } => "stat",
            BatchOperation::ChangeMime { .. } => "chgm",
            BatchOperation::ChangeType { .. } => "chtype",
            BatchOperation::Delete { .. } => "delete",
            BatchOperation::DeleteAfterDays { .. } => "deleteAfterDays",
            BatchOperation::Move { .. } => "move",
            BatchOperation::Copy { .. } => "copy",
        }
    }
}

/// Outcome of one batch item, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItemResult {
    pub code: u16,
    #[serde(default)]
    pub data: Value,
}

impl BatchItemResult {
    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}
