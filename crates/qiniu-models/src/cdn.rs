//! CDN (Fusion) models.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum URLs per refresh or prefetch request.
pub const MAX_REFRESH_URLS: usize = 100;

/// Maximum directories per refresh request.
pub const MAX_REFRESH_DIRS: usize = 10;

/// Time bucket for traffic analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Granularity {
    #[serde(rename = "5min")]
    FiveMinutes,
    #[serde(rename = "hour")]
    Hour,
    #[default]
    #[serde(rename = "day")]
    Day,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::FiveMinutes => "5min",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        }
    }
}

/// Response to a cache refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub code: i32,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub request_id: String,
    /// URLs the service refused
    #[serde(default)]
    pub invalid_urls: Option<Vec<String>>,
    /// Directories the service refused
    #[serde(default)]
    pub invalid_dirs: Option<Vec<String>>,
    #[serde(default)]
    pub url_quota_day: i64,
    #[serde(default)]
    pub url_surplus_day: i64,
    #[serde(default)]
    pub dir_quota_day: i64,
    #[serde(default)]
    pub dir_surplus_day: i64,
}

impl RefreshResponse {
    /// Whether the service accepted `item` (it is not listed as invalid).
    pub fn accepted(&self, item: &str) -> bool {
        let in_list = |list: &Option<Vec<String>>| {
            list.as_ref()
                .map(|l| l.iter().any(|x| x == item))
                .unwrap_or(false)
        };
        !in_list(&self.invalid_urls) && !in_list(&self.invalid_dirs)
    }
}

/// Response to a prefetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchResponse {
    pub code: i32,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub invalid_urls: Option<Vec<String>>,
    #[serde(default)]
    pub quota_day: i64,
    #[serde(default)]
    pub surplus_day: i64,
}

/// Response to a flux or bandwidth query.
///
/// `data` maps each domain to its per-region series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficResponse {
    pub code: i32,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub data: Value,
}

/// One downloadable log file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFile {
    pub name: String,
    pub size: u64,
    pub mtime: i64,
    pub url: String,
}

/// Response to a log list query; `data` maps each domain to its files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogListResponse {
    pub code: i32,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub data: std::collections::BTreeMap<String, Vec<LogFile>>,
}
