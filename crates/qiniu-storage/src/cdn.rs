//! CDN operations on the Fusion host.

use std::sync::Arc;

use chrono::NaiveDate;
use qiniu_models::{
    Granularity, LogListResponse, PrefetchResponse, RefreshResponse, TrafficResponse,
    MAX_REFRESH_DIRS, MAX_REFRESH_URLS,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::{StorageError, StorageResult};
use crate::http::{HttpClient, Reply};
use crate::region::Endpoints;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn is_empty(items: &&[String]) -> bool {
    items.is_empty()
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    #[serde(skip_serializing_if = "is_empty")]
    urls: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    dirs: &'a [String],
}

#[derive(Serialize)]
struct PrefetchRequest<'a> {
    urls: &'a [String],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrafficRequest<'a> {
    start_date: &'a str,
    end_date: &'a str,
    granularity: &'a str,
    domains: String,
}

#[derive(Serialize)]
struct LogListRequest<'a> {
    day: &'a str,
    domains: String,
}

fn check_batch(what: &str, items: &[String], max: usize) -> StorageResult<()> {
    if items.len() > max {
        return Err(StorageError::validation(format!(
            "at most {} {} per request, got {}",
            max,
            what,
            items.len()
        )));
    }
    if items.iter().any(|i| i.trim().is_empty()) {
        return Err(StorageError::validation(format!("{} must not be blank", what)));
    }
    Ok(())
}

fn parse_date(name: &str, value: &str) -> StorageResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| {
        StorageError::validation(format!("{} must be a YYYY-MM-DD date, got '{}'", name, value))
    })
}

fn join_domains(domains: &[String]) -> StorageResult<String> {
    if domains.is_empty() {
        return Err(StorageError::validation("at least one domain is required"));
    }
    Ok(domains.join(";"))
}

/// Cache refresh, prefetch, traffic analytics and log listing.
///
/// Each call has an `_as` variant that decodes the response into any body
/// type; `serde_json::Value` keeps the response exactly as received.
pub struct CdnManager {
    http: Arc<HttpClient>,
    endpoints: Endpoints,
}

impl CdnManager {
    pub fn new(http: Arc<HttpClient>, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    /// Refresh cached URLs and directories in one request.
    pub async fn refresh(
        &self,
        urls: &[String],
        dirs: &[String],
    ) -> StorageResult<Reply<RefreshResponse>> {
        self.refresh_as(urls, dirs).await
    }

    pub async fn refresh_as<T: DeserializeOwned>(
        &self,
        urls: &[String],
        dirs: &[String],
    ) -> StorageResult<Reply<T>> {
        if urls.is_empty() && dirs.is_empty() {
            return Err(StorageError::validation("nothing to refresh"));
        }
        check_batch("urls", urls, MAX_REFRESH_URLS)?;
        check_batch("dirs", dirs, MAX_REFRESH_DIRS)?;
        if let Some(dir) = dirs.iter().find(|d| !d.ends_with('/')) {
            return Err(StorageError::validation(format!(
                "dir '{}' must end with '/'",
                dir
            )));
        }

        let reply = self
            .http
            .post_json_signed(
                "cdn_refresh",
                &self.endpoints.fusion_url("/v2/tune/refresh"),
                &RefreshRequest { urls, dirs },
            )
            .await?;

        info!(
            "Requested CDN refresh of {} urls and {} dirs",
            urls.len(),
            dirs.len()
        );
        reply.decode()
    }

    pub async fn refresh_urls(&self, urls: &[String]) -> StorageResult<Reply<RefreshResponse>> {
        self.refresh_urls_as(urls).await
    }

    pub async fn refresh_urls_as<T: DeserializeOwned>(
        &self,
        urls: &[String],
    ) -> StorageResult<Reply<T>> {
        if urls.is_empty() {
            return Err(StorageError::validation("at least one url is required"));
        }
        self.refresh_as(urls, &[]).await
    }

    /// Directories must end with `/`.
    pub async fn refresh_dirs(&self, dirs: &[String]) -> StorageResult<Reply<RefreshResponse>> {
        self.refresh_dirs_as(dirs).await
    }

    pub async fn refresh_dirs_as<T: DeserializeOwned>(
        &self,
        dirs: &[String],
    ) -> StorageResult<Reply<T>> {
        if dirs.is_empty() {
            return Err(StorageError::validation("at least one dir is required"));
        }
        self.refresh_as(&[], dirs).await
    }

    pub async fn prefetch_urls(&self, urls: &[String]) -> StorageResult<Reply<PrefetchResponse>> {
        self.prefetch_urls_as(urls).await
    }

    pub async fn prefetch_urls_as<T: DeserializeOwned>(
        &self,
        urls: &[String],
    ) -> StorageResult<Reply<T>> {
        if urls.is_empty() {
            return Err(StorageError::validation("at least one url is required"));
        }
        check_batch("urls", urls, MAX_REFRESH_URLS)?;

        self.http
            .post_json_signed(
                "cdn_prefetch",
                &self.endpoints.fusion_url("/v2/tune/prefetch"),
                &PrefetchRequest { urls },
            )
            .await?
            .decode()
    }

    async fn traffic<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        start_date: &str,
        end_date: &str,
        granularity: Granularity,
        domains: &[String],
    ) -> StorageResult<Reply<T>> {
        let start = parse_date("start date", start_date)?;
        let end = parse_date("end date", end_date)?;
        if start > end {
            return Err(StorageError::validation("start date is after end date"));
        }

        let request = TrafficRequest {
            start_date,
            end_date,
            granularity: granularity.as_str(),
            domains: join_domains(domains)?,
        };

        self.http
            .post_json_signed(operation, &self.endpoints.fusion_url(path), &request)
            .await?
            .decode()
    }

    /// Traffic volume per domain between two `YYYY-MM-DD` dates (inclusive).
    pub async fn get_flux_data(
        &self,
        start_date: &str,
        end_date: &str,
        granularity: Granularity,
        domains: &[String],
    ) -> StorageResult<Reply<TrafficResponse>> {
        self.get_flux_data_as(start_date, end_date, granularity, domains)
            .await
    }

    pub async fn get_flux_data_as<T: DeserializeOwned>(
        &self,
        start_date: &str,
        end_date: &str,
        granularity: Granularity,
        domains: &[String],
    ) -> StorageResult<Reply<T>> {
        self.traffic("cdn_flux", "/v2/tune/flux", start_date, end_date, granularity, domains)
            .await
    }

    /// Bandwidth per domain between two `YYYY-MM-DD` dates (inclusive).
    pub async fn get_bandwidth_data(
        &self,
        start_date: &str,
        end_date: &str,
        granularity: Granularity,
        domains: &[String],
    ) -> StorageResult<Reply<TrafficResponse>> {
        self.get_bandwidth_data_as(start_date, end_date, granularity, domains)
            .await
    }

    pub async fn get_bandwidth_data_as<T: DeserializeOwned>(
        &self,
        start_date: &str,
        end_date: &str,
        granularity: Granularity,
        domains: &[String],
    ) -> StorageResult<Reply<T>> {
        self.traffic(
            "cdn_bandwidth",
            "/v2/tune/bandwidth",
            start_date,
            end_date,
            granularity,
            domains,
        )
        .await
    }

    /// Access log files of `domains` for one day.
    pub async fn get_log_list(
        &self,
        domains: &[String],
        day: &str,
    ) -> StorageResult<Reply<LogListResponse>> {
        self.get_log_list_as(domains, day).await
    }

    pub async fn get_log_list_as<T: DeserializeOwned>(
        &self,
        domains: &[String],
        day: &str,
    ) -> StorageResult<Reply<T>> {
        parse_date("day", day)?;
        let request = LogListRequest {
            day,
            domains: join_domains(domains)?,
        };

        self.http
            .post_json_signed(
                "cdn_log_list",
                &self.endpoints.fusion_url("/v2/tune/log/list"),
                &request,
            )
            .await?
            .decode()
    }
}
