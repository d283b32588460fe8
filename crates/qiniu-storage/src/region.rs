//! Storage zones and service endpoints.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Default Fusion (CDN) API host.
pub const DEFAULT_FUSION_HOST: &str = "fusion.qiniuapi.com";

/// Known storage zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    /// East China
    Z0,
    /// North China
    Z1,
    /// South China
    Z2,
    /// North America
    Na0,
    /// Southeast Asia
    As0,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Z0 => "z0",
            Zone::Z1 => "z1",
            Zone::Z2 => "z2",
            Zone::Na0 => "na0",
            Zone::As0 => "as0",
        }
    }

    /// Host table of the zone.
    pub fn region(&self) -> Region {
        let id = self.as_str();
        // z0 hosts carry no zone suffix
        let suffix = if *self == Zone::Z0 {
            String::new()
        } else {
            format!("-{}", id)
        };

        Region {
            src_up_hosts: vec![format!("up{}.qiniup.com", suffix)],
            cdn_up_hosts: vec![format!("upload{}.qiniup.com", suffix)],
            rs_host: format!("rs{}.qbox.me", suffix),
            rsf_host: format!("rsf{}.qbox.me", suffix),
            api_host: format!("api{}.qiniuapi.com", suffix),
            io_host: format!("iovip{}.qbox.me", suffix),
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Zone {
    type Err = StorageError;

    /// Accepts `z0` and the SDK spelling `Zone_z0`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        let id = id.strip_prefix("Zone_").unwrap_or(id);
        match id.to_ascii_lowercase().as_str() {
            "z0" => Ok(Zone::Z0),
            "z1" => Ok(Zone::Z1),
            "z2" => Ok(Zone::Z2),
            "na0" => Ok(Zone::Na0),
            "as0" => Ok(Zone::As0),
            _ => Err(StorageError::validation(format!("unknown zone: {}", s))),
        }
    }
}

/// Hosts serving each role in a zone. Hosts carry no scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub src_up_hosts: Vec<String>,
    pub cdn_up_hosts: Vec<String>,
    pub rs_host: String,
    pub rsf_host: String,
    pub api_host: String,
    pub io_host: String,
}

impl Region {
    /// Region serving every role from one host (private deployments, tests).
    pub fn single_host(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            src_up_hosts: vec![host.clone()],
            cdn_up_hosts: vec![host.clone()],
            rs_host: host.clone(),
            rsf_host: host.clone(),
            api_host: host.clone(),
            io_host: host,
        }
    }
}

/// Resolved URLs for one client.
#[derive(Debug, Clone)]
pub struct Endpoints {
    scheme: &'static str,
    use_cdn_domain: bool,
    region: Region,
    fusion_host: String,
}

impl Endpoints {
    pub fn new(region: Region, use_https: bool, use_cdn_domain: bool, fusion_host: impl Into<String>) -> Self {
        Self {
            scheme: if use_https { "https" } else { "http" },
            use_cdn_domain,
            region,
            fusion_host: fusion_host.into(),
        }
    }

    fn url(&self, host: &str, path: &str) -> String {
        format!("{}://{}{}", self.scheme, host, path)
    }

    pub fn region(&self) -> &Region {
        &self.region
    }

    /// Upload host, preferring the CDN-accelerated hosts when configured.
    pub fn up_host(&self) -> Result<&str, StorageError> {
        let hosts = if self.use_cdn_domain {
            &self.region.cdn_up_hosts
        } else {
            &self.region.src_up_hosts
        };
        hosts
            .first()
            .or_else(|| self.region.src_up_hosts.first())
            .map(String::as_str)
            .ok_or_else(|| StorageError::validation("region has no upload host"))
    }

    pub fn up_url(&self, path: &str) -> Result<String, StorageError> {
        Ok(self.url(self.up_host()?, path))
    }

    pub fn rs_url(&self, path: &str) -> String {
        self.url(&self.region.rs_host, path)
    }

    pub fn rsf_url(&self, path: &str) -> String {
        self.url(&self.region.rsf_host, path)
    }

    pub fn api_url(&self, path: &str) -> String {
        self.url(&self.region.api_host, path)
    }

    pub fn io_url(&self, path: &str) -> String {
        self.url(&self.region.io_host, path)
    }

    pub fn fusion_url(&self, path: &str) -> String {
        self.url(&self.fusion_host, path)
    }
}
