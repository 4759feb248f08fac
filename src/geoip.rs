//! GeoIP lookup client
//!
//! Resolves an IP to country/ISP information through an external HTTP
//! provider. Providers disagree on field names, so extraction walks a
//! fallback chain per field. Successful lookups are cached with a TTL.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::clock::Clock;
use crate::config::GeoIpConfig;
use crate::models::GeoIpInfo;

/// Errors that can occur during a GeoIP lookup
#[derive(Debug, Error)]
pub enum GeoIpError {
    #[error("geo provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("geo provider returned status {0}")]
    Status(reqwest::StatusCode),
}

struct CachedLookup {
    info: GeoIpInfo,
    expires_at: DateTime<Utc>,
}

/// HTTP client for the configured GeoIP provider
pub struct GeoIpClient {
    config: GeoIpConfig,
    client: reqwest::Client,
    cache: DashMap<String, CachedLookup>,
    clock: Arc<dyn Clock>,
}

impl GeoIpClient {
    pub fn new(config: GeoIpConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent("geoblock/0.1")
            .build()?;

        Ok(Self {
            config,
            client,
            cache: DashMap::new(),
            clock,
        })
    }

    /// Lookup country/ISP information for an IP
    pub async fn lookup(&self, ip: &str) -> Result<GeoIpInfo, GeoIpError> {
        if let Some(cached) = self.cached(ip) {
            debug!("geo cache hit for {}", ip);
            return Ok(cached);
        }

        let url = self.lookup_url(ip);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GeoIpError::Status(response.status()));
        }

        let body: Value = response.json().await?;
        let info = extract_info(ip, &body);

        let ttl = Duration::seconds(self.config.cache_ttl_secs as i64);
        self.cache.insert(
            ip.to_string(),
            CachedLookup {
                info: info.clone(),
                expires_at: self.clock.now() + ttl,
            },
        );

        Ok(info)
    }

    /// Cached result for an IP, lazily evicting it if stale
    fn cached(&self, ip: &str) -> Option<GeoIpInfo> {
        let now = self.clock.now();
        match self.cache.get(ip) {
            Some(entry) if entry.expires_at <= now => {
                drop(entry);
                self.cache.remove_if(ip, |_, cached| cached.expires_at <= now);
                None
            }
            Some(entry) => Some(entry.info.clone()),
            None => None,
        }
    }

    /// Provider-specific URL for an IP
    ///
    /// ipapi.co takes the IP in the path; ipgeolocation.io (and most keyed
    /// providers) take `?apiKey=&ip=`.
    fn lookup_url(&self, ip: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if base.contains("ipapi.co") {
            format!("{}/{}/json/", base, ip)
        } else {
            format!("{}?apiKey={}&ip={}", base, self.config.api_key, ip)
        }
    }
}

/// Extract the common fields from a provider response body
fn extract_info(ip: &str, body: &Value) -> GeoIpInfo {
    let first_str = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    };

    let country_code = first_str(&["country_code2", "country", "country_code", "countryCode"])
        .unwrap_or_else(|| "N/A".to_string())
        .to_uppercase();

    let country_name = first_str(&["country_name", "country_name_en"])
        .unwrap_or_else(|| "Unknown".to_string());

    let isp = first_str(&["isp", "org", "organization"])
        .or_else(|| {
            body.pointer("/connection/isp")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .or_else(|| {
            body.pointer("/company/name")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Unknown".to_string());

    GeoIpInfo {
        ip: ip.to_string(),
        country_code,
        country_name,
        isp,
    }
}
