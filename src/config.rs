use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub geoip: GeoIpConfig,

    #[serde(default)]
    pub sweep: SweepConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for the API
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// External GeoIP provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// Provider base URL
    #[serde(default = "default_geoip_base_url")]
    pub base_url: String,

    /// API key, if the provider requires one
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_geoip_timeout_secs")]
    pub timeout_secs: u64,

    /// How long a lookup result stays cached, in seconds
    #[serde(default = "default_geoip_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            base_url: default_geoip_base_url(),
            api_key: String::new(),
            timeout_secs: default_geoip_timeout_secs(),
            cache_ttl_secs: default_geoip_cache_ttl_secs(),
        }
    }
}

/// Background sweep settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between reclamation passes over the temporal store
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_geoip_base_url() -> String {
    "https://api.ipgeolocation.io/ipgeo".to_string()
}

fn default_geoip_timeout_secs() -> u64 {
    10
}

fn default_geoip_cache_ttl_secs() -> u64 {
    6 * 3600
}

fn default_sweep_interval_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load config from default locations or create default
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/geoblock/config.toml"),
            dirs_next::config_dir()
                .map(|p| p.join("geoblock/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("config.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}
