use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_market_hash_name")]
    pub market_hash_name: String,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
    #[serde(default = "default_listing_type")]
    pub listing_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_path")]
    pub path: PathBuf,
}

fn default_market_hash_name() -> String {
    "★ M9 Bayonet | Tiger Tooth (Factory New)".to_string()
}
fn default_limit() -> u32 { 10 }
fn default_sort_by() -> String { "lowest_price".to_string() }
fn default_listing_type() -> String { "buy_now".to_string() }
fn default_base_url() -> String { "https://csfloat.com".to_string() }
fn default_history_path() -> PathBuf { PathBuf::from("data/history.csv") }

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            market_hash_name: default_market_hash_name(),
            limit: default_limit(),
            sort_by: default_sort_by(),
            listing_type: default_listing_type(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: default_history_path(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub csfloat_api_key: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

impl EnvConfig {
    pub fn load() -> Self {
        dotenv::dotenv().ok();

        Self {
            csfloat_api_key: std::env::var("CSFLOAT_API_KEY").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(
            config.tracker.market_hash_name,
            "★ M9 Bayonet | Tiger Tooth (Factory New)"
        );
        assert_eq!(config.tracker.limit, 10);
        assert_eq!(config.tracker.sort_by, "lowest_price");
        assert_eq!(config.tracker.listing_type, "buy_now");
        assert_eq!(config.api.base_url, "https://csfloat.com");
        assert_eq!(config.api.request_timeout_secs, None);
        assert_eq!(config.history.path, PathBuf::from("data/history.csv"));
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let toml_str = r#"
            [tracker]
            market_hash_name = "AK-47 | Redline (Field-Tested)"
            limit = 25

            [api]
            request_timeout_secs = 15
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.tracker.market_hash_name, "AK-47 | Redline (Field-Tested)");
        assert_eq!(config.tracker.limit, 25);
        assert_eq!(config.tracker.sort_by, "lowest_price");
        assert_eq!(config.api.base_url, "https://csfloat.com");
        assert_eq!(config.api.request_timeout_secs, Some(15));
        assert_eq!(config.history.path, PathBuf::from("data/history.csv"));
    }

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.tracker.limit, 10);
        assert_eq!(config.api.base_url, "https://csfloat.com");
    }
}
