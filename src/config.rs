//! Application configuration loaded from environment variables.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Upstream API ===
    /// Base URL of the Opinion open API.
    #[serde(default = "default_api_base")]
    pub opinion_api_base: String,

    /// API key sent as the `x-api-key` header. Optional at load time;
    /// the client fails fast on the first fetch if it is missing.
    #[serde(default)]
    pub opinion_api_key: Option<String>,

    /// Hard per-request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Fixed backoff before the single retry, in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    // === Pagination reconciler ===
    /// Maximum upstream pages scanned while filling one output window.
    #[serde(default = "default_max_scan_pages")]
    pub max_scan_pages: u32,

    // === Caching ===
    /// Maximum entries per cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// TTL for list responses, in milliseconds.
    #[serde(default = "default_list_cache_ttl_ms")]
    pub list_cache_ttl_ms: u64,

    /// TTL for detail responses, in milliseconds.
    #[serde(default = "default_detail_cache_ttl_ms")]
    pub detail_cache_ttl_ms: u64,

    // === Server ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_api_base() -> String {
    "https://openapi.opinion.trade/openapi".to_string()
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_retry_backoff_ms() -> u64 {
    400
}

fn default_max_scan_pages() -> u32 {
    8
}

fn default_cache_capacity() -> usize {
    200
}

fn default_list_cache_ttl_ms() -> u64 {
    30_000
}

fn default_detail_cache_ttl_ms() -> u64 {
    60_000
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.opinion_api_base.is_empty() {
            return Err("OPINION_API_BASE must not be empty".to_string());
        }

        if url::Url::parse(&self.opinion_api_base).is_err() {
            return Err(format!(
                "OPINION_API_BASE is not a valid URL: {}",
                self.opinion_api_base
            ));
        }

        if self.max_scan_pages == 0 {
            return Err("MAX_SCAN_PAGES must be at least 1".to_string());
        }

        if self.cache_capacity == 0 {
            return Err("CACHE_CAPACITY must be at least 1".to_string());
        }

        Ok(())
    }

    /// Whether an API credential is configured.
    pub fn has_api_key(&self) -> bool {
        self.opinion_api_key
            .as_deref()
            .map(|k| !k.is_empty())
            .unwrap_or(false)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            opinion_api_base: default_api_base(),
            opinion_api_key: None,
            http_timeout_ms: default_http_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_scan_pages: default_max_scan_pages(),
            cache_capacity: default_cache_capacity(),
            list_cache_ttl_ms: default_list_cache_ttl_ms(),
            detail_cache_ttl_ms: default_detail_cache_ttl_ms(),
            port: default_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_sensible() {
        let config = Config::default();
        assert_eq!(config.http_timeout_ms, 10_000);
        assert_eq!(config.retry_backoff_ms, 400);
        assert_eq!(config.max_scan_pages, 8);
        assert_eq!(config.cache_capacity, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let config = Config {
            opinion_api_base: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_scan_ceiling() {
        let config = Config {
            max_scan_pages: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_api_key_counts_as_missing() {
        let config = Config {
            opinion_api_key: Some(String::new()),
            ..Config::default()
        };
        assert!(!config.has_api_key());

        let config = Config {
            opinion_api_key: Some("key".to_string()),
            ..Config::default()
        };
        assert!(config.has_api_key());
    }
}
