//! Application configuration.
//!
//! Every section carries `#[serde(default)]` so a partial TOML file (or no
//! file at all) yields a usable configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for rotated log files; stderr when unset
    pub log_dir: Option<PathBuf>,
    pub remote: RemoteConfig,
    pub retry: RetryConfig,
    pub workers: WorkerConfig,
    pub cache: CacheConfig,
    pub display: DisplayConfig,
    /// Named user tokens (`name -> token`), merged with `DPS_REPORT_TOKENS`
    pub tokens: BTreeMap<String, String>,
}

/// Remote report service endpoints and limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Hard cap on listing pages, even if the service claims more
    pub max_catalog_pages: u32,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dps.report".to_string(),
            request_timeout_secs: 30,
            max_catalog_pages: 5,
            user_agent: concat!("fightstats/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Exponential backoff for per-log downloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1_000,
            multiplier: 2.0,
            max_backoff_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Fixed pool size. Measured: 2 -> 67s, 4 -> 62s, 8 -> 59s, 16 -> 57s, 32 -> 62s
    pub worker_count: usize,
    /// A worker exits once the queue stayed empty this long
    pub queue_idle_timeout_ms: u64,
    pub progress_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_idle_timeout_ms: 3_000,
            progress_interval_ms: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub log_cache_capacity: usize,
    pub catalog_ttl_secs: u64,
    pub dataset_ttl_secs: u64,
    pub dataset_cache_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            log_cache_capacity: 500,
            catalog_ttl_secs: 300,
            dataset_ttl_secs: 310,
            dataset_cache_entries: 6,
        }
    }
}

/// Display attributes attached to rows; opaque to the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Specialization name -> color string
    pub spec_colors: BTreeMap<String, String>,
    pub default_spec_color: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            spec_colors: BTreeMap::new(),
            default_spec_color: "rgba(128,128,128,1)".to_string(),
        }
    }
}

impl DisplayConfig {
    pub fn color_for(&self, profession: &str) -> &str {
        self.spec_colors
            .get(profession)
            .map(String::as_str)
            .unwrap_or(&self.default_spec_color)
    }
}
