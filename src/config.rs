//! Runtime configuration loaded from an optional YAML file.
//!
//! Every field has a default, so the importer runs with no config file at
//! all. A full config looks like:
//!
//! ```yaml
//! rate_limit:
//!   requests_per_window: 1000
//!   window_secs: 60
//!   max_in_flight: 8
//! host_rewrites:
//!   "172.24.17.157": "vulture.com"
//! site_label: "The Strategist"
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;

use crate::limiter::RateLimitConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Request ceilings for the shared rate limiter.
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    /// Internal host prefixes rewritten to their public equivalents in
    /// page URIs.
    #[serde(default)]
    pub host_rewrites: HashMap<String, String>,
    /// Site label stamped on inline-product rows.
    #[serde(default = "default_site_label")]
    pub site_label: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitSettings::default(),
            host_rewrites: HashMap::new(),
            site_label: default_site_label(),
        }
    }
}

/// Rate limiter settings as they appear in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(default = "default_requests_per_window")]
    pub requests_per_window: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_window: default_requests_per_window(),
            window_secs: default_window_secs(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            requests_per_window: settings.requests_per_window,
            window: Duration::from_secs(settings.window_secs),
            max_in_flight: settings.max_in_flight,
        }
    }
}

fn default_requests_per_window() -> u32 {
    1000
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_in_flight() -> usize {
    8
}

fn default_site_label() -> String {
    "The Strategist".to_string()
}

/// Load configuration from `path`, or defaults when no path was given.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&text)?)
        }
        None => Ok(AppConfig::default()),
    }
}
