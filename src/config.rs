//! Configuration for the quota tracker.
//!
//! One knob: the daily view limit. Sources, later wins:
//! 1. built-in default (50)
//! 2. `~/.contact-quota/config.yaml`
//! 3. the `CONTACT_QUOTA_DAILY_LIMIT` environment variable
//!
//! Bad input never blocks the tool - an unreadable or malformed config file
//! and a non-numeric environment value degrade to the previous source with
//! a warning, and non-positive limits clamp to the default.

use crate::paths;
use crate::quota::{DailyLimit, DEFAULT_DAILY_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable overriding the configured daily limit.
pub const DAILY_LIMIT_ENV: &str = "CONTACT_QUOTA_DAILY_LIMIT";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    /// Maximum distinct contact detail views per user per calendar day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
        }
    }
}

fn default_daily_limit() -> i64 {
    i64::from(DEFAULT_DAILY_LIMIT)
}

impl QuotaConfig {
    /// Loads the effective configuration from file and environment.
    pub fn load() -> Self {
        let mut config = match paths::config_path() {
            Ok(path) => Self::from_file(&path),
            Err(e) => {
                tracing::warn!("Config path unavailable, using defaults: {:#}", e);
                Self::default()
            }
        };
        config.apply_env_override();
        config
    }

    /// Reads the config file, degrading to defaults if absent or malformed.
    fn from_file(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                return Self::default();
            }
        };
        match serde_yaml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Malformed config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    fn apply_env_override(&mut self) {
        let Ok(raw) = std::env::var(DAILY_LIMIT_ENV) else {
            return;
        };
        match raw.trim().parse::<i64>() {
            Ok(value) => self.daily_limit = value,
            Err(_) => {
                tracing::warn!("Ignoring non-numeric {}={:?}", DAILY_LIMIT_ENV, raw);
            }
        }
    }

    /// The validated daily limit (invalid configured values clamp to 50).
    pub fn daily_limit(&self) -> DailyLimit {
        DailyLimit::new(self.daily_limit)
    }
}
