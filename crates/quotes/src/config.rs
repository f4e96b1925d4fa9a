//! Configuration loading for Quotebook
//!
//! Settings are loaded from (in order of priority):
//! 1. Runtime environment variables
//! 2. JSON file (~/.config/quotebook/quotebook.json)
//! 3. Built-in defaults

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::models::is_reserved_category;

/// Settings filename in the Quotebook config directory
const CONFIG_FILE: &str = "quotebook.json";

/// Database filename in the Quotebook config directory
const DATABASE_FILE: &str = "quotebook.sqlite";

const ENDPOINT_ENV: &str = "QUOTEBOOK_ENDPOINT";
const SYNC_INTERVAL_ENV: &str = "QUOTEBOOK_SYNC_INTERVAL";
const DATABASE_ENV: &str = "QUOTEBOOK_DATABASE";

/// Quotebook settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuotebookConfig {
    /// Record listing resource used for sync
    pub endpoint: String,
    /// Category label given to quotes fetched from the server
    pub remote_category: String,
    /// Maximum number of remote records taken per fetch
    pub remote_limit: Option<usize>,
    /// Seconds between periodic syncs
    pub sync_interval_secs: u64,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// SQLite database path (defaults to the config directory)
    pub database_path: Option<PathBuf>,
}

impl Default for QuotebookConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://jsonplaceholder.typicode.com/posts".to_string(),
            remote_category: "Server".to_string(),
            remote_limit: Some(10),
            sync_interval_secs: 30,
            request_timeout_secs: 10,
            database_path: None,
        }
    }
}

impl QuotebookConfig {
    /// Load settings from the config file (if present) and the environment
    pub fn load() -> Result<Self> {
        let base = if config::config_exists(CONFIG_FILE) {
            config::load_json(CONFIG_FILE)?
        } else {
            Self::default()
        };

        let config = base.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse Quotebook config JSON")
    }

    /// Apply environment-style overrides through the given lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            self.endpoint = endpoint;
        }
        if let Some(interval) = lookup(SYNC_INTERVAL_ENV) {
            self.sync_interval_secs = interval
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", SYNC_INTERVAL_ENV))?;
        }
        if let Some(path) = lookup(DATABASE_ENV) {
            self.database_path = Some(PathBuf::from(path));
        }
        Ok(self)
    }

    /// Reject settings the store or the sync loop can't work with
    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;
        let category = self.remote_category.trim();
        if category.is_empty() {
            bail!("remoteCategory must not be empty");
        }
        if is_reserved_category(category) {
            bail!("remoteCategory \"{}\" is reserved", self.remote_category);
        }
        if self.sync_interval_secs == 0 {
            bail!("syncIntervalSecs must be at least 1");
        }
        Ok(())
    }

    /// The endpoint as a validated URL
    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).with_context(|| format!("Invalid endpoint URL: {}", self.endpoint))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Resolved database path: explicit setting, else the config directory
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(|| config::config_path(DATABASE_FILE))
    }

    /// Get the default settings file path (~/.config/quotebook/quotebook.json)
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }
}
