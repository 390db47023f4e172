//! Store configuration
//!
//! Resolved from, lowest precedence first: built-in defaults, the JSON file
//! at `{config_dir}/school-finder/config.json`, environment variables and
//! command-line flags (the last two both arrive through clap).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_STORE_URL: &str = "SCHOOL_FINDER_STORE_URL";
pub const ENV_API_KEY: &str = "SCHOOL_FINDER_API_KEY";

/// Connection settings for the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL of the PostgREST / Supabase project
    pub store_url: Option<String>,
    /// Anonymous API key sent as `apikey` and bearer token
    pub api_key: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Rows requested per page. Lookups read every page, so this must not
    /// exceed the server's own `max-rows` cap.
    pub row_limit: usize,
    /// Offline JSON dump used instead of the remote store
    pub fixture: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            api_key: None,
            timeout_secs: 30,
            row_limit: 200,
            fixture: None,
        }
    }
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub store_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub fixture: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Overrides from the environment alone, for MCP mode where there are no flags
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            store_url: non_empty(ENV_STORE_URL),
            api_key: non_empty(ENV_API_KEY),
            ..Self::default()
        }
    }
}

impl StoreConfig {
    /// Apply overrides on top of this configuration
    pub fn merge(mut self, overrides: ConfigOverrides) -> Self {
        if overrides.store_url.is_some() {
            self.store_url = overrides.store_url;
        }
        if overrides.api_key.is_some() {
            self.api_key = overrides.api_key;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = secs;
        }
        if overrides.fixture.is_some() {
            self.fixture = overrides.fixture;
        }
        self
    }
}

/// Path of the configuration file
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Cannot determine config directory")?;
    Ok(config_dir.join("school-finder").join("config.json"))
}

/// Load the configuration file at `path`, or defaults when it does not exist
pub fn load_config_from(path: &Path) -> Result<StoreConfig> {
    if !path.exists() {
        return Ok(StoreConfig::default());
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: StoreConfig = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;

    Ok(config)
}

/// Load the user configuration file and apply overrides
pub fn resolve(overrides: ConfigOverrides) -> Result<StoreConfig> {
    let base = match config_path() {
        Ok(path) => load_config_from(&path)?,
        Err(_) => StoreConfig::default(),
    };
    Ok(base.merge(overrides))
}
