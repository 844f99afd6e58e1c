//! Config file loading for the CLI.
//!
//! ```toml
//! [store]
//! idle_timeout_ms = 5000
//! sweep_interval_ms = 250
//! ```
//!
//! Command-line flags override file values, which override the library
//! defaults.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context as _, Result};
use lapse_session::StoreConfig;
use serde::Deserialize;

/// Top-level config file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub store: StoreSection,
}

/// `[store]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    pub idle_timeout_ms: Option<u64>,
    pub sweep_interval_ms: Option<u64>,
    pub sweeper: Option<bool>,
}

/// Values given on the command line.
#[derive(Debug, Default)]
pub struct StoreOverrides {
    pub idle_timeout_ms: Option<u64>,
    pub sweep_interval_ms: Option<u64>,
}

impl FileConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config")
    }
}

/// Load a config file from disk.
pub fn load_config_file(path: &Path) -> Result<FileConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    FileConfig::from_toml(&contents)
        .with_context(|| format!("in config file '{}'", path.display()))
}

/// Layer file values and overrides on top of the defaults.
///
/// The result is not validated here; the store rejects unusable values when
/// it is built.
pub fn resolve_store_config(file: &FileConfig, overrides: &StoreOverrides) -> StoreConfig {
    let mut config = StoreConfig::default();

    if let Some(ms) = overrides.idle_timeout_ms.or(file.store.idle_timeout_ms) {
        config = config.with_idle_timeout(Duration::from_millis(ms));
    }
    if let Some(ms) = overrides.sweep_interval_ms.or(file.store.sweep_interval_ms) {
        config = config.with_sweep_interval(Duration::from_millis(ms));
    }
    if let Some(enabled) = file.store.sweeper {
        config = config.with_sweeper(enabled);
    }

    config
}
