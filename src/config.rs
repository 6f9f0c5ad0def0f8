//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - PollingConfig: How often the fetch loop calls the weather provider.
//!     - StorageConfig: Where the history file lives and how many readings it keeps.
//!     - ProviderConfig: Weather provider base url and request timeout.
//!     - ServerConfig: Bind address for the read api.
//!     - LoggingConfig: Default log level and per-reading output.
//!     - AuthConfig: Bearer tokens and the authorities they carry.
//!
//! every section is optional; a missing section takes its defaults.
//!
//! ==============================================================================

use crate::domain::Authority;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "SENSOR_HUB_CONFIG";

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    pub polling: PollingConfig,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_seconds: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub max_entries: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data").join("history.json"),
            max_entries: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.open-meteo.com".to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_readings: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_readings: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: Vec<TokenEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenEntry {
    pub token: String,
    #[serde(default)]
    pub authorities: Vec<Authority>,
}

/// where the active configuration came from
#[derive(Debug)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// outcome of searching the candidate config paths
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: HostConfig,
    pub source: ConfigSource,
    /// files that existed but failed to load, with the reason
    pub skipped: Vec<(PathBuf, String)>,
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        Ok(config)
    }

    /// Load with default fallback
    ///
    /// tries `$SENSOR_HUB_CONFIG`, then `config/host.toml`, then
    /// `../config/host.toml`. logging is not up yet when this runs, so the
    /// outcome is returned for the caller to report.
    pub fn load_or_default() -> LoadedConfig {
        let mut paths = Vec::new();
        if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("config").join("host.toml"));
        paths.push(PathBuf::from("..").join("config").join("host.toml"));

        Self::load_first(&paths)
    }

    /// first candidate that loads wins; a file that fails to load is
    /// recorded and the search moves on to the next one
    pub fn load_first(paths: &[PathBuf]) -> LoadedConfig {
        let mut skipped = Vec::new();

        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::load(path) {
                Ok(config) => {
                    return LoadedConfig {
                        config,
                        source: ConfigSource::File(path.clone()),
                        skipped,
                    }
                }
                Err(e) => skipped.push((path.clone(), format!("{:#}", e))),
            }
        }

        LoadedConfig {
            config: Self::default(),
            source: ConfigSource::Defaults,
            skipped,
        }
    }

    /// reject values the runtime cannot work with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.polling.interval_seconds == 0 {
            bail!("polling.interval_seconds must be greater than zero");
        }
        if self.storage.max_entries == 0 {
            bail!("storage.max_entries must be greater than zero");
        }
        if self.provider.timeout_seconds == 0 {
            bail!("provider.timeout_seconds must be greater than zero");
        }
        if self.auth.tokens.iter().any(|t| t.token.trim().is_empty()) {
            bail!("auth.tokens entries must have a non-empty token");
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_seconds)
    }

    /// Log configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            interval_seconds = self.polling.interval_seconds,
            history = %self.storage.path.display(),
            max_entries = self.storage.max_entries,
            provider = %self.provider.base_url,
            bind = %self.server.bind,
            tokens = self.auth.tokens.len(),
            "host configuration"
        );
        if self.auth.tokens.is_empty() {
            tracing::warn!("no auth tokens configured; every sensor api call will be rejected");
        }
    }
}
