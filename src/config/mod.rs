//! Configuration loading.
//!
//! The config file is TOML. A missing file yields defaults; unknown keys are
//! collected and otherwise ignored. Loading usually happens before logging is
//! set up, so callers warn about them with [`warn_ignored_keys`] afterwards.

mod schema;

pub use schema::{
    Config, DatabaseConfig, LoggingConfig, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_POOL_SIZE,
};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.toml";

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "catcurious", "account-store")
}

impl Config {
    /// Platform default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from `path`, or from [`Config::default_path`] when `None`.
    ///
    /// An explicit path must exist; the default path may be absent. Unknown
    /// keys are dropped silently; use [`Config::load_reporting_ignored`] to see them.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_reporting_ignored(path).map(|(config, _)| config)
    }

    /// Like [`Config::load`], also returning the dotted paths of unknown keys.
    pub fn load_reporting_ignored(path: Option<&Path>) -> Result<(Self, Vec<String>)> {
        let (path, required) = match path {
            Some(p) => (PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok((Self::default(), Vec::new())),
            },
        };

        if !path.exists() {
            if required {
                bail!("Config file not found: {}", path.display());
            }
            return Ok((Self::default(), Vec::new()));
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::parse_toml(&raw).with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Self::parse_toml(raw).map(|(config, _)| config)
    }

    /// Parse and validate a TOML document, returning unknown key paths
    /// (`database.shards`, `metrics`) alongside the config.
    pub fn parse_toml(raw: &str) -> Result<(Self, Vec<String>)> {
        let table: toml::Table = toml::from_str(raw)?;
        let mut ignored = Vec::new();
        let config: Self = serde_ignored::deserialize(toml::Value::Table(table), |path| {
            ignored.push(path.to_string());
        })?;
        config.validate()?;
        Ok((config, ignored))
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.pool_size == 0 {
            bail!("database.pool_size must be at least 1");
        }
        if self.database.path.trim().is_empty() {
            bail!("database.path cannot be empty");
        }
        Ok(())
    }

    /// JSON Schema of the config file, for editors and validation tooling.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Config)).unwrap_or_default()
    }
}

/// Emit one warning per unknown config key. Call after logging is initialised.
pub fn warn_ignored_keys(keys: &[String]) {
    for key in keys {
        tracing::warn!(key = %key, "Ignoring unknown config key");
    }
}
