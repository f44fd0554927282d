//! Layered application configuration.
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. `~/.config/popcorn/config.toml`
//! 3. `POPCORN_*` environment variables, `__` separating sections
//!    (`POPCORN_CATALOG__API_KEY` -> `catalog.api_key`)

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory name under the platform config/data roots.
pub const APP_DIR: &str = "popcorn";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "POPCORN";
/// Default catalog endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.omdbapi.com/";
/// Storage slot holding the watch-list.
pub const DEFAULT_WATCHLIST_SLOT: &str = "watched";

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Popcorn configuration

[catalog]
base_url = "https://www.omdbapi.com/"
# Request a free key at https://www.omdbapi.com/apikey.aspx
api_key = ""
# timeout_secs = 10

[storage]
# data_dir = "/path/to/popcorn/data"
watchlist_slot = "watched"
"#;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote catalog settings.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Local persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Endpoint and credentials for the movie catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL queried with `s=`/`i=` parameters.
    pub base_url: String,
    /// Access key sent as `apikey`.
    #[serde(default)]
    pub api_key: String,
    /// Optional per-request timeout. Requests run until resolution when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout_secs: None,
        }
    }
}

impl CatalogConfig {
    /// Request timeout, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Whether an access key has been provided.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

/// Where persisted slots live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding slot files and logs.
    pub data_dir: PathBuf,
    /// Slot name for the watch-list.
    pub watchlist_slot: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            watchlist_slot: DEFAULT_WATCHLIST_SLOT.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path(), Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration from `path` (optional) layered under `env`.
    pub fn load_from(path: impl AsRef<Path>, env: Environment) -> Result<Self> {
        let path = path.as_ref();
        let defaults =
            Config::try_from(&AppConfig::default()).context("failed to build default config")?;
        let settings = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).required(false))
            .add_source(
                env.prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to load config {}", path.display()))?;
        settings
            .try_deserialize()
            .context("failed to deserialize configuration")
    }
}

/// Path of the user-level configuration file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Default data directory (`~/.local/share/popcorn` on Linux).
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write a commented default config file when none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(config_path())
}

fn write_default_config(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults_apply_without_file() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("missing.toml"), env(&[]))?;
        assert_eq!(config.catalog.base_url, DEFAULT_BASE_URL);
        assert!(!config.catalog.has_api_key());
        assert_eq!(config.catalog.timeout(), None);
        assert_eq!(config.storage.watchlist_slot, DEFAULT_WATCHLIST_SLOT);
        Ok(())
    }

    #[test]
    fn file_then_env_layering() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[catalog]
api_key = "from-file"
timeout_secs = 5

[storage]
data_dir = "/tmp/popcorn-test"
watchlist_slot = "mine"
"#,
        )?;

        let config = AppConfig::load_from(&path, env(&[]))?;
        assert_eq!(config.catalog.api_key, "from-file");
        assert_eq!(config.catalog.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/popcorn-test"));
        assert_eq!(config.storage.watchlist_slot, "mine");

        let config = AppConfig::load_from(&path, env(&[("POPCORN_CATALOG__API_KEY", "from-env")]))?;
        assert_eq!(config.catalog.api_key, "from-env");
        assert_eq!(config.catalog.base_url, DEFAULT_BASE_URL);
        Ok(())
    }

    #[test]
    fn default_template_is_written_once_and_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path)?;
        assert!(path.exists());

        fs::write(&path, "[catalog]\napi_key = \"kept\"\n")?;
        write_default_config(&path)?;
        assert!(fs::read_to_string(&path)?.contains("kept"));

        fs::write(&path, DEFAULT_CONFIG_TEMPLATE)?;
        let config = AppConfig::load_from(&path, env(&[]))?;
        assert_eq!(config.storage.watchlist_slot, DEFAULT_WATCHLIST_SLOT);
        Ok(())
    }
}
