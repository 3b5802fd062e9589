//! Runtime configuration
//!
//! Layers, lowest to highest precedence: built-in defaults, an optional
//! YAML/JSON/TOML file, then `HEALWRIGHT__SECTION__KEY` environment variables.

use action_locator::ResolveOptions;
use cdp_adapter::BrowserSettings;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `HEALWRIGHT__STORE__BACKEND=sqlite`
pub const ENV_PREFIX: &str = "HEALWRIGHT";

const APP_DIR: &str = "healwright";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealConfig {
    pub resolution: ResolutionSettings,
    pub store: StoreSettings,
    pub browser: BrowserSettings,
    pub logging: LoggingSettings,
    pub runner: RunnerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionSettings {
    pub max_retries: u32,
    pub per_candidate_timeout_ms: u64,
    pub retry_backoff_ms: u64,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        let defaults = ResolveOptions::default();
        Self {
            max_retries: defaults.max_retries,
            per_candidate_timeout_ms: defaults.per_candidate_timeout.as_millis() as u64,
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
        }
    }
}

impl ResolutionSettings {
    pub fn to_options(&self) -> ResolveOptions {
        ResolveOptions::default()
            .with_max_retries(self.max_retries)
            .with_per_candidate_timeout(Duration::from_millis(self.per_candidate_timeout_ms))
            .with_retry_backoff(Duration::from_millis(self.retry_backoff_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, forgotten on exit
    Memory,
    /// Single JSON document
    Json,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Defaults to a file under the user data directory
    pub path: Option<PathBuf>,
}

impl StoreSettings {
    /// Storage location for file-backed stores
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        let file = match self.backend {
            StoreBackend::Json => "selectors.json",
            _ => "selectors.db",
        };
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join(file)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Upper bound for one test case; unbounded when unset
    pub test_timeout_ms: Option<u64>,
}

impl RunnerSettings {
    pub fn test_timeout(&self) -> Option<Duration> {
        self.test_timeout_ms.map(Duration::from_millis)
    }
}

/// Configuration together with the file it was read from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: HealConfig,
    pub path: PathBuf,
    /// Whether `path` existed when loading
    pub from_file: bool,
}

/// `./config/healwright.yaml` if present, else `<config_dir>/healwright/config.yaml`
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from("config").join(format!("{APP_DIR}.yaml"));
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.yaml")
}

/// Load configuration from `path` (or the default location) plus the environment
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    let from_file = path.exists();

    let config = Config::builder()
        .add_source(Config::try_from(&HealConfig::default())?)
        .add_source(File::from(path.as_path()).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<HealConfig>()?;

    Ok(LoadedConfig {
        config,
        path,
        from_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;

    #[test]
    fn defaults_match_engine_defaults() {
        let config = HealConfig::default();
        assert_eq!(config.resolution.to_options(), ResolveOptions::default());
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.logging.level, "info");
        assert!(config.runner.test_timeout().is_none());
    }

    #[test]
    #[serial]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healwright.yaml");
        fs::write(
            &path,
            "resolution:\n  max_retries: 1\nstore:\n  backend: json\n  path: /tmp/sel.json\nbrowser:\n  headless: false\n",
        )
        .unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert!(loaded.from_file);
        assert_eq!(loaded.config.resolution.max_retries, 1);
        assert_eq!(loaded.config.resolution.retry_backoff_ms, 1000);
        assert_eq!(loaded.config.store.backend, StoreBackend::Json);
        assert_eq!(
            loaded.config.store.resolved_path(),
            PathBuf::from("/tmp/sel.json")
        );
        assert!(!loaded.config.browser.headless);
        assert_eq!(loaded.config.browser.window_width, 1280);
    }

    #[test]
    #[serial]
    fn environment_beats_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("healwright.yaml");
        fs::write(&path, "resolution:\n  max_retries: 1\n").unwrap();

        env::set_var("HEALWRIGHT__RESOLUTION__MAX_RETRIES", "7");
        env::set_var("HEALWRIGHT__STORE__BACKEND", "memory");
        let loaded = load_config(Some(&path));
        env::remove_var("HEALWRIGHT__RESOLUTION__MAX_RETRIES");
        env::remove_var("HEALWRIGHT__STORE__BACKEND");

        let config = loaded.unwrap().config;
        assert_eq!(config.resolution.max_retries, 7);
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    #[serial]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_config(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert!(!loaded.from_file);
        assert_eq!(loaded.config, HealConfig::default());
    }

    #[test]
    fn default_store_paths_follow_backend() {
        let json = StoreSettings {
            backend: StoreBackend::Json,
            path: None,
        };
        assert!(json.resolved_path().ends_with("healwright/selectors.json"));
        assert!(StoreSettings::default()
            .resolved_path()
            .ends_with("healwright/selectors.db"));
    }
}
