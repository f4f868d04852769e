use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub wizard: WizardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote activity API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the activity API (e.g. "https://api.example.com/v1")
    pub base_url: String,
    /// Name of the environment variable holding the bearer token
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_token_env() -> String {
    "EVENT_WIZARD_API_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("event-wizard/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding wizard progress and logs
    pub state: String,
}

/// Durable progress record settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Record name; progress is written to `<paths.state>/<key>.json`
    #[serde(default = "default_storage_key")]
    pub key: String,
}

fn default_storage_key() -> String {
    "create-event".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_storage_key(),
        }
    }
}

/// Wizard behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WizardConfig {
    /// Refuse navigation to step identifiers the wizard does not know.
    /// Off by default: unknown steps are accessible.
    #[serde(default)]
    pub strict_step_keys: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write logs to `<paths.state>/logs` instead of stderr
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

impl Config {
    /// Path to the project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(".event-wizard/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the wizard works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // User config in ~/.config/event-wizard/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("event-wizard").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with EVENT_WIZARD_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("EVENT_WIZARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Save config to `.event-wizard/config.toml`
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::local_config_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config as TOML at `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_str =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        std::fs::write(path, toml_str)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }

    /// File the progress record is persisted to
    pub fn progress_file(&self) -> PathBuf {
        self.state_path().join(format!("{}.json", self.storage.key))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            paths: PathsConfig {
                state: ".event-wizard".to_string(), // Relative to cwd
            },
            storage: StorageConfig::default(),
            wizard: WizardConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.key, "create-event");
        assert_eq!(config.api.token_env, "EVENT_WIZARD_API_TOKEN");
        assert!(!config.wizard.strict_step_keys);
        assert!(!config.logging.to_file);
    }

    #[test]
    fn test_progress_file_under_state_path() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.state = temp_dir.path().to_string_lossy().to_string();

        assert_eq!(
            config.progress_file(),
            temp_dir.path().join("create-event.json")
        );
        assert!(config.logs_path().starts_with(temp_dir.path()));
    }

    #[test]
    fn test_relative_state_path_is_absolutized() {
        let config = Config::default();
        assert!(config.state_path().is_absolute());
        assert!(config.state_path().ends_with(".event-wizard"));
    }

    #[test]
    fn test_load_explicit_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("wizard.toml");
        std::fs::write(
            &path,
            r#"
[api]
base_url = "https://tickets.example.com/api"
timeout_secs = 5

[wizard]
strict_step_keys = true
"#,
        )
        .unwrap();

        let config = Config::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(config.api.base_url, "https://tickets.example.com/api");
        assert_eq!(config.api.timeout_secs, 5);
        assert!(config.wizard.strict_step_keys);
        // untouched sections keep their defaults
        assert_eq!(config.storage.key, "create-event");
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.api.base_url = "https://tickets.example.com/api".to_string();
        config.storage.key = "draft".to_string();
        config.wizard.strict_step_keys = true;
        config.save_to(&path).unwrap();

        let toml_str = std::fs::read_to_string(&path).unwrap();
        assert!(toml_str.contains("[api]"));

        let loaded = Config::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(loaded.api.base_url, "https://tickets.example.com/api");
        assert_eq!(loaded.storage.key, "draft");
        assert!(loaded.wizard.strict_step_keys);
    }
}
