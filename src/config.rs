use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use quotedeck_core::remote::{DEFAULT_FETCH_LIMIT, DEFAULT_SERVER_URL};
use quotedeck_core::sync::DEFAULT_SYNC_INTERVAL;
use quotedeck_core::ConflictPolicy;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Sync behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Sync after write commands (default: false)
    pub auto_sync: bool,
    /// Seconds between cycles in `sync watch`
    pub interval_secs: u64,
    /// What to do with conflicting edits
    pub conflict_policy: ConflictPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_sync: false,
            interval_secs: DEFAULT_SYNC_INTERVAL.as_secs(),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the persistent quote store
    pub data_dir: ConfigValue<PathBuf>,
    /// Base URL of the remote posts endpoint
    pub server_url: ConfigValue<String>,
    /// Number of remote items requested per fetch
    pub fetch_limit: usize,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub sync: SyncConfig,
}

/// `remote:` section of the config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RemoteFile {
    server_url: Option<String>,
    fetch_limit: Option<usize>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    remote: Option<RemoteFile>,
    sync: Option<SyncConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut server_url = ConfigValue::new(DEFAULT_SERVER_URL.to_string(), ConfigSource::Default);
        let mut fetch_limit = DEFAULT_FETCH_LIMIT;
        let mut config_file = None;
        let mut sync = SyncConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(remote) = file_config.remote {
                if let Some(url) = remote.server_url {
                    server_url = ConfigValue::new(url, ConfigSource::File);
                }
                if let Some(limit) = remote.fetch_limit {
                    fetch_limit = limit;
                }
            }
            if let Some(sync_config) = file_config.sync {
                sync = sync_config;
            }
        }

        if let Ok(dir) = std::env::var("QUOTEDECK_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("QUOTEDECK_SERVER_URL") {
            server_url = ConfigValue::new(url, ConfigSource::Environment);
        }

        Ok(Self {
            data_dir,
            server_url,
            fetch_limit,
            config_file,
            sync,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/quotedeck/
    /// - macOS: ~/Library/Application Support/quotedeck/
    /// - Windows: %APPDATA%/quotedeck/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quotedeck")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/quotedeck/
    /// - macOS: ~/Library/Application Support/quotedeck/
    /// - Windows: %APPDATA%/quotedeck/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("quotedeck")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }

    /// Session-scoped state (the last displayed quote) lives under the OS
    /// temp directory so it does not outlive the login session.
    pub fn session_dir() -> PathBuf {
        std::env::temp_dir().join("quotedeck-session")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
