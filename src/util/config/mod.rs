//! Runtime configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. `--config <FILE>` on the command line
//! 2. MICROTASK_PROMISE_CONFIG environment variable
//! 3. User-level (~/.config/microtask-promise/config.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use microtask_promise::util::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_toml_str("[queue]\ncapacity = 64\n").unwrap();
//! assert_eq!(config.queue.capacity, 64);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::runtime::promise::PromiseConfig;
use crate::runtime::scheduler::QueueConfig;
use crate::util::logger::LogLevel;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "MICROTASK_PROMISE_CONFIG";

const APP_DIR: &str = "microtask-promise";

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Microtask queue settings
    #[serde(default)]
    pub queue: QueueConfig,
    /// Promise realm settings
    #[serde(default)]
    pub promise: PromiseConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level printed
    #[serde(default)]
    pub level: LogLevel,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl RuntimeConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory on Unix
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join(APP_DIR));
    }

    // Fallback to ~/.config/microtask-promise
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join(APP_DIR));
    }

    // On Windows, try %APPDATA%
    if let Ok(appdata) = std::env::var("APPDATA") {
        return Some(PathBuf::from(appdata).join(APP_DIR));
    }

    None
}

/// Get the user config file path
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Load a config file.
pub fn load_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    RuntimeConfig::from_toml_str(&content)
}

/// Write a config file, creating its directory if needed.
pub fn save_config(
    path: &Path,
    config: &RuntimeConfig,
) -> Result<(), ConfigError> {
    let io_error = |source: std::io::Error| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(io_error)?;
        }
    }

    let content = config.to_toml_string()?;
    fs::write(path, content).map_err(io_error)
}

/// Resolve the effective configuration.
///
/// An explicit path or one named by the environment must exist; the user
/// file is optional.
pub fn resolve_config(explicit: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config from command line");
        return load_config(path);
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        let path = PathBuf::from(path);
        debug!(path = %path.display(), "loading config from {}", CONFIG_ENV);
        return load_config(&path);
    }

    match get_config_path() {
        Some(path) if path.exists() => {
            debug!(path = %path.display(), "loading user config");
            load_config(&path)
        }
        _ => Ok(RuntimeConfig::default()),
    }
}
