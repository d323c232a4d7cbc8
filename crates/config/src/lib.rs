#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for kiln
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/kiln/config.toml)
//! - Environment variables (`KILN_*`)
//! - CLI flags (applied by the binary)

pub mod constants;

use constants::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_GIT, DEFAULT_SHELL, ENV_FETCH_TIMEOUT, ENV_GIT,
    ENV_KEEP_WORK_DIR, ENV_LOG_DIR, ENV_SHELL, ENV_WORK_ROOT, SCRATCH_DIR_NAME,
};
use kiln_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Build execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Parent directory of per-formula working directories
    #[serde(default = "default_work_root")]
    pub work_root: PathBuf,
    /// Keep the working directory after a successful run
    #[serde(default)]
    pub keep_work_dir: bool,
    /// Shell used to run each step (`<shell> -c <command>`)
    #[serde(default = "default_shell")]
    pub shell: String,
}

/// Source fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_git")]
    pub git: String,
    /// Timeout in seconds for a single download or clone
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Where `--debug` writes JSON log files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            work_root: default_work_root(),
            keep_work_dir: false,
            shell: default_shell(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(SCRATCH_DIR_NAME)
}

fn default_work_root() -> PathBuf {
    scratch_dir().join("work")
}

fn default_log_dir() -> PathBuf {
    scratch_dir().join("logs")
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_git() -> String {
    DEFAULT_GIT.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("kiln/{}", env!("CARGO_PKG_VERSION"))
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("kiln").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml(contents: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work
    ///
    /// # Errors
    ///
    /// Returns an error if the fetch timeout is zero or the shell is blank.
    pub fn validate(&self) -> Result<(), Error> {
        if self.fetch.timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "fetch.timeout".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.build.shell.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "build.shell".to_string(),
                value: self.build.shell.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Load configuration with fallback to defaults
    ///
    /// An explicitly given path must exist; the default path is optional.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = path {
            return Self::load_from_file(path).await;
        }

        match Self::default_path() {
            Ok(default) if fs::try_exists(&default).await.unwrap_or(false) => {
                tracing::debug!(path = %default.display(), "loading configuration");
                Self::load_from_file(&default).await
            }
            _ => Ok(Self::default()),
        }
    }

    /// Merge `KILN_*` environment variables into the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be parsed.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Merge variables obtained from `lookup` into the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be parsed.
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup(ENV_WORK_ROOT) {
            self.build.work_root = PathBuf::from(root);
        }

        if let Some(keep) = lookup(ENV_KEEP_WORK_DIR) {
            self.build.keep_work_dir = parse_bool(ENV_KEEP_WORK_DIR, keep)?;
        }

        if let Some(shell) = lookup(ENV_SHELL) {
            if shell.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: ENV_SHELL.to_string(),
                    value: shell,
                }
                .into());
            }
            self.build.shell = shell;
        }

        if let Some(git) = lookup(ENV_GIT) {
            self.fetch.git = git;
        }

        if let Some(timeout) = lookup(ENV_FETCH_TIMEOUT) {
            self.fetch.timeout = match timeout.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: ENV_FETCH_TIMEOUT.to_string(),
                        value: timeout,
                    }
                    .into())
                }
            };
        }

        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.logging.log_dir = PathBuf::from(dir);
        }

        Ok(())
    }
}

fn parse_bool(field: &str, value: String) -> Result<bool, Error> {
    match value.as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()),
    }
}
