//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and the
//! environment, and merging configurations with proper precedence rules.

use crate::error::TrailsError;
use crate::types::OutputMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [securitytrails]
/// key = "..."
///
/// [defaults]
/// threads = 4
/// output = "json"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// API credentials and endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub securitytrails: Option<ApiSection>,

    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// The `[securitytrails]` table.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Default worker count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Default submit batch size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// Default output format ("list" or "json")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Default request timeout (as string, e.g., "30s", "2m", "0" to disable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Override for `$XDG_CONFIG_HOME`/`$HOME` lookups, mainly for tests
    config_home: Option<PathBuf>,
    /// Directory searched for a local `haktrails.toml`
    working_dir: PathBuf,
}

impl ConfigManager {
    /// Create a configuration manager using the process environment.
    pub fn new() -> Self {
        Self {
            config_home: None,
            working_dir: PathBuf::from("."),
        }
    }

    /// Create a manager rooted at explicit directories.
    pub fn with_dirs<H: Into<PathBuf>, W: Into<PathBuf>>(config_home: H, working_dir: W) -> Self {
        Self {
            config_home: Some(config_home.into()),
            working_dir: working_dir.into(),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, TrailsError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TrailsError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            TrailsError::config(format!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            TrailsError::config(format!(
                "Failed to parse TOML configuration '{}': {}",
                path.display(),
                e
            ))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// The XDG config is loaded first and the local `./haktrails.toml` is
    /// merged on top of it. Unreadable candidates are skipped.
    pub fn discover_and_load(&self) -> FileConfig {
        let mut merged_config = FileConfig::default();

        let candidates = [self.get_xdg_config_path(), self.get_local_config_path()];
        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    tracing::debug!("loaded config file {}", path.display());
                    merged_config = self.merge_configs(merged_config, config);
                }
                Err(e) => tracing::debug!("skipping config file {}: {}", path.display(), e),
            }
        }

        merged_config
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["haktrails.toml", ".haktrails.toml"];

        candidates
            .iter()
            .map(|candidate| self.working_dir.join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    ///
    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = match &self.config_home {
            Some(dir) => dir.clone(),
            None => env::var_os("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?,
        };

        let path = config_dir.join("haktrails").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            securitytrails: match (lower.securitytrails, higher.securitytrails) {
                (Some(mut lower_api), Some(higher_api)) => {
                    if higher_api.key.is_some() {
                        lower_api.key = higher_api.key;
                    }
                    if higher_api.base_url.is_some() {
                        lower_api.base_url = higher_api.base_url;
                    }
                    Some(lower_api)
                }
                (lower_api, higher_api) => higher_api.or(lower_api),
            },
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.threads.is_some() {
                        lower_defaults.threads = higher_defaults.threads;
                    }
                    if higher_defaults.batch_size.is_some() {
                        lower_defaults.batch_size = higher_defaults.batch_size;
                    }
                    if higher_defaults.output.is_some() {
                        lower_defaults.output = higher_defaults.output;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), TrailsError> {
        if let Some(defaults) = &config.defaults {
            if defaults.threads == Some(0) {
                return Err(TrailsError::config("threads must be at least 1"));
            }

            if defaults.batch_size == Some(0) {
                return Err(TrailsError::config("batch_size must be at least 1"));
            }

            if let Some(output) = &defaults.output {
                output.parse::<OutputMode>()?;
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(TrailsError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration values read from the environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub threads: Option<usize>,
    pub batch_size: Option<usize>,
    pub output: Option<OutputMode>,
    pub timeout: Option<Duration>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Build from an arbitrary variable lookup. Invalid values are ignored
    /// with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut env_config = EnvConfig {
            api_key: non_empty("SECURITYTRAILS_KEY"),
            base_url: non_empty("HAKTRAILS_BASE_URL"),
            config: non_empty("HAKTRAILS_CONFIG"),
            ..Default::default()
        };

        if let Some(val) = non_empty("HAKTRAILS_THREADS") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => env_config.threads = Some(n),
                _ => tracing::warn!("ignoring invalid HAKTRAILS_THREADS='{}', must be >= 1", val),
            }
        }

        if let Some(val) = non_empty("HAKTRAILS_BATCH_SIZE") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => env_config.batch_size = Some(n),
                _ => tracing::warn!(
                    "ignoring invalid HAKTRAILS_BATCH_SIZE='{}', must be >= 1",
                    val
                ),
            }
        }

        if let Some(val) = non_empty("HAKTRAILS_OUTPUT") {
            match val.parse::<OutputMode>() {
                Ok(mode) => env_config.output = Some(mode),
                Err(_) => tracing::warn!("ignoring invalid HAKTRAILS_OUTPUT='{}', use list/json", val),
            }
        }

        if let Some(val) = non_empty("HAKTRAILS_TIMEOUT") {
            match parse_timeout_string(&val) {
                Some(timeout) => env_config.timeout = Some(timeout),
                None => tracing::warn!(
                    "ignoring invalid HAKTRAILS_TIMEOUT='{}', use format like '30s', '2m'",
                    val
                ),
            }
        }

        env_config
    }
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    EnvConfig::from_lookup(|name| env::var(name).ok())
}

/// Parse a timeout string like "5s", "30s", "2m" into a duration.
///
/// A bare number is taken as seconds; `0` means no timeout.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let secs = if let Some(s) = timeout_str.strip_suffix('s') {
        s.parse::<u64>().ok()
    } else if let Some(m) = timeout_str.strip_suffix('m') {
        m.parse::<u64>().ok().map(|m| m * 60)
    } else {
        timeout_str.parse::<u64>().ok()
    }?;

    Some(Duration::from_secs(secs))
}
