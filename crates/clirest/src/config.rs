//! Configuration management for clirest

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the listen address
pub const LISTEN_ENV: &str = "CLIREST_LISTEN";

/// Default paths
fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("clirest")
}

/// Get the configuration file path
pub fn get_config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// clirest configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path prefix for command routes
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

fn default_listen() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl Config {
    /// Apply environment overrides
    pub fn with_env(mut self) -> Self {
        if let Ok(listen) = std::env::var(LISTEN_ENV) {
            if !listen.trim().is_empty() {
                self.listen = listen.trim().to_string();
            }
        }
        self
    }

    /// Route path for a command under the configured prefix
    pub fn route_for(&self, command: &str) -> String {
        format!("{}/{}", self.api_prefix, command)
    }
}

/// Normalize a route prefix: leading slash, no trailing slash, "" for root
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Parse configuration text; an empty document yields the defaults
pub fn parse_config(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    let mut config: Config =
        serde_yaml::from_str(content).context("Failed to parse config as YAML")?;
    config.api_prefix = normalize_prefix(&config.api_prefix);
    Ok(config)
}

/// Read configuration from a file
pub fn read_config_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config in {}", path.display()))
}

/// Load configuration.
///
/// An explicit path must exist. Without one, the default location is used
/// when present and the built-in defaults otherwise. Environment overrides
/// are applied last.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            read_config_file(path)?
        }
        None => {
            let default_path = get_config_path();
            if default_path.exists() {
                read_config_file(&default_path)?
            } else {
                Config::default()
            }
        }
    };

    Ok(config.with_env())
}
