//! Configuration types and loading
//!
//! Configuration lives in a YAML file (default `~/.config/popcorn/config.yaml`,
//! overridable with `--config`). The one hard requirement is the gateway API
//! key: it is resolved at startup from an env var or a key file, and its
//! absence is a fatal startup condition, not recoverable at runtime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Default env var holding the API key
const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API key not found: env var {env} is unset and no api-key-file is configured")]
    MissingApiKey { env: String },

    #[error("Failed to read API key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub gateway: GatewayConfig,
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR); CLI flag wins over this
    pub log_level: Option<String>,
}

/// Remote gateway settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct GatewayConfig {
    /// Env var checked first for the API key
    pub api_key_env: String,
    /// Fallback file containing the API key
    pub api_key_file: Option<PathBuf>,
    /// Model for decomposition and text execution
    pub model: String,
    /// Model for image execution
    pub image_model: String,
    pub base_url: String,
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_key_file: None,
            model: "gemini-2.5-flash".to_string(),
            image_model: "gemini-3-pro-image-preview".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_ms: 120_000,
        }
    }
}

/// Gateway configuration with the API key materialized
#[derive(Debug, Clone)]
pub struct ResolvedGatewayConfig {
    pub api_key: String,
    pub model: String,
    pub image_model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GatewayConfig {
    /// Materialize the API key and produce a resolved config
    ///
    /// Checks the env var first, then the key file. Fails when neither
    /// yields a non-empty key.
    pub fn resolve(&self) -> Result<ResolvedGatewayConfig, ConfigError> {
        debug!(env = %self.api_key_env, file = ?self.api_key_file, "GatewayConfig::resolve");
        let api_key = self.get_api_key()?;
        Ok(ResolvedGatewayConfig {
            api_key,
            model: self.model.clone(),
            image_model: self.image_model.clone(),
            base_url: self.base_url.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
        })
    }

    fn get_api_key(&self) -> Result<String, ConfigError> {
        if let Ok(key) = std::env::var(&self.api_key_env)
            && !key.trim().is_empty()
        {
            debug!(env = %self.api_key_env, "get_api_key: found in env");
            return Ok(key.trim().to_string());
        }

        if let Some(path) = &self.api_key_file {
            let key = std::fs::read_to_string(path).map_err(|source| ConfigError::KeyFile {
                path: path.clone(),
                source,
            })?;
            debug!(path = %path.display(), "get_api_key: found in key file");
            return Ok(key.trim().to_string());
        }

        Err(ConfigError::MissingApiKey {
            env: self.api_key_env.clone(),
        })
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("popcorn")
            .join("config.yaml")
    }

    /// User prompt override directory (see [`crate::prompts::PromptLoader`])
    pub fn prompts_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("popcorn")
            .join("prompts")
    }

    /// Load configuration from an explicit or the default path
    ///
    /// An explicit path must exist; a missing default path just means
    /// defaults.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(explicit) => {
                debug!(path = %explicit.display(), "Config::load: explicit path");
                let text = std::fs::read_to_string(explicit)
                    .with_context(|| format!("Failed to read config file {}", explicit.display()))?;
                serde_yaml::from_str(&text)
                    .with_context(|| format!("Failed to parse config file {}", explicit.display()))
            }
            None => {
                let default = Self::default_path();
                if default.exists() {
                    debug!(path = %default.display(), "Config::load: default path exists");
                    let text = std::fs::read_to_string(&default)
                        .with_context(|| format!("Failed to read config file {}", default.display()))?;
                    serde_yaml::from_str(&text)
                        .with_context(|| format!("Failed to parse config file {}", default.display()))
                } else {
                    debug!("Config::load: no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Best-effort log level peek before full config load
    ///
    /// Used so logging can be initialized before the config file is parsed
    /// for real; any error here just means "no configured level".
    pub fn load_log_level(path: Option<&PathBuf>) -> Option<String> {
        let candidate = path.cloned().unwrap_or_else(Self::default_path);
        let text = std::fs::read_to_string(candidate).ok()?;
        let config: Config = serde_yaml::from_str(&text).ok()?;
        config.log_level
    }

    /// Fail fast when the gateway cannot be constructed
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.resolve().map(|_| ())
    }
}

/// Log file location under the platform data dir
pub fn log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("popcorn")
        .join("logs")
        .join("popcorn.log")
}

/// Log directory, created on demand at startup
pub fn log_dir() -> PathBuf {
    log_path().parent().map(Path::to_path_buf).unwrap_or_default()
}
