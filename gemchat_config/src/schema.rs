use gemchat_core::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Environment variable overriding `provider.model`.
pub const MODEL_ENV: &str = "GEMCHAT_MODEL";
/// Environment variable overriding `server.bind`.
pub const BIND_ENV: &str = "GEMCHAT_BIND";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "ProviderConfig::default_model")]
    pub model: String,
    #[serde(default = "ProviderConfig::default_base_url")]
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: Self::default_model(),
            base_url: Self::default_base_url(),
        }
    }
}

impl ProviderConfig {
    fn default_model() -> String {
        "gemini-1.5-pro".to_string()
    }

    fn default_base_url() -> String {
        "https://generativelanguage.googleapis.com".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
        }
    }
}

impl ServerConfig {
    fn default_bind() -> String {
        "127.0.0.1:5000".to_string()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigurationError> {
        self.bind
            .parse()
            .map_err(|e| ConfigurationError::InvalidValue {
                field: "server.bind",
                reason: format!("{e}"),
            })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "RetryConfig::default_rate_limit_delay_secs")]
    pub rate_limit_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            rate_limit_delay_secs: Self::default_rate_limit_delay_secs(),
        }
    }
}

impl RetryConfig {
    const fn default_max_attempts() -> u32 {
        3
    }

    const fn default_rate_limit_delay_secs() -> u64 {
        15
    }

    #[must_use]
    pub const fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs(self.rate_limit_delay_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sessions untouched for this long are dropped.
    #[serde(default = "SessionConfig::default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    #[serde(default = "SessionConfig::default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: Self::default_idle_ttl_secs(),
            sweep_interval_secs: Self::default_sweep_interval_secs(),
        }
    }
}

impl SessionConfig {
    const fn default_idle_ttl_secs() -> u64 {
        24 * 60 * 60
    }

    const fn default_sweep_interval_secs() -> u64 {
        5 * 60
    }

    #[must_use]
    pub const fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Config {
    /// Directory holding `config.json`, `~/gemchat`.
    pub fn config_dir() -> Result<PathBuf, ConfigurationError> {
        dirs::home_dir()
            .map(|home| home.join("gemchat"))
            .ok_or_else(|| ConfigurationError::InvalidValue {
                field: "home",
                reason: "Cannot find home directory".to_string(),
            })
    }

    /// Load the config file if it exists, then apply process environment
    /// overrides and validate.
    pub fn load() -> Result<Self, ConfigurationError> {
        let config_path = Self::config_dir()?.join("config.json");

        let mut config = if config_path.exists() {
            info!("Loading config from {}", config_path.display());
            Self::from_json(&std::fs::read_to_string(&config_path)?)?
        } else {
            info!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Overlay values from an environment lookup. Blank values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = get(MODEL_ENV) {
            self.provider.model = model;
        }
        if let Some(bind) = get(BIND_ENV) {
            self.server.bind = bind;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.session.sweep_interval_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "session.sweep_interval_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.provider.model.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: "provider.model",
                reason: "must not be empty".to_string(),
            });
        }
        self.server.bind_addr()?;
        Ok(())
    }

    /// The API key, which must be present and non-blank.
    pub fn require_api_key(&self) -> Result<&str, ConfigurationError> {
        self.provider
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigurationError::MissingApiKey(API_KEY_ENV))
    }

    pub fn ensure_config_dir() -> Result<PathBuf, ConfigurationError> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    /// Write the config template to `~/gemchat/config.json`.
    pub fn create_config() -> Result<PathBuf, ConfigurationError> {
        let config_path = Self::ensure_config_dir()?.join("config.json");

        if config_path.exists() {
            return Err(ConfigurationError::InvalidValue {
                field: "config.json",
                reason: format!(
                    "Config file already exists at: {}. Please edit it directly.",
                    config_path.display()
                ),
            });
        }

        let config_template = r#"{
  "provider": {
    "model": "gemini-1.5-pro",
    "base_url": "https://generativelanguage.googleapis.com"
  },
  "server": {
    "bind": "127.0.0.1:5000"
  },
  "retry": {
    "max_attempts": 3,
    "rate_limit_delay_secs": 15
  },
  "session": {
    "idle_ttl_secs": 86400,
    "sweep_interval_secs": 300
  }
}"#;

        std::fs::write(&config_path, config_template)?;
        Ok(config_path)
    }
}
