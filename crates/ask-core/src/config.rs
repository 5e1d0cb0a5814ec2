//! Ask Gateway Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::DEFAULT_TOP_K;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Answer engine connection
    pub engine: EngineConfig,

    /// Answer cache configuration
    pub cache: CacheConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError { path, message },
            other => other,
        })
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env()?;
        Ok(self)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<output>"),
            message: e.to_string(),
        })
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.max_top_k".to_string(),
                value: "0".to_string(),
            });
        }
        if self.server.default_top_k == 0 || self.server.default_top_k > self.server.max_top_k {
            return Err(ConfigError::InvalidValue {
                key: "server.default_top_k".to_string(),
                value: self.server.default_top_k.to_string(),
            });
        }
        if self.engine.base_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired("engine.base_url".to_string()));
        }
        if self.engine.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "engine.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (the process environment in production)
    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        // Server
        if let Some(host) = var("ASK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("ASK_PORT") {
            self.server.port = parse_var("ASK_PORT", port)?;
        }
        if let Some(max) = var("ASK_MAX_TOP_K") {
            self.server.max_top_k = parse_var("ASK_MAX_TOP_K", max)?;
        }

        // Engine
        if let Some(kind) = var("ENGINE_KIND") {
            self.engine.kind = kind.parse()?;
        }
        if let Some(url) = var("ENGINE_URL") {
            self.engine.base_url = url;
        }
        if let Some(path) = var("ENGINE_ANSWER_PATH") {
            self.engine.answer_path = path;
        }
        if let Some(secs) = var("ENGINE_TIMEOUT_SECS") {
            self.engine.timeout_secs = parse_var("ENGINE_TIMEOUT_SECS", secs)?;
        }
        if let Some(key) = var("ENGINE_API_KEY") {
            self.engine.api_key = Some(key);
        }

        // Cache
        if let Some(enabled) = var("ANSWER_CACHE_ENABLED") {
            self.cache.enabled = parse_bool("ANSWER_CACHE_ENABLED", &enabled)?;
        }
        if let Some(ttl) = var("ANSWER_CACHE_TTL_SECS") {
            self.cache.ttl_secs = parse_var("ANSWER_CACHE_TTL_SECS", ttl)?;
        }
        if let Some(capacity) = var("ANSWER_CACHE_CAPACITY") {
            self.cache.max_capacity = parse_var("ANSWER_CACHE_CAPACITY", capacity)?;
        }

        // Logging
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = var("LOG_JSON") {
            self.logging.json_format = parse_bool("LOG_JSON", &json)?;
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Row count used when a request omits `top_k`
    pub default_top_k: usize,

    /// Largest accepted `top_k`
    pub max_top_k: usize,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Allowed origins for CORS (empty means any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_size: 1024 * 1024, // 1MB
            default_top_k: DEFAULT_TOP_K,
            max_top_k: 100,
            cors_enabled: true,
            cors_origins: vec![],
        }
    }
}

/// Answer engine connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binding to use
    pub kind: EngineKind,

    /// Base URL of the answer service
    pub base_url: String,

    /// Path of the answer operation, appended to `base_url`
    pub answer_path: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Bearer token sent to the answer service
    pub api_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Remote,
            base_url: "http://localhost:8000".to_string(),
            answer_path: "/answer".to_string(),
            timeout_secs: 60,
            api_key: None,
        }
    }
}

/// Supported engine bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Answer service reached over HTTP
    Remote,
}

impl std::str::FromStr for EngineKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" | "http" => Ok(Self::Remote),
            _ => Err(ConfigError::InvalidValue {
                key: "ENGINE_KIND".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Answer cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache successful answers
    pub enabled: bool,

    /// Maximum number of cached answers
    pub max_capacity: u64,

    /// Time-to-live for cached answers (in seconds)
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_capacity: 1_000,
            ttl_secs: 300,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.default_top_k, 5);
        assert!(!config.cache.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_vars(lookup(&[
                ("ASK_PORT", "9000"),
                ("ENGINE_URL", "http://rag:8000"),
                ("ENGINE_TIMEOUT_SECS", "5"),
                ("ANSWER_CACHE_ENABLED", "true"),
                ("LOG_JSON", "1"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.engine.base_url, "http://rag:8000");
        assert_eq!(config.engine.timeout_secs, 5);
        assert!(config.cache.enabled);
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_vars(lookup(&[("ASK_PORT", "not-a-port")]))
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "ASK_PORT"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 7000

            [engine]
            base_url = "http://engine.internal"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.engine.base_url, "http://engine.internal");
        assert_eq!(config.engine.answer_path, "/answer");
    }

    #[test]
    fn test_toml_output_parses_back() {
        let config = AppConfig::default();
        let rendered = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = AppConfig::default();
        config.server.default_top_k = 200;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.engine.base_url = " ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_engine_kind_parse() {
        assert_eq!("remote".parse::<EngineKind>().unwrap(), EngineKind::Remote);
        assert_eq!("HTTP".parse::<EngineKind>().unwrap(), EngineKind::Remote);
        assert!("local".parse::<EngineKind>().is_err());
    }
}
