//! Configuration
//!
//! Centralized configuration loading for the exchange controller and the
//! HTTP transport, supporting a TOML file at
//! `~/.config/ai-courier/courier.toml`.
//!
//! # Configuration Priority
//!
//! Values are resolved with the following priority (highest first):
//! 1. Environment variables
//! 2. TOML configuration file
//! 3. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [controller]
//! max_timeout_secs = 120
//! max_retries = 3
//! allow_interruption = false
//!
//! [transport]
//! endpoint = "https://inference.example.com/v1/exchange"
//! require_credential = true
//! ```
//!
//! Credentials are never read from the file; set `COURIER_API_KEY` in the
//! environment instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::transport::HttpTransportConfig;

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Controller configuration
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Activity-timeout bound: the longest tolerated silence before the
    /// exchange faults
    pub max_timeout: Duration,
    /// Retry ceiling for consecutive faults
    pub max_retries: u32,
    /// Whether `start` may preempt an active session instead of rejecting
    pub allow_interruption: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_timeout: Duration::from_secs(120),
            max_retries: 3,
            allow_interruption: false,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables
    ///
    /// - `COURIER_MAX_TIMEOUT_SECS`: activity-timeout bound in seconds
    /// - `COURIER_MAX_RETRIES`: retry ceiling
    /// - `COURIER_ALLOW_INTERRUPTION`: "1" or "true" to allow preemption
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_timeout: std::env::var("COURIER_MAX_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map_or(defaults.max_timeout, Duration::from_secs),
            max_retries: std::env::var("COURIER_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            allow_interruption: std::env::var("COURIER_ALLOW_INTERRUPTION")
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(defaults.allow_interruption),
        }
    }

    /// Validate configured values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "max_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bundle of everything the hosting application needs to construct a
/// controller and its reference transport
#[derive(Clone, Debug, Default)]
pub struct CourierConfig {
    /// Controller settings
    pub controller: ControllerConfig,
    /// HTTP transport settings
    pub transport: HttpTransportConfig,
}

/// `[controller]` section of the TOML file
#[derive(Clone, Debug, Default, Deserialize)]
struct ControllerToml {
    max_timeout_secs: Option<u64>,
    max_retries: Option<u32>,
    allow_interruption: Option<bool>,
}

/// `[transport]` section of the TOML file
#[derive(Clone, Debug, Default, Deserialize)]
struct TransportToml {
    endpoint: Option<String>,
    require_credential: Option<bool>,
}

/// Root TOML file schema
#[derive(Clone, Debug, Default, Deserialize)]
struct CourierToml {
    #[serde(default)]
    controller: ControllerToml,
    #[serde(default)]
    transport: TransportToml,
}

/// Get the default configuration file path
///
/// `$XDG_CONFIG_HOME/ai-courier/courier.toml`, typically
/// `~/.config/ai-courier/courier.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ai-courier").join("courier.toml"))
}

/// Load configuration: defaults, then the default-path TOML file (if it
/// exists), then environment variables.
pub fn load_config() -> Result<CourierConfig, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => {
            let config = CourierConfig {
                controller: ControllerConfig::from_env(),
                transport: HttpTransportConfig::from_env(),
            };
            config.controller.validate()?;
            Ok(config)
        }
    }
}

/// Load configuration from a specific TOML file, then apply environment
/// overrides on top.
pub fn load_config_from_path(path: &Path) -> Result<CourierConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let file: CourierToml = toml::from_str(&text)?;

    // File values over defaults
    let file_defaults = ControllerConfig::default();
    let from_file = ControllerConfig {
        max_timeout: file
            .controller
            .max_timeout_secs
            .map_or(file_defaults.max_timeout, Duration::from_secs),
        max_retries: file
            .controller
            .max_retries
            .unwrap_or(file_defaults.max_retries),
        allow_interruption: file
            .controller
            .allow_interruption
            .unwrap_or(file_defaults.allow_interruption),
    };

    let transport_defaults = HttpTransportConfig::default();
    let transport_from_file = HttpTransportConfig {
        endpoint: file
            .transport
            .endpoint
            .unwrap_or(transport_defaults.endpoint),
        require_credential: file
            .transport
            .require_credential
            .unwrap_or(transport_defaults.require_credential),
        api_key: transport_defaults.api_key,
        connect_timeout: transport_defaults.connect_timeout,
    };

    // Environment over file
    let env = ControllerConfig::from_env();
    let controller = ControllerConfig {
        max_timeout: if std::env::var("COURIER_MAX_TIMEOUT_SECS").is_ok() {
            env.max_timeout
        } else {
            from_file.max_timeout
        },
        max_retries: if std::env::var("COURIER_MAX_RETRIES").is_ok() {
            env.max_retries
        } else {
            from_file.max_retries
        },
        allow_interruption: if std::env::var("COURIER_ALLOW_INTERRUPTION").is_ok() {
            env.allow_interruption
        } else {
            from_file.allow_interruption
        },
    };

    let transport_env = HttpTransportConfig::from_env();
    let transport = HttpTransportConfig {
        endpoint: if std::env::var("COURIER_ENDPOINT").is_ok() {
            transport_env.endpoint
        } else {
            transport_from_file.endpoint
        },
        api_key: transport_env.api_key,
        require_credential: if std::env::var("COURIER_REQUIRE_CREDENTIAL").is_ok() {
            transport_env.require_credential
        } else {
            transport_from_file.require_credential
        },
        connect_timeout: transport_from_file.connect_timeout,
    };

    controller.validate()?;
    Ok(CourierConfig {
        controller,
        transport,
    })
}
