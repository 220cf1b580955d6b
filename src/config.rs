//! Configuration management for the relay
//!
//! Parses TOML configuration files and provides typed access to settings.
//! Every field has a default, so an empty file (or no file at all) yields a
//! relay pointed at `phi3` on a local Ollama.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Environment variable overriding `ollama.model_id`
pub const MODEL_ID_ENV: &str = "OLLAMA_RELAY_MODEL_ID";

/// Environment variable overriding `ollama.endpoint`
pub const ENDPOINT_ENV: &str = "OLLAMA_RELAY_ENDPOINT";

/// Upper bound for `ollama.timeout_seconds`
const MAX_TIMEOUT_SECONDS: u64 = 600;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Ollama provider configuration
///
/// Fields are private; values are fixed once loaded and validated.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OllamaConfig {
    #[serde(default = "default_model_id")]
    model_id: String,
    #[serde(default = "default_endpoint")]
    endpoint: String,
    /// Per-call HTTP timeout of the provider client
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

impl OllamaConfig {
    /// Get the model identifier sent to Ollama
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Get the Ollama base URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the provider client timeout in seconds
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_model_id() -> String {
    "phi3".to_string()
}

fn default_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Load configuration for the binary
    ///
    /// A missing file is tolerated only when `explicit` is false (the default
    /// path was used); defaults apply in that case. Environment overrides are
    /// applied last and the result is validated again.
    ///
    /// Nothing is logged here: telemetry is configured from the result, so
    /// the returned [`LoadReport`] is logged by the caller afterwards.
    pub fn load<P: AsRef<Path>>(path: P, explicit: bool) -> AppResult<(Self, LoadReport)> {
        let defaults_used = !explicit && !path.as_ref().exists();
        let mut config = if defaults_used {
            Self::default()
        } else {
            Self::from_file(path.as_ref())?
        };

        let overridden = config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        let report = LoadReport {
            path: path.as_ref().display().to_string(),
            defaults_used,
            overridden,
        };
        Ok((config, report))
    }

    /// Apply `OLLAMA_RELAY_*` overrides using `lookup` to read variables
    ///
    /// Returns the names of the variables that were applied.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<&'static str>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();
        if let Some(model_id) = lookup(MODEL_ID_ENV) {
            self.ollama.model_id = model_id;
            applied.push(MODEL_ID_ENV);
        }
        if let Some(endpoint) = lookup(ENDPOINT_ENV) {
            self.ollama.endpoint = endpoint;
            applied.push(ENDPOINT_ENV);
        }
        applied
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()` and `load()`, but can also be
    /// called explicitly when constructing Config via other means (e.g., in tests).
    pub fn validate(&self) -> AppResult<()> {
        let ollama = &self.ollama;

        if ollama.model_id.trim().is_empty() {
            return Err(AppError::Config(
                "ollama.model_id must not be empty (e.g. model_id = \"phi3\")".to_string(),
            ));
        }

        if !ollama.endpoint.starts_with("http://") && !ollama.endpoint.starts_with("https://") {
            return Err(AppError::Config(format!(
                "ollama.endpoint '{}' must start with 'http://' or 'https://'",
                ollama.endpoint
            )));
        }

        if ollama.timeout_seconds == 0 || ollama.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "ollama.timeout_seconds must be between 1 and {}, got {}",
                MAX_TIMEOUT_SECONDS, ollama.timeout_seconds
            )));
        }

        if self.server.port == 0 {
            return Err(AppError::Config(
                "server.port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Where a loaded [`Config`] came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub path: String,
    /// No file at the default path; built-in defaults were used
    pub defaults_used: bool,
    /// Environment variables that replaced file or default values
    pub overridden: Vec<&'static str>,
}

impl LoadReport {
    /// Emit the report through `tracing`; call once a subscriber is installed
    pub fn log(&self) {
        if self.defaults_used {
            tracing::info!(path = %self.path, "No config file found, using defaults");
        } else {
            tracing::info!(path = %self.path, "Loaded configuration file");
        }
        for var in &self.overridden {
            tracing::info!(variable = %var, "Configuration overridden from environment");
        }
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        config.validate()?;
        Ok(config)
    }
}
