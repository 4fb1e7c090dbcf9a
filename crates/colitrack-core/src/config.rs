//! Configuration loading and typed config structures for Colitrack.
//!
//! The canonical configuration lives in `colitrack-config.yaml` at the
//! project root. Every section and field has a default, so an empty or
//! missing file yields a working local setup. Deployment-specific values
//! (backend URL, bearer token, NATS URL, observer port) can be overridden
//! from the environment.

use std::path::{Path, PathBuf};

use colitrack_geo::{GeoError, ViewportConfig};
use serde::Deserialize;
use tracing::{info, warn};

use crate::reconcile::ReconcileConfig;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "COLITRACK_CONFIG";

/// Configuration file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "colitrack-config.yaml";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The viewport section is inconsistent.
    #[error("invalid viewport configuration: {0}")]
    Viewport(#[from] GeoError),
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// Mirrors the structure of `colitrack-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColitrackConfig {
    /// REST backend settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Push channel settings.
    #[serde(default)]
    pub channel: ChannelConfig,

    /// Map viewport settings.
    #[serde(default)]
    pub viewport: ViewportConfig,

    /// History/live deduplication settings.
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Observer server settings.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ColitrackConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Viewport`] if the viewport section is inconsistent.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string. Environment overrides are
    /// not applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Load the file named by `COLITRACK_CONFIG` (or
    /// `colitrack-config.yaml`). A missing file yields the defaults with
    /// environment overrides applied.
    ///
    /// # Errors
    ///
    /// Same as [`ColitrackConfig::from_file`], except that a missing file
    /// is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        if path.exists() {
            info!(path = %path.display(), "loading configuration");
            return Self::from_file(&path);
        }
        warn!(path = %path.display(), "config file not found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Viewport`] when the viewport section is
    /// invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.viewport.validate()?;
        Ok(())
    }

    /// Override deployment settings from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_with(|key| std::env::var(key).ok());
    }

    /// Override deployment settings using `lookup` as the environment.
    ///
    /// Recognised keys: `COLITRACK_API_URL`, `COLITRACK_API_TOKEN`,
    /// `NATS_URL`, `COLITRACK_OBSERVER_PORT`. An unparseable port is logged
    /// and ignored.
    pub fn apply_env_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("COLITRACK_API_URL") {
            self.api.base_url = val;
        }
        if let Some(val) = lookup("COLITRACK_API_TOKEN") {
            self.api.token = Some(val);
        }
        if let Some(val) = lookup("NATS_URL") {
            self.channel.nats_url = val;
        }
        if let Some(val) = lookup("COLITRACK_OBSERVER_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.observer.port = port,
                Err(e) => warn!(value = val, error = %e, "ignoring invalid COLITRACK_OBSERVER_PORT"),
            }
        }
    }
}

/// REST backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend API, without trailing slash.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Page size for entity listings.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            token: None,
            request_timeout_ms: default_request_timeout_ms(),
            per_page: default_per_page(),
        }
    }
}

/// Push channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChannelConfig {
    /// NATS server URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject prefix. Rooms live at `{prefix}.{code}.position`.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Silence after which a live signal is reported stale, in
    /// milliseconds.
    #[serde(default = "default_stale_after_ms")]
    pub stale_after_ms: u64,

    /// Capacity of the per-subscription event buffer.
    #[serde(default = "default_buffer")]
    pub buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            subject_prefix: default_subject_prefix(),
            stale_after_ms: default_stale_after_ms(),
            buffer: default_buffer(),
        }
    }
}

/// Observer server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_observer_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_observer_port")]
    pub port: u16,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_observer_host(),
            port: default_observer_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when
    /// set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000/api".to_owned()
}

const fn default_request_timeout_ms() -> u64 {
    10_000
}

const fn default_per_page() -> u32 {
    50
}

fn default_nats_url() -> String {
    "nats://localhost:4222".to_owned()
}

fn default_subject_prefix() -> String {
    "track".to_owned()
}

const fn default_stale_after_ms() -> u64 {
    60_000
}

const fn default_buffer() -> usize {
    64
}

fn default_observer_host() -> String {
    "0.0.0.0".to_owned()
}

const fn default_observer_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_owned()
}
