//! Configuration management for the iconbridge controller
//!
//! Configuration is a YAML file in which every section is optional. The
//! repository catalogue is deliberately absent: it is a fixed mapping
//! compiled into the shared library.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use iconbridge_shared::archive::DEFAULT_ARCHIVE_NAME;
use iconbridge_shared::logging::{parse_level, LoggingConfig as SubscriberConfig};
use iconbridge_shared::models::DEFAULT_JPEG_QUALITY;
use iconbridge_shared::verify::{DEFAULT_USER_AGENT, VERIFICATION_TIMEOUT};
use iconbridge_shared::Locale;

/// Main configuration structure for the controller
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Persistent key-value storage
    pub storage: StorageConfig,

    /// Export and packaging defaults
    pub export: ExportConfig,

    /// Remote token verification
    pub verification: VerificationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Panel presentation
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the key-value store
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Archive name used when a request does not supply one
    pub archive_name: String,

    /// JPEG quality used when a request does not supply one
    pub jpeg_quality: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VerificationConfig {
    /// Identity request timeout in seconds
    pub timeout_secs: u64,

    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct UiConfig {
    pub locale: Locale,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("iconbridge")
            .join("storage.json");

        Self { path }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: VERIFICATION_TIMEOUT.as_secs(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("iconbridge")
            .join("config.yml")
    }

    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        debug!("Loading configuration from: {:?}", path);

        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let content = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;

        info!("Configuration loaded successfully from: {:?}", path);
        config.validate()?;

        Ok(config)
    }

    /// Load configuration, using defaults only when the file does not exist.
    ///
    /// A file that exists but fails to parse or validate is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::NotFound { path }) => {
                debug!("No configuration at {}, using defaults", path);
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;

        info!("Configuration saved to: {:?}", path);
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.storage.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "storage.path".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if self.export.archive_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "export.archive_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.export.jpeg_quality) {
            return Err(ConfigError::Invalid {
                field: "export.jpeg_quality".to_string(),
                reason: "must be between 0 and 1".to_string(),
            });
        }

        if self.verification.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "verification.timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid {
                field: "logging.level".to_string(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        debug!("Configuration validation passed");
        Ok(())
    }

    /// Get verification timeout as Duration
    pub fn verification_timeout(&self) -> Duration {
        Duration::from_secs(self.verification.timeout_secs)
    }

    /// Subscriber settings for this configuration; `debug` forces debug level
    pub fn subscriber_config(&self, debug: bool) -> SubscriberConfig {
        let level = if debug {
            tracing::Level::DEBUG
        } else {
            parse_level(&self.logging.level).unwrap_or(tracing::Level::INFO)
        };
        SubscriberConfig::with_level(level)
    }
}
