//! # Engine Configuration
//!
//! Configuration management for the inventory engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     RESTOCK_ENFORCE_MIN_LE_MAX=true                                    │
//! │     RESTOCK_RETRY_ENABLED=true                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/restock/restock.toml (Linux)                             │
//! │     ~/Library/Application Support/com.restock.restock/restock.toml     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     permissive validation, no retries                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # restock.toml
//! [validation]
//! enforce_min_le_max = false
//! require_valid_link = false
//! validate_on_commit = false
//!
//! [retry]
//! enabled = true
//! initial_backoff_ms = 200
//! max_backoff_secs = 5
//! max_elapsed_secs = 30
//! max_retries = 3
//!
//! [logging]
//! filter = "info,restock=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use restock_core::ValidationRules;

use crate::collection::RemoteCollection;
use crate::error::{ConfigError, ConfigResult};
use crate::retry::{RetryingCollection, RetrySettings};

// =============================================================================
// Logging Settings
// =============================================================================

/// Log output settings used by binaries that install a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive string.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info,restock=debug".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Optional validation rules applied on top of the required ones.
    #[serde(default)]
    pub validation: ValidationRules,

    /// Retry behavior for remote calls.
    #[serde(default)]
    pub retry: RetrySettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (restock.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.retry.enabled && self.retry.initial_backoff_ms == 0 {
            return Err(ConfigError::InvalidConfig(
                "retry.initial_backoff_ms must be greater than 0".into(),
            ));
        }

        if self.retry.enabled && self.retry.max_elapsed_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "retry.max_elapsed_secs must be greater than 0".into(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("logging.filter must not be empty".into()));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Some(flag) = env_flag("RESTOCK_ENFORCE_MIN_LE_MAX") {
            debug!(enabled = flag, "Overriding min <= max check from environment");
            self.validation.enforce_min_le_max = flag;
        }

        if let Some(flag) = env_flag("RESTOCK_REQUIRE_VALID_LINK") {
            debug!(enabled = flag, "Overriding link check from environment");
            self.validation.require_valid_link = flag;
        }

        if let Some(flag) = env_flag("RESTOCK_VALIDATE_ON_COMMIT") {
            debug!(enabled = flag, "Overriding commit validation from environment");
            self.validation.validate_on_commit = flag;
        }

        if let Some(flag) = env_flag("RESTOCK_RETRY_ENABLED") {
            debug!(enabled = flag, "Overriding retry from environment");
            self.retry.enabled = flag;
        }

        if let Ok(retries) = std::env::var("RESTOCK_MAX_RETRIES") {
            match retries.parse::<u32>() {
                Ok(n) => self.retry.max_retries = n,
                Err(_) => warn!(value = %retries, "Ignoring invalid RESTOCK_MAX_RETRIES"),
            }
        }

        if let Ok(filter) = std::env::var("RESTOCK_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "restock", "restock")
            .map(|dirs| dirs.config_dir().join("restock.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Wraps `collection` according to the retry settings.
    pub fn wrap_collection(&self, collection: Arc<dyn RemoteCollection>) -> Arc<dyn RemoteCollection> {
        if self.retry.enabled {
            debug!(max_retries = self.retry.max_retries, "Remote calls will be retried");
            Arc::new(RetryingCollection::new(collection, self.retry.clone()))
        } else {
            collection
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(key, value = %value, "Ignoring invalid boolean in environment");
            None
        }
    }
}
