//! Configuration for the cyclist fall alert.

use crate::alert::message::DEFAULT_COUNTRY_PREFIX;
use crate::alert::{device_label, DispatcherSettings, EmergencyContact, GeoPoint};
use crate::core::sensitivity::NOMINAL_SENSITIVITY;
use crate::gateway::GatewayConfig;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the fall alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detector sensitivity factor (1.0 = nominal)
    pub sensitivity: f64,

    /// Person alerted on a fall
    pub contact: Option<EmergencyContact>,

    /// Prefix added to numbers entered without one
    pub country_prefix: String,

    /// IANA timezone used for the alert timestamp
    pub timezone: String,

    /// File receiving alerts when no gateway is configured
    pub outbox_path: PathBuf,

    /// Path for storing detection statistics
    pub data_path: PathBuf,

    /// Whether detection is currently paused
    pub paused: bool,

    /// Last known position, used when no fresh fix is available
    pub last_location: Option<GeoPoint>,

    /// SMS gateway; alerts go to the outbox when unset
    pub gateway: Option<GatewayConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::APP_NAME);

        Self {
            sensitivity: NOMINAL_SENSITIVITY,
            contact: None,
            country_prefix: DEFAULT_COUNTRY_PREFIX.to_string(),
            timezone: "America/Lima".to_string(),
            outbox_path: data_dir.join("outbox.jsonl"),
            data_path: data_dir,
            paused: false,
            last_location: None,
            gateway: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::APP_NAME)
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        if let Some(parent) = self.outbox_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        Ok(())
    }

    /// Path of the persisted detection statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("detection_stats.json")
    }

    /// Configured timezone, UTC when the name is not recognised.
    pub fn timezone(&self) -> Tz {
        self.timezone.parse::<Tz>().unwrap_or_else(|_| {
            tracing::warn!("Unknown timezone '{}', using UTC", self.timezone);
            Tz::UTC
        })
    }

    /// Validate and store a sensitivity factor.
    pub fn set_sensitivity(&mut self, factor: f64) -> Result<(), ConfigError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "sensitivity must be a positive number, got {factor}"
            )));
        }
        self.sensitivity = factor;
        Ok(())
    }

    /// Settings handed to the alert dispatcher.
    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            contact: self.contact.clone(),
            country_prefix: self.country_prefix.clone(),
            timezone: self.timezone(),
            device: device_label(),
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidValue(e) => write!(f, "Invalid value: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sensitivity, 1.0);
        assert_eq!(config.country_prefix, "+51");
        assert!(config.contact.is_none());
        assert!(config.gateway.is_none());
        assert!(!config.paused);
    }

    #[test]
    fn test_timezone_fallback() {
        let mut config = Config::default();
        assert_eq!(config.timezone(), chrono_tz::America::Lima);

        config.timezone = "Mars/Olympus".to_string();
        assert_eq!(config.timezone(), Tz::UTC);
    }

    #[test]
    fn test_set_sensitivity_validation() {
        let mut config = Config::default();
        assert!(config.set_sensitivity(1.25).is_ok());
        assert_eq!(config.sensitivity, 1.25);

        assert!(config.set_sensitivity(0.0).is_err());
        assert!(config.set_sensitivity(f64::NAN).is_err());
        assert_eq!(config.sensitivity, 1.25);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"sensitivity":0.8,"paused":true}"#).unwrap();
        assert_eq!(config.sensitivity, 0.8);
        assert!(config.paused);
        assert_eq!(config.country_prefix, "+51");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("fall-alert-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");

        let mut config = Config::default();
        config.contact = Some(EmergencyContact::new("Ana", "987654321"));
        config.last_location = Some(GeoPoint::new(-12.1, -77.0));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn test_dispatcher_settings_carry_contact() {
        let mut config = Config::default();
        config.contact = Some(EmergencyContact::new("Ana", "987654321"));
        let settings = config.dispatcher_settings();
        assert_eq!(settings.contact, config.contact);
        assert_eq!(settings.country_prefix, "+51");
    }
}
