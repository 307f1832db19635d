//! CLI configuration management
//!
//! Configuration is read from an optional TOML file. Every section and field
//! may be omitted; missing values take their defaults.
//!
//! ```toml
//! [engine]
//! scan_restart_interval_secs = 30
//!
//! [engine.identity]
//! device_name = "Field Unit 7"
//!
//! [ble]
//! adapter = "hci0"
//!
//! [platform]
//! api_level = 33
//! permissions_granted = true
//! ```

use std::path::Path;

use longread_ble::BleConfig;
use longread_core::{EngineConfig, MAX_MTU};
use serde::{Deserialize, Serialize};

use crate::error::{CliError, Result};

/// Smallest ATT MTU a BLE link can use
const MIN_MTU: u16 = 23;

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the CLI application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine timing, identity and advertising settings
    pub engine: EngineConfig,

    /// Radio adapter settings
    pub ble: BleConfig,

    /// Host platform description
    pub platform: PlatformConfig,
}

/// Platform version and permission state reported to the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Platform API level selecting the permission policy
    pub api_level: u32,

    /// Whether the host has already granted the required permissions
    pub permissions_granted: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_level: 33,
            permissions_granted: true,
        }
    }
}

impl AppConfig {
    /// Load and validate configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.engine.scan_restart_interval_secs == 0 {
            return Err(CliError::Config(
                "scan_restart_interval_secs must be greater than zero".to_string(),
            ));
        }

        if !(MIN_MTU..=MAX_MTU).contains(&self.engine.max_mtu) {
            return Err(CliError::Config(format!(
                "max_mtu must be between {} and {}, got {}",
                MIN_MTU, MAX_MTU, self.engine.max_mtu
            )));
        }

        if self.engine.identity.device_name.is_empty() {
            return Err(CliError::Config("device_name cannot be empty".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.platform.api_level, 33);
        assert!(config.platform.permissions_granted);
    }

    #[test]
    fn test_partial_sections_are_merged() {
        let config = AppConfig::from_toml(
            r#"
            [engine]
            scan_restart_interval_secs = 45

            [engine.identity]
            device_name = "Field Unit 7"

            [ble]
            adapter = "hci1"

            [platform]
            api_level = 29
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.scan_restart_interval_secs, 45);
        assert_eq!(config.engine.scan_restart_cooldown_secs, 10);
        assert_eq!(config.engine.identity.device_name, "Field Unit 7");
        assert_eq!(config.ble.adapter.as_deref(), Some("hci1"));
        assert!(config.ble.power_on);
        assert_eq!(config.platform.api_level, 29);
        assert!(config.platform.permissions_granted);
    }

    #[test]
    fn test_validation_rejects_zero_interval() {
        let result = AppConfig::from_toml("[engine]\nscan_restart_interval_secs = 0\n");
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_validation_rejects_out_of_range_mtu() {
        let mut config = AppConfig::default();
        config.engine.max_mtu = 600;
        assert!(config.validate().is_err());

        config.engine.max_mtu = 22;
        assert!(config.validate().is_err());

        config.engine.max_mtu = 185;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let result = AppConfig::from_toml("[platform\napi_level = 3");
        assert!(matches!(result, Err(CliError::TomlParsing(_))));
    }
}
