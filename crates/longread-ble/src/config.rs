//! BLE backend configuration

use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Adapter settings shared by the central and peripheral backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Adapter to use, e.g. `hci1`. The first adapter when unset.
    pub adapter: Option<String>,
    /// Power on the adapter if it is off
    pub power_on: bool,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            adapter: None,
            power_on: true,
        }
    }
}

impl BleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an adapter by name
    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapter = Some(adapter.into());
        self
    }

    /// Enable or disable powering on the adapter
    pub fn with_power_on(mut self, power_on: bool) -> Self {
        self.power_on = power_on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = BleConfig::new().with_adapter("hci1").with_power_on(false);
        assert_eq!(config.adapter.as_deref(), Some("hci1"));
        assert!(!config.power_on);
    }

    #[test]
    fn test_defaults() {
        let config = BleConfig::default();
        assert!(config.adapter.is_none());
        assert!(config.power_on);
    }
}
