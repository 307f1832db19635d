//! Engine configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::MAX_MTU;
use crate::radio::AdvertiseSettings;

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

/// Configuration for the advertiser, scanner and peer interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How long a hardware scan runs before the watchdog restarts it
    pub scan_restart_interval_secs: u64,
    /// Pause between stopping and restarting the hardware scan
    pub scan_restart_cooldown_secs: u64,
    /// MTU requested after connecting to a peer
    pub max_mtu: u16,
    /// Values placed into the identity record served to peers
    pub identity: IdentityConfig,
    /// Advertising parameters handed to the radio
    pub advertise: AdvertiseSettings,
}

/// Identity record contents served by this device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub device_name: String,
    pub app_version: String,
    pub manufacturer: String,
    pub model: String,
    /// Reported OS version; detected from the host when unset
    pub os_version: Option<String>,
    pub sequence: u8,
    pub privacy_level: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scan_restart_interval_secs: 30,
            scan_restart_cooldown_secs: 10,
            max_mtu: MAX_MTU,
            identity: IdentityConfig::default(),
            advertise: AdvertiseSettings::default(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            device_name: "Device Name".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            manufacturer: "unknown".to_string(),
            model: "unknown".to_string(),
            os_version: None,
            sequence: 1,
            privacy_level: 1,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan watchdog interval; sub-second parts are dropped
    pub fn with_scan_restart_interval(mut self, interval: Duration) -> Self {
        self.scan_restart_interval_secs = interval.as_secs();
        self
    }

    /// Set the cool-down between scan stop and restart
    pub fn with_scan_restart_cooldown(mut self, cooldown: Duration) -> Self {
        self.scan_restart_cooldown_secs = cooldown.as_secs();
        self
    }

    /// Set the MTU requested after connecting
    pub fn with_max_mtu(mut self, mtu: u16) -> Self {
        self.max_mtu = mtu;
        self
    }

    /// Set the identity values served to peers
    pub fn with_identity(mut self, identity: IdentityConfig) -> Self {
        self.identity = identity;
        self
    }

    /// Set advertising parameters
    pub fn with_advertise_settings(mut self, settings: AdvertiseSettings) -> Self {
        self.advertise = settings;
        self
    }

    pub fn scan_restart_interval(&self) -> Duration {
        Duration::from_secs(self.scan_restart_interval_secs)
    }

    pub fn scan_restart_cooldown(&self) -> Duration {
        Duration::from_secs(self.scan_restart_cooldown_secs)
    }
}
