//! Radio stack capability traits
//!
//! The engine drives a BLE radio through these traits and receives hardware
//! confirmations through the matching event traits. Commands are fire-and-forget
//! (`start_advertising`, `scan_for_peripherals_with_services`); outcomes come
//! back as callbacks on whichever thread the radio stack uses.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RadioError;

// ----------------------------------------------------------------------------
// Advertising Parameters
// ----------------------------------------------------------------------------

/// Advertising interval class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvertiseMode {
    LowPower,
    Balanced,
    LowLatency,
}

impl AdvertiseMode {
    /// Nominal advertising interval for this mode
    pub fn interval(&self) -> Duration {
        match self {
            Self::LowPower => Duration::from_millis(1000),
            Self::Balanced => Duration::from_millis(250),
            Self::LowLatency => Duration::from_millis(100),
        }
    }
}

/// Transmit power class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    Medium,
    High,
}

impl TxPowerLevel {
    /// Approximate radiated power in dBm
    pub fn dbm(&self) -> i16 {
        match self {
            Self::UltraLow => -21,
            Self::Low => -15,
            Self::Medium => -7,
            Self::High => 1,
        }
    }
}

/// Settings for one advertising session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvertiseSettings {
    pub mode: AdvertiseMode,
    pub tx_power: TxPowerLevel,
    pub connectable: bool,
    /// Advertising stops by itself after this many seconds; 0 disables the timeout
    pub timeout_secs: u64,
}

impl Default for AdvertiseSettings {
    fn default() -> Self {
        Self {
            mode: AdvertiseMode::LowPower,
            tx_power: TxPowerLevel::High,
            connectable: true,
            timeout_secs: 0,
        }
    }
}

impl AdvertiseSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Contents of an advertisement or scan response packet
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertiseData {
    pub service_uuids: Vec<Uuid>,
    pub include_device_name: bool,
    pub include_tx_power_level: bool,
}

/// A primary GATT service with read-only characteristics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: Uuid,
    pub readable_characteristics: Vec<Uuid>,
}

/// Remote central issuing a read against our GATT server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralInfo {
    pub address: String,
    pub name: Option<String>,
}

/// Reason the radio refused to start advertising
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvertiseError {
    DataTooLarge,
    TooManyAdvertisers,
    AlreadyStarted,
    FeatureUnsupported,
    Internal(String),
}

impl fmt::Display for AdvertiseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataTooLarge => f.write_str("advertise data too large"),
            Self::TooManyAdvertisers => f.write_str("no advertising instance available"),
            Self::AlreadyStarted => f.write_str("advertising already started"),
            Self::FeatureUnsupported => f.write_str("peripheral mode not supported"),
            Self::Internal(reason) => write!(f, "internal error: {}", reason),
        }
    }
}

/// Reason a scan failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFailure {
    AlreadyStarted,
    ApplicationRegistrationFailed,
    FeatureUnsupported,
    Internal(String),
}

impl fmt::Display for ScanFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyStarted => f.write_str("scan already started"),
            Self::ApplicationRegistrationFailed => f.write_str("scanner registration failed"),
            Self::FeatureUnsupported => f.write_str("scanning not supported"),
            Self::Internal(reason) => write!(f, "internal error: {}", reason),
        }
    }
}

// ----------------------------------------------------------------------------
// Discovery
// ----------------------------------------------------------------------------

/// Raw advertisement data observed for a single scan event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryRecord {
    pub service_uuids: Vec<Uuid>,
    pub service_data: HashMap<Uuid, Vec<u8>>,
    pub local_name: Option<String>,
    pub rssi: Option<i16>,
    pub tx_power_level: Option<i16>,
}

impl DiscoveryRecord {
    /// Whether this advertisement lists the given service
    pub fn advertises(&self, service: &Uuid) -> bool {
        self.service_uuids.contains(service)
    }
}

// ----------------------------------------------------------------------------
// Peripheral Role
// ----------------------------------------------------------------------------

/// Hardware confirmations delivered by a [`PeripheralRadio`]
pub trait PeripheralEvents: Send + Sync {
    fn on_advertising_started(&self);

    fn on_advertise_failure(&self, error: AdvertiseError);

    fn on_advertising_stopped(&self);

    /// Produce the value for a read request. Must return before the radio
    /// sends the read response.
    fn on_characteristic_read(&self, central: &CentralInfo, characteristic: Uuid) -> Option<Vec<u8>>;
}

/// Peripheral (GATT server + advertiser) side of a radio stack
pub trait PeripheralRadio: Send + Sync {
    /// Register the receiver of hardware confirmations
    fn set_event_handler(&self, handler: Weak<dyn PeripheralEvents>);

    /// Register a service to be exposed while advertising
    fn add_service(&self, service: GattService);

    /// Begin advertising; the outcome arrives via [`PeripheralEvents`]
    fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertiseData,
        scan_response: &AdvertiseData,
    );

    /// Stop advertising; confirmation arrives via [`PeripheralEvents::on_advertising_stopped`]
    fn stop_advertising(&self);

    /// Release the underlying radio handle
    fn close(&self);
}

// ----------------------------------------------------------------------------
// Central Role
// ----------------------------------------------------------------------------

/// Discovery events delivered by a [`CentralRadio`]
pub trait ScanCallback: Send + Sync {
    fn on_peripheral_discovered(&self, peer: Arc<dyn PeerHandle>, record: DiscoveryRecord);

    fn on_scan_failed(&self, failure: ScanFailure);
}

/// Central (scanner) side of a radio stack
pub trait CentralRadio: Send + Sync {
    /// Start a scan filtered to the given services; results go to `callback`
    fn scan_for_peripherals_with_services(&self, services: &[Uuid], callback: Weak<dyn ScanCallback>);

    fn stop_scan(&self);

    /// Release the underlying radio handle
    fn close(&self);
}

/// Connection-capable endpoint for one remote peripheral
#[async_trait]
pub trait PeerHandle: Send + Sync + fmt::Debug {
    fn address(&self) -> String;

    fn name(&self) -> Option<String>;

    /// Services already known for this peer (cached from an earlier GATT discovery)
    fn services(&self) -> Vec<Uuid>;

    async fn is_connected(&self) -> bool;

    async fn connect(&self) -> Result<(), RadioError>;

    /// Request an ATT MTU; returns the MTU in effect
    async fn request_mtu(&self, mtu: u16) -> Result<u16, RadioError>;

    async fn read_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<Vec<u8>, RadioError>;

    async fn disconnect(&self) -> Result<(), RadioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_are_low_power_high_tx() {
        let settings = AdvertiseSettings::default();
        assert_eq!(settings.mode, AdvertiseMode::LowPower);
        assert_eq!(settings.tx_power, TxPowerLevel::High);
        assert!(settings.connectable);
        assert_eq!(settings.timeout(), None);
    }

    #[test]
    fn test_timeout_enabled_when_nonzero() {
        let settings = AdvertiseSettings {
            timeout_secs: 60,
            ..AdvertiseSettings::default()
        };
        assert_eq!(settings.timeout(), Some(Duration::from_secs(60)));
    }
}
