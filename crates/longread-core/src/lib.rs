//! Dual-role BLE identity exchange engine
//!
//! A device running this engine advertises a fixed GATT service exposing a
//! readable identity characteristic, and at the same time scans for other
//! devices advertising the same service. Every matched peer is connected,
//! its identity record is read, and the connection is released.
//!
//! ## Architecture
//!
//! - [`identity`] - The identity record exchanged between devices and its JSON wire format
//! - [`protocol`] - Service and characteristic UUIDs shared by every participant
//! - [`permissions`] - Platform-version keyed permission requirements
//! - [`radio`] - Capability traits implemented by a concrete radio stack
//! - [`advertiser`] - Broadcast state machine with coalesced start/stop
//! - [`scanner`] - Continuous discovery with a periodic restart watchdog
//! - [`device`] - A discovered peer and its connect/read/disconnect sequence
//! - [`coordinator`] - Wires permission checks, advertiser and scanner together
//!
//! The engine never talks to hardware directly. `longread-ble` provides the
//! btleplug/BlueZ backends; tests drive the engine through a scripted radio.

pub mod advertiser;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod identity;
pub mod permissions;
pub mod protocol;
pub mod radio;
pub mod scanner;

pub use advertiser::Advertiser;
pub use config::{EngineConfig, IdentityConfig};
pub use coordinator::{Coordinator, DiscoveredIdentity, StartOutcome};
pub use device::RemoteDevice;
pub use error::{LongreadError, RadioError, Result};
pub use identity::{DeviceInfo, DeviceInfoProvider, HostDeviceInfo, IdentityRecord};
pub use permissions::{Permission, PermissionGate, PermissionPolicy, StaticPermissionGate};
pub use protocol::{uuid_from_short, IDENTITY_CHARACTERISTIC_UUID, MAX_MTU, SERVICE_UUID};
pub use radio::{
    AdvertiseData, AdvertiseError, AdvertiseMode, AdvertiseSettings, CentralInfo, CentralRadio,
    DiscoveryRecord, GattService, PeerHandle, PeripheralEvents, PeripheralRadio, ScanCallback,
    ScanFailure, TxPowerLevel,
};
pub use scanner::{PeripheralFoundListener, Scanner, MIN_SCAN_RESTART_INTERVAL};
