//! Bluetooth Low Energy radio backends for the longread engine
//!
//! This crate implements the radio capability traits from `longread-core` on
//! top of real Bluetooth stacks.
//!
//! ## Architecture
//!
//! - [`config`] - Adapter selection and power settings
//! - [`error`] - Error types specific to the BLE backends
//! - [`central`] - Scanning and peer access through btleplug
//! - [`advertising`] - GATT server and advertising (BlueZ on Linux)
//!
//! Both radios accept commands synchronously and execute them on a worker
//! task, so the engine never blocks on the Bluetooth stack. Hardware outcomes
//! are reported back through the engine's callback traits.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use longread_ble::{open_radios, BleConfig};
//! use longread_core::{Coordinator, EngineConfig, HostDeviceInfo, StaticPermissionGate};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::default();
//! let (central, peripheral) = open_radios(&BleConfig::default()).await?;
//!
//! let (coordinator, mut identities) = Coordinator::new(
//!     central,
//!     peripheral,
//!     Arc::new(StaticPermissionGate::granted()),
//!     Arc::new(HostDeviceInfo::new(config.identity.clone())),
//!     &config,
//!     33,
//! )?;
//!
//! coordinator.start().await?;
//! while let Some(found) = identities.recv().await {
//!     println!("{} is {}", found.address, found.identity.device_name);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Support
//!
//! - **Linux**: scanning via btleplug, GATT server and advertising via `bluer`
//! - **Other platforms**: scanning only; advertising reports `FeatureUnsupported`

pub mod advertising;
pub mod central;
pub mod config;
pub mod error;

use std::sync::Arc;

use longread_core::{CentralRadio, PeripheralRadio};

pub use advertising::PlatformPeripheral;
pub use central::{BtleplugCentral, BtleplugPeer};
pub use config::BleConfig;
pub use error::{BleError, Result};

/// Open the central and peripheral radios on the configured adapter
pub async fn open_radios(
    config: &BleConfig,
) -> Result<(Arc<dyn CentralRadio>, Arc<dyn PeripheralRadio>)> {
    let central = BtleplugCentral::open(config).await?;
    let peripheral = PlatformPeripheral::open(config).await?;
    Ok((Arc::new(central), Arc::new(peripheral)))
}
