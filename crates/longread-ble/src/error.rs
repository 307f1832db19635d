//! Error types for the BLE backends

use longread_core::{LongreadError, RadioError};
use thiserror::Error;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors specific to the BLE backends
#[derive(Error, Debug)]
pub enum BleError {
    #[error("BLE adapter not available")]
    AdapterNotAvailable,

    #[error("BLE adapter {0} not found")]
    AdapterNotFound(String),

    #[error("Failed to get BLE events: {0}")]
    EventStreamFailed(String),

    #[error("No tokio runtime available: {0}")]
    RuntimeUnavailable(String),

    #[error("btleplug error: {0}")]
    Btleplug(#[from] btleplug::Error),

    #[cfg(target_os = "linux")]
    #[error("BlueZ error: {0}")]
    Bluez(#[from] bluer::Error),
}

impl From<BleError> for RadioError {
    fn from(err: BleError) -> Self {
        match err {
            BleError::AdapterNotAvailable | BleError::AdapterNotFound(_) => {
                RadioError::AdapterUnavailable(err.to_string())
            }
            other => RadioError::Backend(other.to_string()),
        }
    }
}

impl From<BleError> for LongreadError {
    fn from(err: BleError) -> Self {
        LongreadError::Radio(err.into())
    }
}

/// Result type for BLE backend setup
pub type Result<T> = std::result::Result<T, BleError>;
