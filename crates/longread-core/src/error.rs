//! Error types for the identity exchange engine
//!
//! Component boundaries (advertiser, scanner, remote device) never return
//! these to their callers; failures there collapse into a boolean or an absent
//! value. The types below surface only from setup paths and from the radio
//! capability traits.

use thiserror::Error;
use uuid::Uuid;

// ----------------------------------------------------------------------------
// Error Types
// ----------------------------------------------------------------------------

/// Errors reported by a radio stack implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RadioError {
    #[error("Connection to {address} failed: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Peer {address} is not connected")]
    NotConnected { address: String },

    #[error("Characteristic {characteristic} of service {service} is not readable on this peer")]
    InvalidArgument { service: Uuid, characteristic: Uuid },

    #[error("Operation not supported by this radio: {0}")]
    Unsupported(String),

    #[error("BLE adapter not available: {0}")]
    AdapterUnavailable(String),

    #[error("Radio backend error: {0}")]
    Backend(String),
}

/// Top-level error type for the engine
#[derive(Error, Debug)]
pub enum LongreadError {
    #[error("Radio error: {0}")]
    Radio(#[from] RadioError),

    #[error("Failed to decode identity record: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode identity record: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Identity payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("No tokio runtime available: {0}")]
    RuntimeUnavailable(String),

    #[error("Coordinator has been cleaned up")]
    ShutDown,
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, LongreadError>;
