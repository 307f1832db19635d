//! Error handling for the longread CLI

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Engine error: {0}")]
    Core(#[from] longread_core::LongreadError),

    #[error("BLE error: {0}")]
    Ble(#[from] longread_ble::BleError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing permissions: {}", .0.join(", "))]
    PermissionsMissing(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
