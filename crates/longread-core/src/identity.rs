//! Identity record exchanged between devices
//!
//! The record is encoded as compact UTF-8 JSON keyed by short, stable field
//! names so that any peer, regardless of platform, can decode it:
//!
//! ```text
//! {"uuid":"…","seq":1,"priv":1,"name":"…","vers":"…","mfg":"…","model":"…","os":"…","osVers":"…"}
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::IdentityConfig;
use crate::error::{LongreadError, Result};

// ----------------------------------------------------------------------------
// Identity Record
// ----------------------------------------------------------------------------

/// Fixed-schema identity payload served over the identity characteristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityRecord {
    /// Random token generated for every read; not a stable device identity
    #[serde(rename = "uuid")]
    pub id: String,
    #[serde(rename = "seq")]
    pub sequence: u8,
    #[serde(rename = "priv")]
    pub privacy_level: u8,
    #[serde(rename = "name")]
    pub device_name: String,
    #[serde(rename = "vers")]
    pub app_version: String,
    #[serde(rename = "mfg")]
    pub manufacturer: String,
    pub model: String,
    #[serde(rename = "os")]
    pub os_name: String,
    #[serde(rename = "osVers")]
    pub os_version: String,
}

impl IdentityRecord {
    /// Build a fresh record for one read request
    pub fn synthesize(sequence: u8, privacy_level: u8, info: DeviceInfo) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sequence,
            privacy_level,
            device_name: info.device_name,
            app_version: info.app_version,
            manufacturer: info.manufacturer,
            model: info.model,
            os_name: info.os_name,
            os_version: info.os_version,
        }
    }

    /// Encode to the JSON wire format
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(LongreadError::Encode)
    }

    /// Decode from bytes received over the air
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let text = String::from_utf8(bytes.to_vec())?;
        Self::from_json(&text)
    }

    /// Parse from already-decoded text
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(LongreadError::Decode)
    }
}

// ----------------------------------------------------------------------------
// Device Metadata
// ----------------------------------------------------------------------------

/// Live metadata describing the local device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_name: String,
    pub app_version: String,
    pub manufacturer: String,
    pub model: String,
    pub os_name: String,
    pub os_version: String,
}

/// Source of device metadata, queried at the moment a read request arrives
pub trait DeviceInfoProvider: Send + Sync {
    fn device_info(&self) -> DeviceInfo;
}

/// Device metadata from configuration, completed with host OS details
#[derive(Debug, Clone)]
pub struct HostDeviceInfo {
    config: IdentityConfig,
}

impl HostDeviceInfo {
    pub fn new(config: IdentityConfig) -> Self {
        Self { config }
    }
}

impl DeviceInfoProvider for HostDeviceInfo {
    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            device_name: self.config.device_name.clone(),
            app_version: self.config.app_version.clone(),
            manufacturer: self.config.manufacturer.clone(),
            model: self.config.model.clone(),
            os_name: host_os_name().to_string(),
            os_version: self
                .config
                .os_version
                .clone()
                .unwrap_or_else(host_os_version),
        }
    }
}

fn host_os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        "android" => "Android",
        "ios" => "iOS",
        other => other,
    }
}

fn host_os_version() -> String {
    // Kernel release is the closest portable notion of an OS version on Linux.
    std::fs::read_to_string("/proc/sys/kernel/osrelease")
        .map(|release| release.trim().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
