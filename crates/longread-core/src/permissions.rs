//! Bluetooth permission requirements keyed by platform version
//!
//! Versions are Android API levels. Hosts without runtime permission grants
//! report a level of 22 or below, or use [`StaticPermissionGate`].

use std::fmt;

// ----------------------------------------------------------------------------
// Permissions
// ----------------------------------------------------------------------------

/// A single runtime permission identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Bluetooth,
    AccessCoarseLocation,
    AccessBackgroundLocation,
    BluetoothConnect,
    BluetoothScan,
    BluetoothAdvertise,
}

impl Permission {
    /// Platform identifier for this permission
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Bluetooth => "android.permission.BLUETOOTH",
            Self::AccessCoarseLocation => "android.permission.ACCESS_COARSE_LOCATION",
            Self::AccessBackgroundLocation => "android.permission.ACCESS_BACKGROUND_LOCATION",
            Self::BluetoothConnect => "android.permission.BLUETOOTH_CONNECT",
            Self::BluetoothScan => "android.permission.BLUETOOTH_SCAN",
            Self::BluetoothAdvertise => "android.permission.BLUETOOTH_ADVERTISE",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

// ----------------------------------------------------------------------------
// Permission Policy
// ----------------------------------------------------------------------------

/// Highest API level where every permission was granted at install time
const LAST_INSTALL_TIME_LEVEL: u32 = 22;

/// Highest API level that gates scanning behind location permissions
const LAST_LOCATION_LEVEL: u32 = 30;

/// Permission set required on a given platform version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionPolicy {
    /// Up to API 22: all permissions were install-time
    InstallTime,
    /// API 23 through 30: Bluetooth plus coarse and background location
    LocationBased,
    /// API 31 and later: explicit nearby-device permissions
    NearbyDevices,
}

impl PermissionPolicy {
    /// Select the policy for an API level. Levels beyond the known table fall
    /// through to the newest policy.
    pub fn for_api_level(level: u32) -> Self {
        match level {
            0..=LAST_INSTALL_TIME_LEVEL => Self::InstallTime,
            level if level <= LAST_LOCATION_LEVEL => Self::LocationBased,
            _ => Self::NearbyDevices,
        }
    }

    /// Ordered permissions that must be granted at runtime
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Self::InstallTime => &[],
            Self::LocationBased => &[
                Permission::Bluetooth,
                Permission::AccessCoarseLocation,
                Permission::AccessBackgroundLocation,
            ],
            Self::NearbyDevices => &[
                Permission::BluetoothConnect,
                Permission::BluetoothScan,
                Permission::BluetoothAdvertise,
            ],
        }
    }

    /// Permission identifiers in request order
    pub fn identifiers(&self) -> Vec<&'static str> {
        self.permissions().iter().map(Permission::identifier).collect()
    }
}

// ----------------------------------------------------------------------------
// Permission Gate
// ----------------------------------------------------------------------------

/// Host-side permission mechanism consulted before the engine starts
pub trait PermissionGate: Send + Sync {
    /// Whether every required permission is currently granted
    fn all_granted(&self) -> bool;

    /// Ask the host to request the policy's permissions
    fn request(&self, policy: &PermissionPolicy);
}

/// Gate with a fixed answer, for hosts without runtime grants
#[derive(Debug, Clone, Copy)]
pub struct StaticPermissionGate {
    granted: bool,
}

impl StaticPermissionGate {
    pub fn new(granted: bool) -> Self {
        Self { granted }
    }

    pub fn granted() -> Self {
        Self::new(true)
    }
}

impl PermissionGate for StaticPermissionGate {
    fn all_granted(&self) -> bool {
        self.granted
    }

    fn request(&self, policy: &PermissionPolicy) {
        tracing::warn!(
            permissions = ?policy.identifiers(),
            "Permissions requested but this host cannot grant them at runtime"
        );
    }
}
