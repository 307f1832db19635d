//! Peripheral role: GATT server and advertising
//!
//! Linux serves the GATT application and advertises through BlueZ. Other
//! platforms get a peripheral that reports advertising as unsupported, which
//! leaves the engine scanning only.

pub mod fallback;
#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(any(target_os = "linux", test))]
mod long_read;

use std::sync::{Arc, Weak};

use longread_core::PeripheralEvents;
use parking_lot::Mutex;

pub use fallback::UnsupportedPeripheral;
#[cfg(target_os = "linux")]
pub use linux::BluezPeripheral;

/// Peripheral backend for the current platform
#[cfg(target_os = "linux")]
pub type PlatformPeripheral = linux::BluezPeripheral;

/// Peripheral backend for the current platform
#[cfg(not(target_os = "linux"))]
pub type PlatformPeripheral = fallback::UnsupportedPeripheral;

// ----------------------------------------------------------------------------
// Event Handler Slot
// ----------------------------------------------------------------------------

/// Weak reference to the engine's peripheral event handler
#[derive(Default)]
pub(crate) struct EventSink {
    handler: Mutex<Option<Weak<dyn PeripheralEvents>>>,
}

impl EventSink {
    pub(crate) fn set(&self, handler: Weak<dyn PeripheralEvents>) {
        *self.handler.lock() = Some(handler);
    }

    /// The handler, if it is still alive
    pub(crate) fn get(&self) -> Option<Arc<dyn PeripheralEvents>> {
        self.handler.lock().as_ref().and_then(Weak::upgrade)
    }
}
