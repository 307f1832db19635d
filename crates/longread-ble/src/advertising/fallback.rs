//! Fallback peripheral for platforms without peripheral mode support

use std::sync::Weak;

use longread_core::{
    AdvertiseData, AdvertiseError, AdvertiseSettings, GattService, PeripheralEvents,
    PeripheralRadio,
};
use tracing::{debug, warn};

use super::EventSink;
use crate::config::BleConfig;

// ----------------------------------------------------------------------------
// Fallback Implementation
// ----------------------------------------------------------------------------

/// Peripheral that rejects every advertising request.
///
/// The engine keeps scanning and reading peers; this device just cannot be
/// discovered by them.
#[derive(Default)]
pub struct UnsupportedPeripheral {
    events: EventSink,
}

impl UnsupportedPeripheral {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn open(_config: &BleConfig) -> crate::Result<Self> {
        warn!(
            "BLE advertising not supported on this platform. This device will not be \
            discoverable; use Linux with BlueZ for full functionality."
        );
        Ok(Self::new())
    }
}

impl PeripheralRadio for UnsupportedPeripheral {
    fn set_event_handler(&self, handler: Weak<dyn PeripheralEvents>) {
        self.events.set(handler);
    }

    fn add_service(&self, service: GattService) {
        debug!(service = %service.uuid, "Ignoring GATT service on unsupported platform");
    }

    fn start_advertising(
        &self,
        _settings: &AdvertiseSettings,
        _data: &AdvertiseData,
        _scan_response: &AdvertiseData,
    ) {
        if let Some(handler) = self.events.get() {
            handler.on_advertise_failure(AdvertiseError::FeatureUnsupported);
        }
    }

    fn stop_advertising(&self) {
        if let Some(handler) = self.events.get() {
            handler.on_advertising_stopped();
        }
    }

    fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use longread_core::{Advertiser, DeviceInfo, DeviceInfoProvider, EngineConfig};

    use super::*;

    struct Info;

    impl DeviceInfoProvider for Info {
        fn device_info(&self) -> DeviceInfo {
            DeviceInfo {
                device_name: "test".to_string(),
                app_version: "0.1.0".to_string(),
                manufacturer: "unknown".to_string(),
                model: "unknown".to_string(),
                os_name: "Linux".to_string(),
                os_version: "6.6".to_string(),
            }
        }
    }

    #[test]
    fn test_start_reports_unsupported() {
        tokio_test::block_on(async {
            let radio = Arc::new(UnsupportedPeripheral::open(&BleConfig::default()).await.unwrap());
            let advertiser = Advertiser::new(radio, Arc::new(Info), &EngineConfig::default());

            assert!(!advertiser.start_advertising(&[]).await);
            assert!(!advertiser.is_advertising());
            assert!(advertiser.stop_advertising().await);
        });
    }

    #[test]
    fn test_events_without_handler_are_dropped() {
        let radio = UnsupportedPeripheral::new();
        radio.start_advertising(
            &AdvertiseSettings::default(),
            &AdvertiseData::default(),
            &AdvertiseData::default(),
        );
        radio.stop_advertising();
        radio.close();
        assert!(radio.events.get().is_none());
    }
}
