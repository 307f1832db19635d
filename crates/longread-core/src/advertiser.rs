//! Advertiser state machine
//!
//! Start and stop requests are coalesced: callers register a one-shot waiter
//! and the hardware callback that confirms (or rejects) the operation resolves
//! every waiter at once. At most one hardware start command is in flight.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::identity::{DeviceInfoProvider, IdentityRecord};
use crate::protocol::{IDENTITY_CHARACTERISTIC_UUID, SERVICE_UUID};
use crate::radio::{
    AdvertiseData, AdvertiseError, AdvertiseSettings, CentralInfo, GattService, PeripheralEvents,
    PeripheralRadio,
};

// ----------------------------------------------------------------------------
// Advertising State
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Start issued, hardware has not confirmed yet
    Pending,
    Advertising,
}

struct AdvertisingState {
    phase: Phase,
    start_waiters: Vec<oneshot::Sender<bool>>,
    stop_waiters: Vec<oneshot::Sender<bool>>,
}

impl AdvertisingState {
    fn new() -> Self {
        Self {
            phase: Phase::Idle,
            start_waiters: Vec::new(),
            stop_waiters: Vec::new(),
        }
    }
}

fn resolve_all(waiters: &mut Vec<oneshot::Sender<bool>>, outcome: bool) {
    for waiter in waiters.drain(..) {
        // Receiver gone means the caller stopped waiting; nothing to do.
        let _ = waiter.send(outcome);
    }
}

// ----------------------------------------------------------------------------
// Advertiser
// ----------------------------------------------------------------------------

/// Broadcasts the identity service and answers identity reads
pub struct Advertiser {
    radio: Arc<dyn PeripheralRadio>,
    device_info: Arc<dyn DeviceInfoProvider>,
    settings: AdvertiseSettings,
    sequence: u8,
    privacy_level: u8,
    state: Mutex<AdvertisingState>,
}

impl Advertiser {
    /// Create an advertiser and register it as the radio's event handler
    pub fn new(
        radio: Arc<dyn PeripheralRadio>,
        device_info: Arc<dyn DeviceInfoProvider>,
        config: &EngineConfig,
    ) -> Arc<Self> {
        let advertiser = Arc::new(Self {
            radio,
            device_info,
            settings: config.advertise.clone(),
            sequence: config.identity.sequence,
            privacy_level: config.identity.privacy_level,
            state: Mutex::new(AdvertisingState::new()),
        });

        let handler: Arc<dyn PeripheralEvents> = advertiser.clone();
        advertiser.radio.set_event_handler(Arc::downgrade(&handler));
        advertiser.radio.add_service(GattService {
            uuid: SERVICE_UUID,
            readable_characteristics: vec![IDENTITY_CHARACTERISTIC_UUID],
        });

        advertiser
    }

    /// Whether the hardware has confirmed advertising
    pub fn is_advertising(&self) -> bool {
        self.state.lock().phase == Phase::Advertising
    }

    /// Whether a start request awaits hardware confirmation
    pub fn is_pending(&self) -> bool {
        self.state.lock().phase == Phase::Pending
    }

    /// Start advertising and wait for the hardware outcome.
    ///
    /// Concurrent callers share a single hardware start command. `_payload` is
    /// reserved for future advertisement contents.
    pub async fn start_advertising(&self, _payload: &[u8]) -> bool {
        info!("Starting BLE advertising");

        let (tx, rx) = oneshot::channel();
        let issue_start = {
            let mut state = self.state.lock();
            match state.phase {
                Phase::Advertising => {
                    debug!("Already advertising");
                    return true;
                }
                Phase::Pending => {
                    state.start_waiters.push(tx);
                    false
                }
                Phase::Idle => {
                    state.phase = Phase::Pending;
                    state.start_waiters.push(tx);
                    true
                }
            }
        };

        if issue_start {
            let data = AdvertiseData {
                service_uuids: vec![SERVICE_UUID],
                ..AdvertiseData::default()
            };
            let scan_response = AdvertiseData {
                service_uuids: Vec::new(),
                include_device_name: true,
                include_tx_power_level: true,
            };
            self.radio
                .start_advertising(&self.settings, &data, &scan_response);
        }

        rx.await.unwrap_or(false)
    }

    /// Stop advertising and wait for the hardware confirmation.
    ///
    /// Resolves immediately when nothing is advertising or pending, without
    /// sending a stop command to the radio.
    pub async fn stop_advertising(&self) -> bool {
        info!("Stopping BLE advertising");

        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            if state.phase == Phase::Idle && state.stop_waiters.is_empty() {
                debug!("Advertising already stopped");
                return true;
            }
            state.stop_waiters.push(tx);
        }

        self.radio.stop_advertising();
        rx.await.unwrap_or(false)
    }

    fn identity_payload(&self) -> Option<Vec<u8>> {
        let record =
            IdentityRecord::synthesize(self.sequence, self.privacy_level, self.device_info.device_info());
        match record.encode() {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!("Failed to encode identity record: {}", e);
                None
            }
        }
    }
}

impl PeripheralEvents for Advertiser {
    fn on_advertising_started(&self) {
        info!("Advertising started");
        let mut state = self.state.lock();
        state.phase = Phase::Advertising;
        resolve_all(&mut state.start_waiters, true);
    }

    fn on_advertise_failure(&self, advertise_error: AdvertiseError) {
        warn!(error = %advertise_error, "Advertising failed to start");
        let mut state = self.state.lock();
        state.phase = Phase::Idle;
        resolve_all(&mut state.start_waiters, false);
    }

    fn on_advertising_stopped(&self) {
        info!("Advertising stopped");
        let mut state = self.state.lock();
        state.phase = Phase::Idle;
        resolve_all(&mut state.stop_waiters, true);
        // A stop that overtook a pending start leaves nobody to confirm the start.
        resolve_all(&mut state.start_waiters, false);
    }

    fn on_characteristic_read(&self, central: &CentralInfo, characteristic: Uuid) -> Option<Vec<u8>> {
        let value = if characteristic == IDENTITY_CHARACTERISTIC_UUID {
            self.identity_payload()
        } else {
            None
        };

        info!(
            characteristic = %characteristic,
            value = ?value.as_deref().map(String::from_utf8_lossy),
            central_address = %central.address,
            central_name = ?central.name,
            "Characteristic read requested"
        );

        value
    }
}
