//! Continuous discovery with a periodic restart watchdog
//!
//! Some radio stacks silently stop delivering results after a long continuous
//! scan. The scanner therefore stops the hardware scan every restart interval,
//! lets the radio settle for a cool-down, and starts it again while scanning
//! is still wanted.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::device::RemoteDevice;
use crate::error::{LongreadError, Result};
use crate::protocol::SERVICE_UUID;
use crate::radio::{CentralRadio, DiscoveryRecord, PeerHandle, ScanCallback, ScanFailure};

// ----------------------------------------------------------------------------
// Listener
// ----------------------------------------------------------------------------

/// Receives every peer that matches the identity service
pub trait PeripheralFoundListener: Send + Sync {
    /// Called synchronously from the discovery path; long work should be spawned
    fn on_peripheral_found(&self, device: RemoteDevice);
}

fn same_listener(a: &Arc<dyn PeripheralFoundListener>, b: &Arc<dyn PeripheralFoundListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

// ----------------------------------------------------------------------------
// Scanning State
// ----------------------------------------------------------------------------

/// Shortest watchdog interval accepted; anything lower would restart the scan in a busy loop
pub const MIN_SCAN_RESTART_INTERVAL: Duration = Duration::from_secs(1);

/// `restart_timer` is `Some` exactly while `active` is true.
///
/// `generation` changes on every start and stop. A restart cycle only acts
/// while the generation it was armed under is still current.
struct ScanningState {
    active: bool,
    generation: u64,
    restart_timer: Option<JoinHandle<()>>,
}

impl ScanningState {
    fn is_current(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }
}

// ----------------------------------------------------------------------------
// Scanner
// ----------------------------------------------------------------------------

/// Discovers peers advertising the identity service
pub struct Scanner {
    radio: Arc<dyn CentralRadio>,
    runtime: Handle,
    restart_interval: Duration,
    restart_cooldown: Duration,
    max_mtu: u16,
    state: Mutex<ScanningState>,
    listeners: Mutex<Vec<Arc<dyn PeripheralFoundListener>>>,
    weak_self: Weak<Scanner>,
}

impl Scanner {
    /// Create a scanner bound to the current tokio runtime
    pub fn new(radio: Arc<dyn CentralRadio>, config: &EngineConfig) -> Result<Arc<Self>> {
        let runtime =
            Handle::try_current().map_err(|e| LongreadError::RuntimeUnavailable(e.to_string()))?;

        let mut restart_interval = config.scan_restart_interval();
        if restart_interval < MIN_SCAN_RESTART_INTERVAL {
            warn!(
                requested = ?restart_interval,
                "Scan restart interval too short, using {:?}",
                MIN_SCAN_RESTART_INTERVAL
            );
            restart_interval = MIN_SCAN_RESTART_INTERVAL;
        }

        Ok(Arc::new_cyclic(|weak_self| Self {
            radio,
            runtime,
            restart_interval,
            restart_cooldown: config.scan_restart_cooldown(),
            max_mtu: config.max_mtu,
            state: Mutex::new(ScanningState {
                active: false,
                generation: 0,
                restart_timer: None,
            }),
            listeners: Mutex::new(Vec::new()),
            weak_self: weak_self.clone(),
        }))
    }

    pub fn add_listener(&self, listener: Arc<dyn PeripheralFoundListener>) {
        let mut listeners = self.listeners.lock();
        if !listeners.iter().any(|existing| same_listener(existing, &listener)) {
            listeners.push(listener);
        }
    }

    pub fn remove_listener(&self, listener: &Arc<dyn PeripheralFoundListener>) {
        self.listeners
            .lock()
            .retain(|existing| !same_listener(existing, listener));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().active
    }

    /// Start scanning; no-op when already active
    pub fn start_scanning(&self) {
        info!("Starting BLE scanning");

        let mut state = self.state.lock();
        if state.active {
            return;
        }

        state.active = true;
        state.generation += 1;
        self.scan();
        state.restart_timer = Some(self.spawn_restart_timer(state.generation));
    }

    /// Stop scanning and cancel the restart timer; idempotent
    pub fn stop_scanning(&self) {
        info!("Stopping BLE scanning");

        let mut state = self.state.lock();
        let was_active = std::mem::replace(&mut state.active, false);
        state.generation += 1;
        if let Some(timer) = state.restart_timer.take() {
            timer.abort();
        }
        if was_active {
            self.radio.stop_scan();
        }
    }

    // The state lock is held around every hardware scan command so start,
    // stop and the restart cycle issue them in the same order they change state.
    fn scan(&self) {
        let callback: Weak<dyn ScanCallback> = self.weak_self.clone();
        self.radio
            .scan_for_peripherals_with_services(&[SERVICE_UUID], callback);
    }

    fn spawn_restart_timer(&self, generation: u64) -> JoinHandle<()> {
        let scanner = self.weak_self.clone();
        let interval = self.restart_interval;

        self.runtime.spawn(async move {
            tokio::time::sleep(interval).await;
            if let Some(scanner) = scanner.upgrade() {
                scanner.restart_cycle(generation).await;
            }
        })
    }

    async fn restart_cycle(&self, generation: u64) {
        {
            let state = self.state.lock();
            if !state.is_current(generation) {
                return;
            }
            debug!("Stopping BLE scan for restart");
            self.radio.stop_scan();
        }

        tokio::time::sleep(self.restart_cooldown).await;

        // An abort from stop_scanning only lands at the next yield, so a task
        // already waiting here must rely on the generation check.
        let mut state = self.state.lock();
        if !state.is_current(generation) {
            debug!(generation, "Skipping restart armed before the last start/stop");
            return;
        }
        debug!("Restarting BLE scan");
        self.scan();
        // Replacing our own handle drops it without aborting the running task.
        state.restart_timer = Some(self.spawn_restart_timer(generation));
    }

    fn matches(peer: &dyn PeerHandle, record: &DiscoveryRecord) -> bool {
        peer.services().contains(&SERVICE_UUID) || record.advertises(&SERVICE_UUID)
    }
}

impl ScanCallback for Scanner {
    fn on_peripheral_discovered(&self, peer: Arc<dyn PeerHandle>, record: DiscoveryRecord) {
        if !Self::matches(peer.as_ref(), &record) {
            return;
        }

        debug!(name = ?peer.name(), address = %peer.address(), rssi = ?record.rssi, "BLE device found");

        let device = RemoteDevice::new(peer, record, self.max_mtu);
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.on_peripheral_found(device.clone());
        }
    }

    fn on_scan_failed(&self, failure: ScanFailure) {
        error!(scan_failure = %failure, "Scan failed");
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().restart_timer.take() {
            timer.abort();
        }
    }
}
