//! Lifecycle glue: permission check, advertiser and scanner start/stop, and the
//! identity exchange run against every discovered peer

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::advertiser::Advertiser;
use crate::config::EngineConfig;
use crate::device::RemoteDevice;
use crate::error::{LongreadError, Result};
use crate::identity::{DeviceInfoProvider, IdentityRecord};
use crate::permissions::{PermissionGate, PermissionPolicy};
use crate::radio::{CentralRadio, PeripheralRadio};
use crate::scanner::{PeripheralFoundListener, Scanner};

// ----------------------------------------------------------------------------
// Results
// ----------------------------------------------------------------------------

/// Outcome of [`Coordinator::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Scanning started; `advertising` reports whether the radio confirmed advertising
    Started { advertising: bool },
    /// Permissions were missing and have been requested from the host
    PermissionsRequested,
}

/// Identity read from a discovered peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredIdentity {
    pub address: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
    pub identity: IdentityRecord,
}

// ----------------------------------------------------------------------------
// Identity Exchange Listener
// ----------------------------------------------------------------------------

/// Runs connect → read → disconnect for every found peer on the runtime.
///
/// Advertisement updates for a peer already being read are skipped.
struct IdentityExchange {
    runtime: Handle,
    results: mpsc::UnboundedSender<DiscoveredIdentity>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl PeripheralFoundListener for IdentityExchange {
    fn on_peripheral_found(&self, device: RemoteDevice) {
        let address = device.address();
        if !self.in_flight.lock().insert(address.clone()) {
            debug!(address = %address, "Identity exchange already in progress");
            return;
        }

        let results = self.results.clone();
        let in_flight = self.in_flight.clone();
        self.runtime.spawn(async move {
            if let Some(identity) = device.exchange_identity().await {
                info!(
                    address = %address,
                    name = %identity.device_name,
                    model = %identity.model,
                    "Identity received"
                );
                let _ = results.send(DiscoveredIdentity {
                    address: address.clone(),
                    name: device.name(),
                    rssi: device.rssi(),
                    identity,
                });
            }
            in_flight.lock().remove(&address);
        });
    }
}

// ----------------------------------------------------------------------------
// Coordinator
// ----------------------------------------------------------------------------

struct Components {
    advertiser: Arc<Advertiser>,
    scanner: Arc<Scanner>,
    peripheral: Arc<dyn PeripheralRadio>,
    central: Arc<dyn CentralRadio>,
}

/// Owns the advertiser and scanner for one process
pub struct Coordinator {
    policy: PermissionPolicy,
    gate: Arc<dyn PermissionGate>,
    listener: Arc<dyn PeripheralFoundListener>,
    components: Mutex<Option<Components>>,
}

impl Coordinator {
    /// Build the engine over a radio pair. Identities read from peers are
    /// delivered on the returned receiver.
    pub fn new(
        central: Arc<dyn CentralRadio>,
        peripheral: Arc<dyn PeripheralRadio>,
        gate: Arc<dyn PermissionGate>,
        device_info: Arc<dyn DeviceInfoProvider>,
        config: &EngineConfig,
        api_level: u32,
    ) -> Result<(Self, mpsc::UnboundedReceiver<DiscoveredIdentity>)> {
        let runtime =
            Handle::try_current().map_err(|e| LongreadError::RuntimeUnavailable(e.to_string()))?;
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        let advertiser = Advertiser::new(peripheral.clone(), device_info, config);
        let scanner = Scanner::new(central.clone(), config)?;

        let coordinator = Self {
            policy: PermissionPolicy::for_api_level(api_level),
            gate,
            listener: Arc::new(IdentityExchange {
                runtime,
                results: results_tx,
                in_flight: Arc::new(Mutex::new(HashSet::new())),
            }),
            components: Mutex::new(Some(Components {
                advertiser,
                scanner,
                peripheral,
                central,
            })),
        };

        Ok((coordinator, results_rx))
    }

    /// Permission policy selected for this process
    pub fn permission_policy(&self) -> PermissionPolicy {
        self.policy
    }

    pub fn advertiser(&self) -> Option<Arc<Advertiser>> {
        self.components
            .lock()
            .as_ref()
            .map(|components| components.advertiser.clone())
    }

    pub fn scanner(&self) -> Option<Arc<Scanner>> {
        self.components
            .lock()
            .as_ref()
            .map(|components| components.scanner.clone())
    }

    /// Begin advertising and scanning once permissions are granted
    pub async fn start(&self) -> Result<StartOutcome> {
        let (advertiser, scanner) = self.handles().ok_or(LongreadError::ShutDown)?;

        if !self.gate.all_granted() {
            info!(permissions = ?self.policy.identifiers(), "Requesting Bluetooth permissions");
            self.gate.request(&self.policy);
            return Ok(StartOutcome::PermissionsRequested);
        }

        let advertising = advertiser.start_advertising(&[]).await;
        if !advertising {
            warn!("Advertising did not start; continuing with scanning only");
        }

        scanner.add_listener(self.listener.clone());
        scanner.start_scanning();

        Ok(StartOutcome::Started { advertising })
    }

    /// Stop advertising and scanning, keeping the radios for a later start
    pub async fn stop(&self) {
        if let Some((advertiser, scanner)) = self.handles() {
            self.stop_components(&advertiser, &scanner).await;
        }
    }

    /// Stop everything and release both radios. Safe to call repeatedly.
    pub async fn cleanup(&self) {
        let components = self.components.lock().take();
        let Some(components) = components else {
            return;
        };

        self.stop_components(&components.advertiser, &components.scanner)
            .await;
        components.peripheral.close();
        components.central.close();
        info!("BLE resources released");
    }

    async fn stop_components(&self, advertiser: &Advertiser, scanner: &Scanner) {
        advertiser.stop_advertising().await;
        scanner.remove_listener(&self.listener);
        scanner.stop_scanning();
    }

    fn handles(&self) -> Option<(Arc<Advertiser>, Arc<Scanner>)> {
        self.components
            .lock()
            .as_ref()
            .map(|components| (components.advertiser.clone(), components.scanner.clone()))
    }
}
