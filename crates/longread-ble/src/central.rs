//! Scanning and peer access through btleplug
//!
//! Scan commands are queued to a worker task that owns the adapter and its
//! event stream. Every advertisement event is resolved to a peripheral and
//! reported to the registered scan callback from that task.

use std::fmt;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Manager as _, Peripheral as _, PeripheralProperties,
    ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::{BoxStream, StreamExt};
use longread_core::{
    CentralRadio, DiscoveryRecord, PeerHandle, RadioError, ScanCallback, ScanFailure,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::BleConfig;
use crate::error::BleError;

// ----------------------------------------------------------------------------
// Adapter Selection
// ----------------------------------------------------------------------------

async fn select_adapter(config: &BleConfig) -> crate::Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    let Some(wanted) = config.adapter.as_deref() else {
        return adapters
            .into_iter()
            .next()
            .ok_or(BleError::AdapterNotAvailable);
    };

    for adapter in adapters {
        let info = adapter.adapter_info().await?;
        if info.starts_with(wanted) {
            return Ok(adapter);
        }
    }
    Err(BleError::AdapterNotFound(wanted.to_string()))
}

// ----------------------------------------------------------------------------
// Central Radio
// ----------------------------------------------------------------------------

enum Command {
    Scan {
        services: Vec<Uuid>,
        callback: Weak<dyn ScanCallback>,
    },
    StopScan,
    Close,
}

/// Central role backed by the btleplug adapter
pub struct BtleplugCentral {
    commands: mpsc::UnboundedSender<Command>,
}

impl BtleplugCentral {
    /// Open the configured adapter and start the scan worker
    pub async fn open(config: &BleConfig) -> crate::Result<Self> {
        let runtime =
            Handle::try_current().map_err(|e| BleError::RuntimeUnavailable(e.to_string()))?;
        let adapter = select_adapter(config).await?;
        let events = adapter
            .events()
            .await
            .map_err(|e| BleError::EventStreamFailed(e.to_string()))?;

        let (commands, receiver) = mpsc::unbounded_channel();
        runtime.spawn(ScanWorker::new(adapter).run(receiver, events));

        info!("BLE central initialized");
        Ok(Self { commands })
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("BLE central worker has stopped; command dropped");
        }
    }
}

impl CentralRadio for BtleplugCentral {
    fn scan_for_peripherals_with_services(
        &self,
        services: &[Uuid],
        callback: Weak<dyn ScanCallback>,
    ) {
        self.send(Command::Scan {
            services: services.to_vec(),
            callback,
        });
    }

    fn stop_scan(&self) {
        self.send(Command::StopScan);
    }

    fn close(&self) {
        self.send(Command::Close);
    }
}

// ----------------------------------------------------------------------------
// Scan Worker
// ----------------------------------------------------------------------------

struct ScanWorker {
    adapter: Adapter,
    callback: Option<Weak<dyn ScanCallback>>,
    scanning: bool,
}

impl ScanWorker {
    fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            callback: None,
            scanning: false,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: BoxStream<'static, CentralEvent>,
    ) {
        let mut events_open = true;

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Scan { services, callback }) => {
                        self.start_scan(services, callback).await;
                    }
                    Some(Command::StopScan) => self.stop_scan().await,
                    Some(Command::Close) | None => {
                        self.stop_scan().await;
                        break;
                    }
                },
                event = events.next(), if events_open => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        warn!("BLE event stream ended");
                        events_open = false;
                    }
                },
            }
        }

        debug!("BLE central worker stopped");
    }

    async fn start_scan(&mut self, services: Vec<Uuid>, callback: Weak<dyn ScanCallback>) {
        self.callback = Some(callback);

        match self.adapter.start_scan(ScanFilter { services }).await {
            Ok(()) => {
                self.scanning = true;
                debug!("BLE scan started");
            }
            Err(e) => {
                error!("Failed to start BLE scan: {}", e);
                if let Some(callback) = self.callback.as_ref().and_then(Weak::upgrade) {
                    callback.on_scan_failed(ScanFailure::Internal(e.to_string()));
                }
            }
        }
    }

    async fn stop_scan(&mut self) {
        if !std::mem::replace(&mut self.scanning, false) {
            return;
        }
        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop BLE scan: {}", e);
        }
    }

    async fn handle_event(&self, event: CentralEvent) {
        match event {
            CentralEvent::DeviceDiscovered(id)
            | CentralEvent::DeviceUpdated(id)
            | CentralEvent::ServicesAdvertisement { id, .. }
            | CentralEvent::ServiceDataAdvertisement { id, .. } => self.report(&id).await,
            _ => {}
        }
    }

    async fn report(&self, id: &PeripheralId) {
        if !self.scanning {
            return;
        }
        let Some(callback) = self.callback.as_ref().and_then(Weak::upgrade) else {
            return;
        };

        let peripheral = match self.adapter.peripheral(id).await {
            Ok(peripheral) => peripheral,
            Err(e) => {
                debug!("Discovered peripheral vanished: {}", e);
                return;
            }
        };
        let properties = match peripheral.properties().await {
            Ok(Some(properties)) => properties,
            Ok(None) => return,
            Err(e) => {
                debug!("Failed to read peripheral properties: {}", e);
                return;
            }
        };

        let record = discovery_record(&properties);
        let peer = BtleplugPeer::new(peripheral, &properties);
        callback.on_peripheral_discovered(Arc::new(peer), record);
    }
}

fn discovery_record(properties: &PeripheralProperties) -> DiscoveryRecord {
    DiscoveryRecord {
        service_uuids: properties.services.clone(),
        service_data: properties.service_data.clone(),
        local_name: properties.local_name.clone(),
        rssi: properties.rssi,
        tx_power_level: properties.tx_power_level,
    }
}

// ----------------------------------------------------------------------------
// Peer Handle
// ----------------------------------------------------------------------------

/// A discovered btleplug peripheral
#[derive(Clone)]
pub struct BtleplugPeer {
    peripheral: Peripheral,
    address: String,
    name: Option<String>,
}

impl BtleplugPeer {
    pub fn new(peripheral: Peripheral, properties: &PeripheralProperties) -> Self {
        Self {
            peripheral,
            address: properties.address.to_string(),
            name: properties.local_name.clone(),
        }
    }

    fn connection_failed(&self, err: btleplug::Error) -> RadioError {
        RadioError::ConnectionFailed {
            address: self.address.clone(),
            reason: err.to_string(),
        }
    }
}

impl fmt::Debug for BtleplugPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BtleplugPeer")
            .field("address", &self.address)
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl PeerHandle for BtleplugPeer {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn services(&self) -> Vec<Uuid> {
        self.peripheral
            .services()
            .iter()
            .map(|service| service.uuid)
            .collect()
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn connect(&self) -> Result<(), RadioError> {
        self.peripheral
            .connect()
            .await
            .map_err(|e| self.connection_failed(e))?;
        self.peripheral
            .discover_services()
            .await
            .map_err(|e| self.connection_failed(e))
    }

    async fn request_mtu(&self, mtu: u16) -> Result<u16, RadioError> {
        // The host stack negotiates the ATT MTU on connect.
        debug!(address = %self.address, mtu, "MTU exchange left to the host stack");
        Ok(mtu)
    }

    async fn read_characteristic(
        &self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<Vec<u8>, RadioError> {
        if !self.is_connected().await {
            return Err(RadioError::NotConnected {
                address: self.address.clone(),
            });
        }

        let target = self
            .peripheral
            .characteristics()
            .into_iter()
            .find(|c| {
                c.service_uuid == service
                    && c.uuid == characteristic
                    && c.properties.contains(CharPropFlags::READ)
            })
            .ok_or(RadioError::InvalidArgument {
                service,
                characteristic,
            })?;

        self.peripheral
            .read(&target)
            .await
            .map_err(|e| RadioError::Backend(e.to_string()))
    }

    async fn disconnect(&self) -> Result<(), RadioError> {
        self.peripheral
            .disconnect()
            .await
            .map_err(|e| RadioError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longread_core::SERVICE_UUID;

    #[test]
    fn test_discovery_record_copies_advertisement() {
        let mut properties = PeripheralProperties::default();
        properties.services = vec![SERVICE_UUID];
        properties.service_data.insert(SERVICE_UUID, vec![1, 2, 3]);
        properties.local_name = Some("Field Unit 7".to_string());
        properties.rssi = Some(-58);
        properties.tx_power_level = Some(1);

        let record = discovery_record(&properties);

        assert!(record.advertises(&SERVICE_UUID));
        assert_eq!(record.service_data.get(&SERVICE_UUID), Some(&vec![1, 2, 3]));
        assert_eq!(record.local_name.as_deref(), Some("Field Unit 7"));
        assert_eq!(record.rssi, Some(-58));
        assert_eq!(record.tx_power_level, Some(1));
    }

    #[test]
    fn test_empty_advertisement_matches_nothing() {
        let record = discovery_record(&PeripheralProperties::default());
        assert!(!record.advertises(&SERVICE_UUID));
        assert!(record.rssi.is_none());
    }
}
