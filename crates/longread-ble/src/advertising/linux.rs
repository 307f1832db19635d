//! Linux peripheral implementation using bluer (BlueZ)

use std::collections::BTreeSet;
use std::sync::Arc;

use bluer::adv::{Advertisement, AdvertisementHandle, Type as AdvertisementType};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicRead, CharacteristicReadRequest,
    ReqError, Service,
};
use longread_core::{
    AdvertiseData, AdvertiseError, AdvertiseSettings, CentralInfo, GattService, PeripheralEvents,
    PeripheralRadio,
};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::long_read::{LongReadCache, LongReadError};
use super::EventSink;
use crate::config::BleConfig;
use crate::error::BleError;

// ----------------------------------------------------------------------------
// Peripheral Radio
// ----------------------------------------------------------------------------

enum Command {
    Start {
        settings: AdvertiseSettings,
        data: AdvertiseData,
        scan_response: AdvertiseData,
    },
    Stop,
    Close,
}

/// Peripheral role backed by a BlueZ session
pub struct BluezPeripheral {
    commands: mpsc::UnboundedSender<Command>,
    events: Arc<EventSink>,
    services: Arc<Mutex<Vec<GattService>>>,
}

impl BluezPeripheral {
    /// Open a BlueZ session on the configured adapter and start the worker
    pub async fn open(config: &BleConfig) -> crate::Result<Self> {
        let runtime =
            Handle::try_current().map_err(|e| BleError::RuntimeUnavailable(e.to_string()))?;

        let session = bluer::Session::new().await?;
        let adapter = match config.adapter.as_deref() {
            Some(name) => session.adapter(name)?,
            None => session.default_adapter().await?,
        };

        if config.power_on && !adapter.is_powered().await? {
            adapter.set_powered(true).await?;
            info!(adapter = %adapter.name(), "Powered on BLE adapter");
        }

        let events = Arc::new(EventSink::default());
        let services = Arc::new(Mutex::new(Vec::new()));
        let (commands, receiver) = mpsc::unbounded_channel();

        let worker = AdvertiseWorker {
            _session: session,
            adapter,
            events: events.clone(),
            services: services.clone(),
            reads: Arc::new(Mutex::new(LongReadCache::new())),
            application: None,
            advertisement: None,
        };
        runtime.spawn(worker.run(receiver));

        info!("Linux BLE peripheral initialized");
        Ok(Self {
            commands,
            events,
            services,
        })
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("BLE peripheral worker has stopped; command dropped");
        }
    }
}

impl PeripheralRadio for BluezPeripheral {
    fn set_event_handler(&self, handler: std::sync::Weak<dyn PeripheralEvents>) {
        self.events.set(handler);
    }

    fn add_service(&self, service: GattService) {
        debug!(service = %service.uuid, "GATT service registered");
        self.services.lock().push(service);
    }

    fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertiseData,
        scan_response: &AdvertiseData,
    ) {
        self.send(Command::Start {
            settings: settings.clone(),
            data: data.clone(),
            scan_response: scan_response.clone(),
        });
    }

    fn stop_advertising(&self) {
        self.send(Command::Stop);
    }

    fn close(&self) {
        self.send(Command::Close);
    }
}

// ----------------------------------------------------------------------------
// Advertise Worker
// ----------------------------------------------------------------------------

struct AdvertiseWorker {
    _session: bluer::Session,
    adapter: bluer::Adapter,
    events: Arc<EventSink>,
    services: Arc<Mutex<Vec<GattService>>>,
    reads: Arc<Mutex<LongReadCache>>,
    application: Option<ApplicationHandle>,
    advertisement: Option<AdvertisementHandle>,
}

impl AdvertiseWorker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Start {
                    settings,
                    data,
                    scan_response,
                } => self.start(&settings, &data, &scan_response).await,
                Command::Stop => self.stop(),
                Command::Close => break,
            }
        }

        // Dropping the handles unregisters the advertisement and GATT application
        self.advertisement = None;
        self.application = None;
        debug!("BLE peripheral worker stopped");
    }

    async fn start(
        &mut self,
        settings: &AdvertiseSettings,
        data: &AdvertiseData,
        scan_response: &AdvertiseData,
    ) {
        if self.advertisement.is_some() {
            self.notify_failure(AdvertiseError::AlreadyStarted);
            return;
        }

        match self.advertise(settings, data, scan_response).await {
            Ok(handle) => {
                self.advertisement = Some(handle);
                info!(adapter = %self.adapter.name(), "Started BLE advertising");
                if let Some(handler) = self.events.get() {
                    handler.on_advertising_started();
                }
            }
            Err(e) => {
                error!("Failed to start BLE advertising: {}", e);
                self.notify_failure(AdvertiseError::Internal(e.to_string()));
            }
        }
    }

    fn stop(&mut self) {
        if self.advertisement.take().is_some() {
            info!("Stopped BLE advertising");
        }
        if let Some(handler) = self.events.get() {
            handler.on_advertising_stopped();
        }
    }

    fn notify_failure(&self, advertise_error: AdvertiseError) {
        if let Some(handler) = self.events.get() {
            handler.on_advertise_failure(advertise_error);
        }
    }

    async fn advertise(
        &mut self,
        settings: &AdvertiseSettings,
        data: &AdvertiseData,
        scan_response: &AdvertiseData,
    ) -> bluer::Result<AdvertisementHandle> {
        if self.application.is_none() {
            let application = self.application();
            self.application = Some(self.adapter.serve_gatt_application(application).await?);
        }

        let local_name = if data.include_device_name || scan_response.include_device_name {
            Some(self.adapter.alias().await?)
        } else {
            None
        };
        let tx_power = (data.include_tx_power_level || scan_response.include_tx_power_level)
            .then(|| settings.tx_power.dbm());

        let advertisement = Advertisement {
            advertisement_type: if settings.connectable {
                AdvertisementType::Peripheral
            } else {
                AdvertisementType::Broadcast
            },
            service_uuids: data
                .service_uuids
                .iter()
                .chain(&scan_response.service_uuids)
                .copied()
                .collect::<BTreeSet<_>>(),
            local_name,
            discoverable: Some(true),
            tx_power,
            min_interval: Some(settings.mode.interval()),
            max_interval: Some(settings.mode.interval()),
            timeout: settings.timeout(),
            ..Default::default()
        };

        self.adapter.advertise(advertisement).await
    }

    fn application(&self) -> Application {
        let services = self.services.lock().clone();

        Application {
            services: services
                .into_iter()
                .map(|service| Service {
                    uuid: service.uuid,
                    primary: true,
                    characteristics: service
                        .readable_characteristics
                        .into_iter()
                        .map(|uuid| self.readable_characteristic(uuid))
                        .collect(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn readable_characteristic(&self, uuid: Uuid) -> Characteristic {
        let events = self.events.clone();
        let reads = self.reads.clone();

        Characteristic {
            uuid,
            read: Some(CharacteristicRead {
                read: true,
                fun: Box::new(move |req: CharacteristicReadRequest| {
                    let events = events.clone();
                    let reads = reads.clone();
                    Box::pin(async move { serve_read(&events, &reads, uuid, &req) })
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

fn serve_read(
    events: &EventSink,
    reads: &Mutex<LongReadCache>,
    characteristic: Uuid,
    req: &CharacteristicReadRequest,
) -> Result<Vec<u8>, ReqError> {
    let central = CentralInfo {
        address: req.device_address.to_string(),
        name: None,
    };

    let result = reads.lock().read(
        &central.address,
        characteristic,
        usize::from(req.offset),
        usize::from(req.mtu),
        || {
            events
                .get()
                .and_then(|handler| handler.on_characteristic_read(&central, characteristic))
        },
    );

    result.map_err(|e| match e {
        LongReadError::InvalidOffset => {
            debug!(central = %central.address, offset = req.offset, "Invalid read offset");
            ReqError::InvalidOffset
        }
        LongReadError::Unavailable => ReqError::Failed,
    })
}
