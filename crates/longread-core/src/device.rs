//! A discovered peer and the connect → read → disconnect sequence against it

use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::RadioError;
use crate::identity::IdentityRecord;
use crate::protocol::{IDENTITY_CHARACTERISTIC_UUID, SERVICE_UUID};
use crate::radio::{DiscoveryRecord, PeerHandle};

// ----------------------------------------------------------------------------
// Remote Device
// ----------------------------------------------------------------------------

/// Transient handle over one discovered peer.
///
/// Nothing retains a `RemoteDevice` after use; discovering the same peer again
/// produces a new instance. Clones share the same underlying peer handle.
#[derive(Debug, Clone)]
pub struct RemoteDevice {
    peer: Arc<dyn PeerHandle>,
    record: DiscoveryRecord,
    max_mtu: u16,
}

impl RemoteDevice {
    pub fn new(peer: Arc<dyn PeerHandle>, record: DiscoveryRecord, max_mtu: u16) -> Self {
        Self {
            peer,
            record,
            max_mtu,
        }
    }

    pub fn address(&self) -> String {
        self.peer.address()
    }

    /// Peer name, preferring the cached name over the advertised local name
    pub fn name(&self) -> Option<String> {
        self.peer.name().or_else(|| self.record.local_name.clone())
    }

    pub fn rssi(&self) -> Option<i16> {
        self.record.rssi
    }

    /// Advertisement that caused this peer to match
    pub fn discovery_record(&self) -> &DiscoveryRecord {
        &self.record
    }

    pub async fn is_connected(&self) -> bool {
        self.peer.is_connected().await
    }

    /// Connect and negotiate the largest MTU. Returns `false` if the
    /// connection could not be established.
    pub async fn connect(&self) -> bool {
        let address = self.peer.address();

        if let Err(e) = self.peer.connect().await {
            warn!(address = %address, "Connection failed: {}", e);
            return false;
        }

        match self.peer.request_mtu(self.max_mtu).await {
            Ok(mtu) => debug!(address = %address, mtu, "MTU negotiated"),
            Err(e) => warn!(address = %address, "MTU request failed, keeping default: {}", e),
        }

        true
    }

    /// Read and decode the peer's identity record
    pub async fn read_identity(&self) -> Option<IdentityRecord> {
        let text = self.read(SERVICE_UUID, IDENTITY_CHARACTERISTIC_UUID).await?;

        match IdentityRecord::from_json(&text) {
            Ok(record) => Some(record),
            Err(e) => {
                error!(address = %self.peer.address(), "Failed to parse device info: {}", e);
                None
            }
        }
    }

    /// Release the connection. Safe on an already-disconnected peer.
    pub async fn disconnect(&self) {
        if let Err(e) = self.peer.disconnect().await {
            debug!(address = %self.peer.address(), "Disconnect failed: {}", e);
        }
    }

    /// Connect, read the identity if connected, and always disconnect
    pub async fn exchange_identity(&self) -> Option<IdentityRecord> {
        let identity = if self.connect().await {
            self.read_identity().await
        } else {
            None
        };
        self.disconnect().await;
        identity
    }

    async fn read(&self, service: Uuid, characteristic: Uuid) -> Option<String> {
        if !self.peer.is_connected().await {
            warn!(
                address = %self.peer.address(),
                "Attempt to read characteristic from disconnected peripheral"
            );
            return None;
        }

        match self.peer.read_characteristic(service, characteristic).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    debug!(characteristic = %characteristic, value = %text, "Characteristic read");
                    Some(text)
                }
                Err(e) => {
                    error!(characteristic = %characteristic, "Characteristic value is not UTF-8: {}", e);
                    None
                }
            },
            Err(e @ RadioError::InvalidArgument { .. }) => {
                error!(
                    service = %service,
                    characteristic = %characteristic,
                    "Attempted to read an unreadable characteristic: {}",
                    e
                );
                None
            }
            Err(e) => {
                error!(
                    service = %service,
                    characteristic = %characteristic,
                    "Characteristic read failed: {}",
                    e
                );
                None
            }
        }
    }
}
