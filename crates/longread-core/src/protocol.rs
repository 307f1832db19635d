//! BLE protocol constants shared by every participating device

use uuid::Uuid;

// ----------------------------------------------------------------------------
// Service and Characteristic UUIDs
// ----------------------------------------------------------------------------

/// Bluetooth SIG base UUID (`0000xxxx-0000-1000-8000-00805f9b34fb`)
const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805F9B34FB;

/// 16-bit short form of the identity service
pub const SERVICE_SHORT_UUID: u16 = 0xDEC3;

/// 16-bit short form of the identity characteristic
pub const IDENTITY_CHARACTERISTIC_SHORT_UUID: u16 = 0xE8A2;

/// Identity exchange service UUID
pub const SERVICE_UUID: Uuid = uuid_from_short(SERVICE_SHORT_UUID);

/// Read-only characteristic exposing the serialized identity record
pub const IDENTITY_CHARACTERISTIC_UUID: Uuid = uuid_from_short(IDENTITY_CHARACTERISTIC_SHORT_UUID);

/// Largest ATT MTU a central may request
pub const MAX_MTU: u16 = 517;

/// Expand a 16-bit short UUID onto the Bluetooth SIG base UUID
pub const fn uuid_from_short(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE_UUID | ((short as u128) << 96))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_uuid_matches_wire_form() {
        assert_eq!(
            SERVICE_UUID.to_string(),
            "0000dec3-0000-1000-8000-00805f9b34fb"
        );
        assert_eq!(
            IDENTITY_CHARACTERISTIC_UUID.to_string(),
            "0000e8a2-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_uuid_parsing_is_case_insensitive() {
        let upper = Uuid::parse_str("0000DEC3-0000-1000-8000-00805F9B34FB").unwrap();
        assert_eq!(upper, SERVICE_UUID);
    }

    #[test]
    fn test_service_and_characteristic_differ() {
        assert_ne!(SERVICE_UUID, IDENTITY_CHARACTERISTIC_UUID);
    }
}
