//! Remote device connect/read/disconnect tests


use std::sync::Arc;

use longread_core::{
    RadioError, RemoteDevice, IDENTITY_CHARACTERISTIC_UUID, MAX_MTU, SERVICE_UUID,
};
use test_utils::{record_with_services, sample_identity, MockPeer, PeerCall};

fn device_for(peer: &Arc<MockPeer>) -> RemoteDevice {
    RemoteDevice::new(peer.clone(), record_with_services(vec![SERVICE_UUID]), MAX_MTU)
}

fn identity_read() -> PeerCall {
    PeerCall::Read {
        service: SERVICE_UUID,
        characteristic: IDENTITY_CHARACTERISTIC_UUID,
    }
}

// ----------------------------------------------------------------------------
// Connect
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_connect_requests_max_mtu() {
    let peer = MockPeer::new("BB:00:00:00:00:01").into_arc();
    let device = device_for(&peer);

    assert!(device.connect().await);
    assert!(device.is_connected().await);
    assert_eq!(peer.calls(), vec![PeerCall::Connect, PeerCall::RequestMtu(517)]);
}

#[tokio::test]
async fn test_mtu_failure_keeps_connection() {
    let peer = MockPeer::new("BB:00:00:00:00:02")
        .with_mtu_failure()
        .into_arc();
    let device = device_for(&peer);

    assert!(device.connect().await);
    assert!(device.is_connected().await);
}

#[tokio::test]
async fn test_connect_failure_reports_false() {
    let peer = MockPeer::new("BB:00:00:00:00:03")
        .with_connect_failure()
        .into_arc();
    let device = device_for(&peer);

    assert!(!device.connect().await);
    assert_eq!(peer.calls(), vec![PeerCall::Connect]);
}

// ----------------------------------------------------------------------------
// Identity Read
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_read_while_disconnected_skips_radio() {
    let peer = MockPeer::new("BB:00:00:00:00:04")
        .serving(&sample_identity())
        .into_arc();
    let device = device_for(&peer);

    assert!(device.read_identity().await.is_none());
    assert!(peer.calls().is_empty());
}

#[tokio::test]
async fn test_read_decodes_identity() {
    let identity = sample_identity();
    let peer = MockPeer::new("BB:00:00:00:00:05")
        .serving(&identity)
        .into_arc();
    let device = device_for(&peer);

    assert!(device.connect().await);
    assert_eq!(device.read_identity().await, Some(identity));
    assert_eq!(peer.calls().last(), Some(&identity_read()));
}

#[tokio::test]
async fn test_unreadable_characteristic_yields_none() {
    let peer = MockPeer::new("BB:00:00:00:00:06")
        .with_read_result(Err(RadioError::InvalidArgument {
            service: SERVICE_UUID,
            characteristic: IDENTITY_CHARACTERISTIC_UUID,
        }))
        .into_arc();
    let device = device_for(&peer);

    assert!(device.connect().await);
    assert!(device.read_identity().await.is_none());
}

#[tokio::test]
async fn test_read_error_yields_none() {
    let peer = MockPeer::new("BB:00:00:00:00:07")
        .with_read_result(Err(RadioError::Backend("gatt status 133".to_string())))
        .into_arc();
    let device = device_for(&peer);

    assert!(device.connect().await);
    assert!(device.read_identity().await.is_none());
}

#[tokio::test]
async fn test_malformed_payloads_yield_none() {
    let encoded = sample_identity().encode().unwrap();
    let truncated = encoded[..encoded.len() / 2].to_vec();

    let payloads = vec![
        Vec::new(),
        b"not json".to_vec(),
        br#"{"uuid":"not-a-uuid"}"#.to_vec(),
        vec![0xff, 0xfe, 0x00],
        truncated,
    ];

    for payload in payloads {
        let peer = MockPeer::new("BB:00:00:00:00:08")
            .with_read_result(Ok(payload))
            .into_arc();
        let device = device_for(&peer);

        assert!(device.connect().await);
        assert!(device.read_identity().await.is_none());
    }
}

// ----------------------------------------------------------------------------
// Exchange
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_exchange_runs_full_sequence() {
    let identity = sample_identity();
    let peer = MockPeer::new("BB:00:00:00:00:09")
        .serving(&identity)
        .into_arc();
    let device = device_for(&peer);

    assert_eq!(device.exchange_identity().await, Some(identity));
    assert_eq!(
        peer.calls(),
        vec![
            PeerCall::Connect,
            PeerCall::RequestMtu(517),
            identity_read(),
            PeerCall::Disconnect,
        ]
    );
    assert!(!device.is_connected().await);
}

#[tokio::test]
async fn test_exchange_after_connect_failure_only_disconnects() {
    let peer = MockPeer::new("BB:00:00:00:00:0A")
        .with_connect_failure()
        .serving(&sample_identity())
        .into_arc();
    let device = device_for(&peer);

    assert!(device.exchange_identity().await.is_none());
    assert_eq!(peer.calls(), vec![PeerCall::Connect, PeerCall::Disconnect]);
}

#[tokio::test]
async fn test_exchange_disconnects_after_bad_payload() {
    let peer = MockPeer::new("BB:00:00:00:00:0B")
        .with_read_result(Ok(b"{}".to_vec()))
        .into_arc();
    let device = device_for(&peer);

    assert!(device.exchange_identity().await.is_none());
    assert_eq!(peer.calls().last(), Some(&PeerCall::Disconnect));
}

#[tokio::test]
async fn test_disconnect_is_safe_when_not_connected() {
    let peer = MockPeer::new("BB:00:00:00:00:0C").into_arc();
    let device = device_for(&peer);

    device.disconnect().await;
    device.disconnect().await;

    assert_eq!(peer.calls(), vec![PeerCall::Disconnect, PeerCall::Disconnect]);
}
