//! Scanner restart watchdog and discovery matching tests


use std::sync::Arc;
use std::time::Duration;

use longread_core::{EngineConfig, PeripheralFoundListener, Scanner, SERVICE_UUID};
use test_utils::{record_with_services, CentralCall, MockCentral, MockPeer, RecordingListener};
use tokio::time::{sleep, Instant};
use uuid::Uuid;

fn create_scanner(radio: &Arc<MockCentral>) -> Arc<Scanner> {
    Scanner::new(radio.clone(), &EngineConfig::default()).unwrap()
}

async fn sleep_until_secs(origin: Instant, secs: u64) {
    tokio::time::sleep_until(origin + Duration::from_secs(secs)).await;
}

// ----------------------------------------------------------------------------
// Start and Stop
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_start_scans_for_identity_service() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);

    scanner.start_scanning();
    scanner.start_scanning();

    assert!(scanner.is_scanning());
    assert_eq!(radio.calls(), vec![CentralCall::Scan(vec![SERVICE_UUID])]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_issues_hardware_stop_once() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);

    scanner.stop_scanning();
    assert_eq!(radio.stop_scan_count(), 0);

    scanner.start_scanning();
    scanner.stop_scanning();
    scanner.stop_scanning();

    assert!(!scanner.is_scanning());
    assert_eq!(radio.stop_scan_count(), 1);
}

// ----------------------------------------------------------------------------
// Restart Watchdog
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_restart_cycle_stops_then_rescans_after_cooldown() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);
    let origin = Instant::now();

    scanner.start_scanning();

    sleep_until_secs(origin, 29).await;
    assert_eq!(radio.stop_scan_count(), 0);

    sleep_until_secs(origin, 31).await;
    assert_eq!(radio.stop_scan_count(), 1);
    assert_eq!(radio.scan_count(), 1);

    sleep_until_secs(origin, 39).await;
    assert_eq!(radio.scan_count(), 1);

    sleep_until_secs(origin, 41).await;
    assert_eq!(radio.scan_count(), 2);
    assert!(scanner.is_scanning());

    // Next cycle is measured from the rescan
    sleep_until_secs(origin, 71).await;
    assert_eq!(radio.stop_scan_count(), 2);

    sleep_until_secs(origin, 81).await;
    assert_eq!(radio.scan_count(), 3);
    assert_eq!(
        radio.calls()[..4],
        [
            CentralCall::Scan(vec![SERVICE_UUID]),
            CentralCall::StopScan,
            CentralCall::Scan(vec![SERVICE_UUID]),
            CentralCall::StopScan,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_cooldown_suppresses_rescan() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);
    let origin = Instant::now();

    scanner.start_scanning();
    sleep_until_secs(origin, 35).await;
    scanner.stop_scanning();

    sleep_until_secs(origin, 120).await;
    assert_eq!(radio.scan_count(), 1);
    assert!(!scanner.is_scanning());
}

#[tokio::test(start_paused = true)]
async fn test_stopped_scanner_never_restarts() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);

    scanner.start_scanning();
    scanner.stop_scanning();
    sleep(Duration::from_secs(120)).await;

    assert_eq!(radio.scan_count(), 1);
    assert_eq!(radio.stop_scan_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_leaves_a_single_timer() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);
    let origin = Instant::now();

    scanner.start_scanning();
    scanner.stop_scanning();
    scanner.start_scanning();

    sleep_until_secs(origin, 31).await;
    // One from stop_scanning, one from the single surviving restart timer
    assert_eq!(radio.stop_scan_count(), 2);

    sleep_until_secs(origin, 41).await;
    assert_eq!(radio.scan_count(), 3);
}

// ----------------------------------------------------------------------------
// Discovery Matching
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_matches_when_service_is_known_or_advertised() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);
    let listener = RecordingListener::new();
    scanner.add_listener(listener.clone());
    scanner.start_scanning();

    let known_only = MockPeer::new("AA:00:00:00:00:01")
        .with_known_services(vec![SERVICE_UUID])
        .into_arc();
    radio.discover(known_only, record_with_services(Vec::new()));

    let advertised_only = MockPeer::new("AA:00:00:00:00:02").into_arc();
    radio.discover(advertised_only, record_with_services(vec![SERVICE_UUID]));

    let both = MockPeer::new("AA:00:00:00:00:03")
        .with_known_services(vec![SERVICE_UUID])
        .into_arc();
    radio.discover(both, record_with_services(vec![SERVICE_UUID]));

    let found: Vec<String> = listener.found().iter().map(|d| d.address()).collect();
    assert_eq!(
        found,
        vec![
            "AA:00:00:00:00:01".to_string(),
            "AA:00:00:00:00:02".to_string(),
            "AA:00:00:00:00:03".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_ignores_peers_without_identity_service() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);
    let listener = RecordingListener::new();
    scanner.add_listener(listener.clone());
    scanner.start_scanning();

    let other = Uuid::new_v4();
    let peer = MockPeer::new("AA:00:00:00:00:04")
        .with_known_services(vec![other])
        .into_arc();
    radio.discover(peer, record_with_services(vec![other]));

    assert!(listener.found().is_empty());
}

#[tokio::test]
async fn test_found_device_carries_discovery_record() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);
    let listener = RecordingListener::new();
    scanner.add_listener(listener.clone());
    scanner.start_scanning();

    let peer = MockPeer::new("AA:00:00:00:00:05").into_arc();
    radio.discover(peer, record_with_services(vec![SERVICE_UUID]));

    let found = listener.found();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].rssi(), Some(-61));
    assert_eq!(found[0].name(), Some("peer-AA:00:00:00:00:05".to_string()));
    assert!(found[0].discovery_record().advertises(&SERVICE_UUID));
}

#[tokio::test]
async fn test_scan_failure_keeps_scanning() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);
    scanner.start_scanning();

    radio.fail_scan();

    assert!(scanner.is_scanning());
    assert_eq!(radio.stop_scan_count(), 0);
}

// ----------------------------------------------------------------------------
// Listeners
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_listener_registration_is_deduplicated() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);
    let listener = RecordingListener::new();
    let second = RecordingListener::new();

    scanner.add_listener(listener.clone());
    scanner.add_listener(listener.clone());
    scanner.add_listener(second.clone());
    assert_eq!(scanner.listener_count(), 2);

    scanner.start_scanning();
    let peer = MockPeer::new("AA:00:00:00:00:06").into_arc();
    radio.discover(peer, record_with_services(vec![SERVICE_UUID]));

    assert_eq!(listener.found().len(), 1);
    assert_eq!(second.found().len(), 1);
}

#[tokio::test]
async fn test_removed_listener_is_not_notified() {
    let radio = MockCentral::new();
    let scanner = create_scanner(&radio);
    let listener = RecordingListener::new();
    let registered: Arc<dyn PeripheralFoundListener> = listener.clone();

    scanner.add_listener(registered.clone());
    scanner.remove_listener(&registered);
    assert_eq!(scanner.listener_count(), 0);

    scanner.start_scanning();
    let peer = MockPeer::new("AA:00:00:00:00:07").into_arc();
    radio.discover(peer, record_with_services(vec![SERVICE_UUID]));

    assert!(listener.found().is_empty());
}
