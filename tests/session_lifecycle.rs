mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockGateway;
use pinlink_lib::gateway::GatewayError;
use pinlink_lib::pins::{Availability, Designation, PinCatalog, PinError, PinValue, Rgb};
use pinlink_lib::session::{PinSession, SessionError, SessionState};

fn session_over(mock: &Arc<MockGateway>, call_timeout: Duration) -> PinSession {
    PinSession::new(mock.clone(), PinCatalog::esp32c3(), call_timeout)
}

#[tokio::test]
async fn test_connect_builds_pin_models() {
    common::init_logging();
    let mock = Arc::new(MockGateway::new("192.168.4.1"));
    let session = session_over(&mock, Duration::from_secs(1));

    let snapshot = session.connect().await.unwrap();
    assert_eq!(session.state().await, SessionState::Connected);
    assert_eq!(mock.calls(), vec!["fetch_designation", "fetch_values"]);

    let pin = |id| snapshot.pins.iter().find(|p| p.id == id).unwrap().clone();
    assert_eq!(pin(2).designation, Designation::Pwm);
    assert_eq!(pin(2).value, Some(PinValue::Level(50)));
    assert_eq!(pin(4).designation, Designation::Digital);
    assert_eq!(pin(4).value, Some(PinValue::Level(1)));
    assert_eq!(pin(5).designation, Designation::FastLed);
    assert_eq!(pin(5).value, Some(PinValue::Color(Rgb { r: 255, g: 100, b: 50 })));
    assert_eq!(pin(5).strip.as_ref().and_then(|s| s.num_leds), Some(30));
    assert_eq!(pin(8).availability, Availability::Reserved);
    assert_eq!(pin(8).role_label(), "Reserved");
    assert_eq!(pin(6).designation, Designation::Unassigned);
    assert!(snapshot.pins.iter().all(|p| !p.is_dirty()));

    let info = session.info().await;
    assert_eq!(info.host, "192.168.4.1");
    assert!(info.connected_at.is_some());
    assert_eq!(info.pending_edits, 0);
}

#[tokio::test]
async fn test_connect_timeout_leaves_session_disconnected() {
    let mock = Arc::new(MockGateway::new("esp32.local"));
    mock.delay("fetch_values", Duration::from_millis(500));
    let session = session_over(&mock, Duration::from_millis(50));

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, SessionError::DeviceUnreachable(GatewayError::Timeout)));
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert!(matches!(session.snapshot().await, Err(SessionError::NotConnected)));
    assert!(matches!(session.pin(2).await, Err(SessionError::NotConnected)));
}

#[tokio::test]
async fn test_connect_failure_then_retry() {
    let mock = Arc::new(MockGateway::new("esp32.local"));
    mock.fail("fetch_designation");
    let session = session_over(&mock, Duration::from_secs(1));

    let err = session.connect().await.unwrap_err();
    assert!(matches!(err, SessionError::DeviceUnreachable(GatewayError::Status(500))));
    assert_eq!(mock.count("fetch_values"), 0);
    assert_eq!(session.state().await, SessionState::Disconnected);

    mock.recover("fetch_designation");
    session.connect().await.unwrap();
    assert_eq!(session.state().await, SessionState::Connected);
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let mock = Arc::new(MockGateway::new("esp32.local"));
    let session = session_over(&mock, Duration::from_secs(1));
    session.connect().await.unwrap();

    assert!(matches!(session.connect().await, Err(SessionError::AlreadyConnected)));
    assert_eq!(mock.count("fetch_designation"), 1);
}

#[tokio::test]
async fn test_edits_before_connect_fail() {
    let mock = Arc::new(MockGateway::new("esp32.local"));
    let session = session_over(&mock, Duration::from_secs(1));

    assert!(matches!(
        session.set_value(2, 10).await,
        Err(SessionError::NotConnected)
    ));
    assert!(matches!(session.push().await, Err(SessionError::NotConnected)));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn test_reserved_pin_rejects_edits() {
    let mock = Arc::new(MockGateway::new("esp32.local"));
    let session = session_over(&mock, Duration::from_secs(1));
    session.connect().await.unwrap();
    let before = session.pin(8).await.unwrap();

    let err = session.set_designation(8, Designation::Pwm).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Pin(PinError::PinNotAvailable {
            id: 8,
            availability: Availability::Reserved
        })
    ));
    assert_eq!(session.pin(8).await.unwrap(), before);

    let err = session.set_value(42, 1).await.unwrap_err();
    assert!(matches!(err, SessionError::Pin(PinError::InvalidPin(42))));
}

#[tokio::test]
async fn test_disconnect_drops_models() {
    let mock = Arc::new(MockGateway::new("esp32.local"));
    let session = session_over(&mock, Duration::from_secs(1));
    session.connect().await.unwrap();
    session.set_value(2, 75).await.unwrap();

    session.disconnect().await.unwrap();
    assert_eq!(session.state().await, SessionState::Disconnected);
    assert!(matches!(session.snapshot().await, Err(SessionError::NotConnected)));
    assert!(matches!(session.disconnect().await, Err(SessionError::NotConnected)));

    // Reconnecting starts from the device state again.
    let snapshot = session.connect().await.unwrap();
    let pin = snapshot.pins.iter().find(|p| p.id == 2).unwrap();
    assert_eq!(pin.value, Some(PinValue::Level(50)));
}

#[tokio::test]
async fn test_passthrough_endpoints() {
    let mock = Arc::new(MockGateway::new("esp32.local"));
    let session = session_over(&mock, Duration::from_secs(1));

    // These do not need the pin models.
    assert_eq!(session.fetch_status().await.unwrap(), "Server is running");
    let log = session.fetch_log(Some(2)).await.unwrap();
    assert_eq!(log["logs"].as_array().unwrap().len(), 2);
    let networks = session.list_networks().await.unwrap();
    assert_eq!(networks["networks"][0]["ssid"], "workshop");

    mock.fail("fetch_device_info");
    assert!(matches!(
        session.fetch_device_info().await,
        Err(SessionError::DeviceUnreachable(_))
    ));
}
