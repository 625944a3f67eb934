//! Session-level tests against a scripted mock radio.

use std::time::Duration;

use tokio::net::UdpSocket;

use flex6k::objects::RadioObject;
use flex6k::session::{Session, SessionEvent, SessionOptions, SessionState};
use flex6k::{Error, StreamId};
use flex6k_proto::vita::{self, PacketClass};
use flex6k_test_harness::{MockRadio, MOCK_HANDLE, MOCK_VERSION};

/// Options tuned for fast tests: no pinger, ephemeral UDP port.
fn test_options() -> SessionOptions {
    SessionOptions {
        command_timeout: Duration::from_millis(500),
        handshake_timeout: Duration::from_secs(1),
        first_status_timeout: Duration::from_secs(1),
        keepalive: false,
        udp_port: 0,
        ..SessionOptions::default()
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}

#[tokio::test]
async fn connect_handshake_and_initial_commands() {
    let radio = MockRadio::start().await.unwrap();
    let session = Session::connect(&radio.packet(), test_options()).await.unwrap();

    assert_eq!(session.handle(), Some(MOCK_HANDLE));
    assert_eq!(session.version().as_deref(), Some(MOCK_VERSION));
    assert_eq!(session.state(), SessionState::Active);
    assert!(session.is_connected());

    // The registration/subscription burst went out.
    assert!(radio.wait_for_command("client gui", Duration::from_secs(1)).await);
    assert!(radio.wait_for_command("client program flex6k", Duration::from_secs(1)).await);
    assert!(radio.wait_for_command("sub slice all", Duration::from_secs(1)).await);
    assert!(radio.wait_for_command("client udpport", Duration::from_secs(1)).await);

    session.disconnect().await;
    assert!(!session.is_connected());
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn connect_times_out_without_first_status() {
    let radio = MockRadio::start_with(false).await.unwrap();
    let options = SessionOptions {
        first_status_timeout: Duration::from_millis(200),
        ..test_options()
    };
    let result = Session::connect(&radio.packet(), options).await;
    assert!(matches!(result, Err(Error::Timeout)));
}

#[tokio::test]
async fn request_returns_reply_data() {
    let radio = MockRadio::start().await.unwrap();
    radio.expect("info", 0, "model=\"FLEX-6600\",chassis_serial=\"1234\"");

    let session = Session::connect(&radio.packet(), test_options()).await.unwrap();
    // The connect burst already consumed a fire-and-forget `info`; script
    // a fresh reply for ours.
    radio.expect("info", 0, "model=\"FLEX-6600\",chassis_serial=\"1234\"");
    let data = session.request("info").await.unwrap();
    assert!(data.contains("FLEX-6600"));

    session.disconnect().await;
}

#[tokio::test]
async fn request_error_code_surfaces() {
    let radio = MockRadio::start().await.unwrap();
    let session = Session::connect(&radio.packet(), test_options()).await.unwrap();

    radio.expect("slice remove 99", 0x5000_0015, "invalid slice");
    let result = session.request("slice remove 99").await;
    match result {
        Err(Error::Command { code, message }) => {
            assert_eq!(code, 0x5000_0015);
            assert_eq!(message, "invalid slice");
        }
        other => panic!("expected Command error, got {other:?}"),
    }

    session.disconnect().await;
}

#[tokio::test]
async fn client_program_error_is_ignored() {
    let radio = MockRadio::start().await.unwrap();
    let session = Session::connect(&radio.packet(), test_options()).await.unwrap();

    radio.expect("client program", 0x5000_002C, "");
    let result = session.request("client program legacy").await;
    assert_eq!(result.unwrap(), "");

    session.disconnect().await;
}

#[tokio::test]
async fn out_of_order_replies_resolve_their_own_callers() {
    let radio = MockRadio::start().await.unwrap();
    let session = Session::connect(&radio.packet(), test_options()).await.unwrap();

    radio.withhold_replies("ant list");
    radio.withhold_replies("mic list");

    let session = std::sync::Arc::new(session);
    let a = tokio::spawn({
        let session = session.clone();
        async move { session.request("ant list").await }
    });
    let b = tokio::spawn({
        let session = session.clone();
        async move { session.request("mic list").await }
    });

    wait_until(|| radio.held().len() == 2).await;
    let held = radio.held();
    let (seq_a, _) = held.iter().find(|(_, c)| c == "ant list").unwrap();
    let (seq_b, _) = held.iter().find(|(_, c)| c == "mic list").unwrap();

    // Reply B first, then A.
    radio.push_raw(&format!("R{seq_b}|0|MIC,LINE"));
    radio.push_raw(&format!("R{seq_a}|0|ANT1,ANT2"));

    assert_eq!(a.await.unwrap().unwrap(), "ANT1,ANT2");
    assert_eq!(b.await.unwrap().unwrap(), "MIC,LINE");

    session.disconnect().await;
}

#[tokio::test]
async fn request_timeout_removes_pending_entry() {
    let radio = MockRadio::start().await.unwrap();
    let options = SessionOptions {
        command_timeout: Duration::from_millis(100),
        ..test_options()
    };
    let session = Session::connect(&radio.packet(), options).await.unwrap();

    radio.withhold_replies("radio uptime");
    let result = session.request("radio uptime").await;
    assert!(matches!(result, Err(Error::Timeout)));

    // A late reply to the expired sequence is an anomaly, not a fault.
    if let Some((seq, _)) = radio.held().first() {
        radio.push_raw(&format!("R{seq}|0|3600"));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.is_connected());

    session.disconnect().await;
}

#[tokio::test]
async fn status_lines_populate_registry() {
    let radio = MockRadio::start().await.unwrap();
    let session = Session::connect(&radio.packet(), test_options()).await.unwrap();

    radio.push_status("slice 3 in_use=1 RF_frequency=14.250000 pan=0x40000001 mode=USB");
    radio.push_status("display pan 0x40000001 center=14.200000 bandwidth=0.200000");

    let registry = session.registry().clone();
    wait_until(|| registry.slices.len() == 1 && registry.panadapters.len() == 1).await;

    let slice = registry.slices.get(&3).unwrap();
    assert!(slice.initialized());
    assert_eq!(slice.frequency_hz(), 14_250_000);
    assert_eq!(slice.panadapter, 0x4000_0001);

    // Removal line deletes the object.
    radio.push_status("slice 3 in_use=0");
    wait_until(|| registry.slices.is_empty()).await;

    session.disconnect().await;
}

#[tokio::test]
async fn forced_disconnect_tears_down_with_reason() {
    let radio = MockRadio::start().await.unwrap();
    let session = Session::connect(&radio.packet(), test_options()).await.unwrap();
    let mut events = session.events();

    radio.withhold_replies("radio uptime");
    let session = std::sync::Arc::new(session);
    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.request("radio uptime").await }
    });
    wait_until(|| radio.held().len() == 1).await;

    radio.push_status(&format!(
        "client 0x{MOCK_HANDLE:08X} disconnected forced=1 wan_validation_failed=0"
    ));

    // The in-flight request fails rather than hanging.
    let result = pending.await.unwrap();
    assert!(matches!(result, Err(Error::ConnectionLost)));
    assert!(!session.is_connected());

    let mut saw_reason = false;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Disconnected { reason } = event {
            assert_eq!(reason, "forced");
            saw_reason = true;
        }
    }
    assert!(saw_reason, "expected Disconnected event with reason");
}

#[tokio::test]
async fn peer_close_fails_pending_and_disconnects() {
    let radio = MockRadio::start().await.unwrap();
    let session = Session::connect(&radio.packet(), test_options()).await.unwrap();

    radio.withhold_replies("ant list");
    let session = std::sync::Arc::new(session);
    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.request("ant list").await }
    });
    wait_until(|| radio.held().len() == 1).await;

    radio.close_connection();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(Error::ConnectionLost)));
    wait_until(|| !session.is_connected()).await;

    // Registry is cleared on teardown.
    assert!(session.registry().slices.is_empty());

    // Disconnect after teardown is a no-op.
    session.disconnect().await;
}

#[tokio::test]
async fn keepalive_timeout_disconnects_with_reason() {
    let radio = MockRadio::start().await.unwrap();
    radio.withhold_replies("ping");

    let options = SessionOptions {
        keepalive: true,
        ping_interval: Duration::from_millis(50),
        ping_timeout: Duration::from_millis(250),
        ..test_options()
    };
    let session = Session::connect(&radio.packet(), options).await.unwrap();
    let mut events = session.events();

    wait_until(|| !session.is_connected()).await;

    let mut reason = None;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Disconnected { reason: r } = event {
            reason = Some(r);
        }
    }
    assert_eq!(reason.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn keepalive_replies_flip_client_initialized() {
    let radio = MockRadio::start().await.unwrap();
    let options = SessionOptions {
        keepalive: true,
        ping_interval: Duration::from_millis(50),
        ping_timeout: Duration::from_secs(10),
        ..test_options()
    };
    let session = Session::connect(&radio.packet(), options).await.unwrap();
    let mut events = session.events();

    // Two acked pings at 50 ms apart: initialized well within a second.
    let mut initialized = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(100), events.recv()).await {
            Ok(Ok(SessionEvent::ClientInitialized)) => {
                initialized = true;
                break;
            }
            Ok(Ok(_)) | Err(_) => {}
            Ok(Err(_)) => break,
        }
    }
    assert!(initialized, "expected ClientInitialized event");

    session.disconnect().await;
}

#[tokio::test]
async fn udp_meter_telemetry_reaches_registry() {
    let radio = MockRadio::start().await.unwrap();
    let session = Session::connect(&radio.packet(), test_options()).await.unwrap();

    // Describe the meter over "TCP".
    radio.push_status("meter 7.src=TX-#7.nam=FWDPWR#7.unit=Watts#7.fps=20");
    let registry = session.registry().clone();
    wait_until(|| registry.meters.len() == 1).await;

    // The session told the radio its UDP port; read it back from the log.
    let udpport_cmd = radio
        .commands()
        .into_iter()
        .find(|c| c.starts_with("client udpport"))
        .expect("client udpport sent");
    let port: u16 = udpport_cmd.rsplit(' ').next().unwrap().parse().unwrap();

    // Fire a meter packet at the session's socket.
    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut payload = Vec::new();
    payload.extend_from_slice(&7u16.to_be_bytes());
    payload.extend_from_slice(&75i16.to_be_bytes());
    let packet = vita::encode(PacketClass::Meter, 0x0800_0000 as StreamId, 0, 0, 0, &payload);
    sender.send_to(&packet, ("127.0.0.1", port)).await.unwrap();

    wait_until(|| registry.meters.get(&7).map(|m| m.value) == Some(75.0)).await;

    session.disconnect().await;
}
