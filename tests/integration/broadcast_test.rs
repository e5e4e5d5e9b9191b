// tests/integration/broadcast_test.rs

//! Fan-out of location updates to registered sessions.

use super::test_helpers::{
    RecordingProvider, RecordingStatus, new_hub, sample_fix, split_frame,
};
use gnss_share::connection::ClientSession;
use gnss_share::core::protocol::ServerResponse;
use gnss_share::core::state::ServerStatus;
use std::net::SocketAddr;

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

#[tokio::test]
async fn test_broadcast_sends_identical_frames_to_all_members() {
    let hub = new_hub(RecordingProvider::new(), RecordingStatus::new());
    let (first, mut first_rx) = ClientSession::new(1, addr(5001));
    let (second, mut second_rx) = ClientSession::new(2, addr(5002));
    assert!(hub.register(first));
    assert!(hub.register(second));

    hub.on_fix_received(sample_fix(50.0, 19.9));

    assert!(first_rx.has_changed().unwrap());
    assert!(second_rx.has_changed().unwrap());
    let first_frame = first_rx.borrow_and_update().clone().unwrap();
    let second_frame = second_rx.borrow_and_update().clone().unwrap();
    assert_eq!(first_frame, second_frame);

    let (len, payload) = split_frame(&first_frame);
    assert_eq!(len as usize, payload.len());
    let response = ServerResponse::decode(&payload).unwrap();
    assert_eq!(
        response.server_status(),
        Some(ServerStatus::TransmittingLocation)
    );
    assert_eq!(response.location_update.unwrap().latitude, 50.0);
}

#[tokio::test]
async fn test_deregistered_session_receives_nothing() {
    let hub = new_hub(RecordingProvider::new(), RecordingStatus::new());
    let (stays, mut stays_rx) = ClientSession::new(1, addr(5001));
    let (leaves, mut leaves_rx) = ClientSession::new(2, addr(5002));
    hub.register(stays);
    hub.register(leaves.clone());

    assert!(hub.deregister(2));
    hub.on_fix_received(sample_fix(1.0, 1.0));

    assert!(stays_rx.has_changed().unwrap());
    assert!(!leaves_rx.has_changed().unwrap());
    assert!(leaves_rx.borrow_and_update().is_none());
}

#[tokio::test]
async fn test_deregister_twice_returns_false() {
    let status = RecordingStatus::new();
    let hub = new_hub(RecordingProvider::new(), status.clone());
    let (session, _rx) = ClientSession::new(1, addr(5001));
    hub.register(session);

    assert!(hub.deregister(1));
    assert!(!hub.deregister(1));
    // Presentation hears about every teardown attempt, even a redundant one.
    assert_eq!(*status.memberships.lock(), vec![1, 0, 0]);
}

#[tokio::test]
async fn test_newer_frame_replaces_unsent_one() {
    let hub = new_hub(RecordingProvider::new(), RecordingStatus::new());
    let (session, mut rx) = ClientSession::new(1, addr(5001));
    hub.register(session);

    hub.on_fix_received(sample_fix(1.0, 1.0));
    hub.on_fix_received(sample_fix(2.0, 2.0));

    let frame = rx.borrow_and_update().clone().unwrap();
    let (_, payload) = split_frame(&frame);
    let response = ServerResponse::decode(&payload).unwrap();
    assert_eq!(response.location_update.unwrap().latitude, 2.0);
}

#[tokio::test]
async fn test_satellite_count_is_not_broadcast() {
    let status = RecordingStatus::new();
    let hub = new_hub(RecordingProvider::new(), status.clone());
    let (session, mut rx) = ClientSession::new(1, addr(5001));
    hub.register(session);
    let states_before = status.state_count();

    hub.on_satellite_count_changed(11);

    assert!(!rx.has_changed().unwrap());
    assert_eq!(hub.snapshot().satellites, 11);
    // No fix yet, so presentation hears about it.
    assert_eq!(status.state_count(), states_before + 1);

    hub.on_fix_received(sample_fix(3.0, 4.0));
    let frame = rx.borrow_and_update().clone().unwrap();
    let (_, payload) = split_frame(&frame);
    assert_eq!(ServerResponse::decode(&payload).unwrap().satellites, 11);

    let states_before = status.state_count();
    hub.on_satellite_count_changed(12);
    assert_eq!(status.state_count(), states_before);
}

#[tokio::test]
async fn test_fix_after_provider_stopped_is_ignored() {
    let hub = new_hub(RecordingProvider::new(), RecordingStatus::new());
    hub.on_fix_received(sample_fix(1.0, 1.0));

    assert!(!hub.snapshot().has_location());
    assert_eq!(hub.snapshot().status, ServerStatus::Uninitialized);
}

#[tokio::test]
async fn test_closed_session_is_not_written() {
    let hub = new_hub(RecordingProvider::new(), RecordingStatus::new());
    let (session, mut rx) = ClientSession::new(1, addr(5001));
    hub.register(session.clone());

    session.disconnect();
    hub.on_fix_received(sample_fix(1.0, 1.0));

    assert!(!rx.has_changed().unwrap());
}

#[tokio::test]
async fn test_status_report_follows_hub_state() {
    let hub = new_hub(RecordingProvider::new(), RecordingStatus::new());
    assert_eq!(
        hub.status_report().to_string(),
        "No clients connected | GNSS inactive"
    );

    let (session, _rx) = ClientSession::new(1, addr(5001));
    hub.register(session);
    hub.on_satellite_count_changed(6);
    assert_eq!(
        hub.status_report().to_string(),
        "Clients connected: 1 | Satellites: 6"
    );

    hub.on_fix_received(sample_fix(1.0, 1.0));
    let report = hub.status_report();
    assert_eq!(report.clients, 1);
    assert!(report.provider_active);
    assert!(report.fix_age_secs.is_some());
    assert!(report.to_string().contains("Location age:"));
}

#[test]
fn test_snapshot_racing_a_fix_never_leaves_stale_frame() {
    let hub = new_hub(RecordingProvider::new(), RecordingStatus::new());
    let (session, mut rx) = ClientSession::new(1, addr(5001));
    hub.register(session.clone());

    for round in 1..=2000u32 {
        let latitude = f64::from(round) / 1000.0;
        let barrier = std::sync::Barrier::new(2);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                barrier.wait();
                hub.send_snapshot(&session).unwrap();
            });
            scope.spawn(|| {
                barrier.wait();
                hub.on_fix_received(sample_fix(latitude, 0.0));
            });
        });

        // Whichever push lands last must carry the newest state.
        let frame = rx.borrow_and_update().clone().unwrap();
        let (_, payload) = split_frame(&frame);
        let response = ServerResponse::decode(&payload).unwrap();
        assert_eq!(
            response.location_update.unwrap().latitude,
            latitude,
            "round {round} left an older frame in the outbox"
        );
    }
}
