// tests/integration/lifecycle_test.rs

//! Provider start/stop as clients come and go, on a paused clock.

use super::test_helpers::{
    RecordingProvider, RecordingStatus, new_hub, new_hub_with, sample_fix,
};
use gnss_share::connection::ClientSession;
use gnss_share::core::errors::ProviderError;
use gnss_share::core::hub::{HubSettings, ProviderActivity};
use gnss_share::core::provider::LocationSource;
use gnss_share::core::state::ServerStatus;
use std::net::SocketAddr;
use std::time::Duration;

fn session(id: u64) -> std::sync::Arc<ClientSession> {
    let (session, _rx) = ClientSession::new(id, SocketAddr::from(([10, 0, 0, 1], 9000)));
    session
}

#[tokio::test(start_paused = true)]
async fn test_first_client_starts_provider() {
    let provider = RecordingProvider::new();
    let hub = new_hub(provider.clone(), RecordingStatus::new());

    hub.register(session(1));
    hub.register(session(2));

    assert_eq!(provider.starts(), 1);
    assert_eq!(provider.sources(), vec![LocationSource::Gps]);
    assert!(hub.is_provider_active());
    assert_eq!(hub.snapshot().status, ServerStatus::AwaitingLocation);
}

#[tokio::test(start_paused = true)]
async fn test_provider_stops_after_grace_period() {
    let provider = RecordingProvider::new();
    let hub = new_hub(provider.clone(), RecordingStatus::new());

    hub.register(session(1));
    hub.deregister(1);
    assert_eq!(hub.provider_activity(), ProviderActivity::PendingStop);
    assert!(hub.has_pending_stop());

    tokio::time::sleep(Duration::from_millis(14_999)).await;
    assert_eq!(provider.stops(), 0);
    assert!(hub.is_provider_active());

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(provider.stops(), 1);
    assert_eq!(hub.provider_activity(), ProviderActivity::Idle);
    assert_eq!(hub.snapshot().status, ServerStatus::LocationStopped);
    assert!(!hub.has_pending_stop());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_within_grace_keeps_provider_running() {
    let provider = RecordingProvider::new();
    let hub = new_hub(provider.clone(), RecordingStatus::new());

    hub.register(session(1));
    hub.deregister(1);
    tokio::time::sleep(Duration::from_secs(10)).await;
    hub.register(session(2));
    assert!(!hub.has_pending_stop());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(provider.starts(), 1);
    assert_eq!(provider.stops(), 0);
    assert_eq!(hub.provider_activity(), ProviderActivity::Active);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_leave_reschedules_single_stop() {
    let provider = RecordingProvider::new();
    let hub = new_hub(provider.clone(), RecordingStatus::new());

    hub.register(session(1));
    hub.deregister(1);
    tokio::time::sleep(Duration::from_secs(10)).await;
    hub.register(session(2));
    hub.deregister(2);

    // The first timer would have fired at 15 s.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(provider.stops(), 0);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(provider.stops(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(provider.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop_keeps_last_fix() {
    let provider = RecordingProvider::new();
    let hub = new_hub_with(
        provider.clone(),
        RecordingStatus::new(),
        HubSettings {
            source: LocationSource::Network,
            stop_grace: Duration::from_secs(1),
        },
    );

    hub.register(session(1));
    hub.on_fix_received(sample_fix(10.0, 20.0));
    hub.deregister(1);
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(provider.stops(), 1);

    hub.register(session(2));
    assert_eq!(provider.starts(), 2);
    assert_eq!(
        provider.sources(),
        vec![LocationSource::Network, LocationSource::Network]
    );
    let snapshot = hub.snapshot();
    assert_eq!(snapshot.status, ServerStatus::AwaitingLocation);
    assert_eq!(snapshot.location.as_ref().unwrap().latitude, 10.0);
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_is_reported_without_retry() {
    let provider = RecordingProvider::failing(ProviderError::PermissionDenied(
        "ACCESS_FINE_LOCATION".to_string(),
    ));
    let status = RecordingStatus::new();
    let hub = new_hub(provider.clone(), status.clone());

    assert!(hub.register(session(1)));
    assert_eq!(provider.starts(), 1);
    assert_eq!(hub.provider_activity(), ProviderActivity::Idle);
    assert_eq!(hub.snapshot().status, ServerStatus::Uninitialized);
    let failures = status.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("permission denied"));

    // No retry while the client stays connected.
    hub.register(session(2));
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(provider.starts(), 1);

    // Leaving an idle provider schedules nothing.
    hub.deregister(1);
    hub.deregister(2);
    assert!(!hub.has_pending_stop());
    assert_eq!(provider.stops(), 0);

    provider.clear_failure();
    hub.register(session(3));
    assert_eq!(provider.starts(), 2);
    assert!(hub.is_provider_active());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_provider_and_disconnects() {
    let provider = RecordingProvider::new();
    let hub = new_hub(provider.clone(), RecordingStatus::new());
    let member = session(1);
    hub.register(member.clone());

    hub.shutdown();
    hub.shutdown();

    assert!(!hub.is_running());
    assert!(member.is_closed());
    assert_eq!(provider.stops(), 1);
    assert_eq!(hub.provider_activity(), ProviderActivity::Idle);

    // Teardown after shutdown must not schedule a stop.
    hub.deregister(1);
    assert!(!hub.has_pending_stop());

    let late = session(2);
    assert!(!hub.register(late.clone()));
    assert!(late.is_closed());
    assert_eq!(hub.client_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_stop() {
    let provider = RecordingProvider::new();
    let hub = new_hub(provider.clone(), RecordingStatus::new());
    hub.register(session(1));
    hub.deregister(1);
    assert!(hub.has_pending_stop());

    hub.shutdown();
    assert!(!hub.has_pending_stop());
    assert_eq!(provider.stops(), 1);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(provider.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_stop_that_already_fired_is_ignored() {
    let provider = RecordingProvider::new();
    let hub = new_hub(provider.clone(), RecordingStatus::new());

    hub.register(session(1));
    hub.deregister(1);
    let stale = hub.pending_stop_generation().unwrap();

    // Rejoin and leave again: the first stop is replaced but may already be running.
    hub.register(session(2));
    hub.deregister(2);
    let current = hub.pending_stop_generation().unwrap();
    assert_ne!(stale, current);

    // The replaced action runs late, as if its abort came too late.
    hub.stop_provider_if_idle(stale);
    assert_eq!(provider.stops(), 0);
    assert_eq!(hub.provider_activity(), ProviderActivity::PendingStop);
    assert!(hub.has_pending_stop());

    hub.stop_provider_if_idle(current);
    assert_eq!(provider.stops(), 1);
    assert_eq!(hub.provider_activity(), ProviderActivity::Idle);
    assert!(!hub.has_pending_stop());

    // The real timer for `current` fires later and must be a no-op.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(provider.stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stale_stop_ignored_while_client_connected() {
    let provider = RecordingProvider::new();
    let hub = new_hub(provider.clone(), RecordingStatus::new());

    hub.register(session(1));
    hub.deregister(1);
    let stale = hub.pending_stop_generation().unwrap();
    hub.register(session(2));

    hub.stop_provider_if_idle(stale);
    assert_eq!(provider.stops(), 0);
    assert_eq!(hub.provider_activity(), ProviderActivity::Active);
}
