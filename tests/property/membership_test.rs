// tests/property/membership_test.rs

//! Property-based tests for the coupling between membership and the provider.
//! Outside the grace window the provider is active exactly when someone is connected.

use crate::test_helpers::{RecordingProvider, RecordingStatus, new_hub};
use gnss_share::connection::ClientSession;
use proptest::prelude::*;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Op {
    Join(u8),
    Leave(u8),
    Wait(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6).prop_map(Op::Join),
        (0u8..6).prop_map(Op::Leave),
        (0u64..40).prop_map(Op::Wait),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 50,
        ..ProptestConfig::default()
    })]

    #[test]
    fn test_provider_tracks_membership(ops in proptest::collection::vec(op(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        rt.block_on(async {
            let provider = RecordingProvider::new();
            let hub = new_hub(provider.clone(), RecordingStatus::new());
            let addr = SocketAddr::from(([127, 0, 0, 1], 1));
            let mut members = HashSet::new();

            for op in ops {
                match op {
                    Op::Join(id) => {
                        if members.insert(id) {
                            let (session, _rx) = ClientSession::new(id as u64, addr);
                            assert!(hub.register(session));
                        }
                    }
                    Op::Leave(id) => {
                        assert_eq!(hub.deregister(id as u64), members.remove(&id));
                    }
                    Op::Wait(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                }

                assert_eq!(hub.client_count(), members.len());
                if !members.is_empty() {
                    assert!(hub.is_provider_active());
                    assert!(!hub.has_pending_stop());
                }
                assert!(provider.starts() >= provider.stops());
                assert!(provider.starts() - provider.stops() <= 1);
            }

            // Once everyone is gone and the grace period passes, the provider is off.
            for id in members.drain() {
                hub.deregister(id as u64);
            }
            tokio::time::sleep(Duration::from_secs(16)).await;
            assert!(!hub.is_provider_active());
            assert_eq!(provider.starts(), provider.stops());
        });
    }
}
