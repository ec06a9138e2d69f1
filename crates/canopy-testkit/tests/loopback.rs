//! Testkit harness behaviour

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_matches::assert_matches;
use canopy_core::{Direction, NodeId, NodeTransport, TimeSource, TransportError};
use canopy_testkit::{ControllableClock, LoopbackTransport, RecordedCall, TreeFixture};

const OUTLINE: &[(u32, &str)] = &[(0, "Root"), (1, "First"), (1, "Second")];

fn loopback(fx: &TreeFixture) -> LoopbackTransport {
    LoopbackTransport::new(fx.service.clone(), fx.effects.clone())
}

#[tokio::test]
async fn loopback_records_calls_in_order() {
    let fx = TreeFixture::new(OUTLINE).await.unwrap();
    let transport = loopback(&fx);

    let envelope = transport
        .manage("/m?kvtree=1", fx.manage_request(Some(NodeId(2)), None))
        .await
        .unwrap();
    assert!(envelope.is_success());
    let envelope = transport
        .move_node(fx.move_request(NodeId(3), NodeId(2), Direction::Up))
        .await
        .unwrap();
    assert!(envelope.is_success());

    assert_eq!(
        transport.calls(),
        vec![
            RecordedCall::Manage {
                url: "/m?kvtree=1".to_string()
            },
            RecordedCall::Move,
        ]
    );
    assert_eq!(transport.manage_calls(), 1);
    assert_eq!(
        fx.effects.store.child_ids(Some(NodeId(1))).await,
        vec![NodeId(3), NodeId(2)]
    );
}

#[tokio::test]
async fn injected_failure_hits_one_request_only() {
    let fx = TreeFixture::new(OUTLINE).await.unwrap();
    let transport = loopback(&fx);
    transport.fail_next_request();

    let first = transport.remove(fx.remove_request(NodeId(3))).await;
    assert_matches!(first, Err(TransportError::Network { .. }));
    assert_eq!(fx.effects.store.len().await, 3);

    let second = transport.remove(fx.remove_request(NodeId(3))).await.unwrap();
    assert!(second.is_success());
    assert_eq!(transport.calls().len(), 2);
}

#[test]
fn clock_clones_share_time() {
    let clock = ControllableClock::new(10);
    let other = clock.clone();
    clock.advance(5);
    assert_eq!(other.now_ms(), 15);
    other.set(100);
    assert_eq!(clock.now_ms(), 100);
}
