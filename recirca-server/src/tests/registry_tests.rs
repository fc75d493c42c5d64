use std::sync::Arc;

use recirca_core::EventSink;
use recirca_model::{
    DispatchEvent, GeoPoint, Identity, MaterialEntry, MaterialType,
    PickupRequest, RequestId, Role, UserId,
};
use tokio::sync::mpsc;

use super::{drain, test_connection};
use crate::ws::{Connection, SessionRegistry};

fn pending_request() -> PickupRequest {
    PickupRequest::new(
        UserId::new(),
        vec![MaterialEntry {
            material: MaterialType::Cardboard,
            quantity_kg: 6.0,
        }],
        GeoPoint {
            latitude: -12.04,
            longitude: -77.04,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn push_fans_out_to_all_sessions_of_a_user() {
    let registry = SessionRegistry::new();
    let user = Identity::new(UserId::new(), Role::Requester);

    // Multi-device: same user, two live sessions.
    let (phone, mut phone_rx) = test_connection(user);
    let (laptop, mut laptop_rx) = test_connection(user);
    registry.add_connection(phone);
    registry.add_connection(laptop);

    let event = DispatchEvent::Completed {
        request_id: RequestId::new(),
    };
    registry.push_to_user(user.user_id, event).await;

    assert_eq!(drain(&mut phone_rx).len(), 1);
    assert_eq!(drain(&mut laptop_rx).len(), 1);
}

#[tokio::test]
async fn push_to_offline_user_is_dropped() {
    let registry = SessionRegistry::new();
    registry
        .push_to_user(
            UserId::new(),
            DispatchEvent::Cancelled {
                request_id: RequestId::new(),
            },
        )
        .await;
    assert_eq!(registry.connection_count(), 0);
}

#[tokio::test]
async fn announce_reaches_collectors_only_and_records_interest() {
    let registry = SessionRegistry::new();

    let collector = Identity::new(UserId::new(), Role::Collector);
    let requester = Identity::new(UserId::new(), Role::Requester);
    let (collector_conn, mut collector_rx) = test_connection(collector);
    let (requester_conn, mut requester_rx) = test_connection(requester);
    registry.add_connection(collector_conn);
    registry.add_connection(requester_conn);

    let request = pending_request();
    registry.announce_created(&request).await;

    assert!(matches!(
        drain(&mut collector_rx).as_slice(),
        [DispatchEvent::Created { .. }]
    ));
    assert!(drain(&mut requester_rx).is_empty());
    assert_eq!(registry.interested_in(request.id).len(), 1);
}

#[tokio::test]
async fn withdraw_skips_the_winner_and_late_joiners() {
    let registry = SessionRegistry::new();

    let winner = Identity::new(UserId::new(), Role::Collector);
    let loser = Identity::new(UserId::new(), Role::Collector);
    let (winner_conn, mut winner_rx) = test_connection(winner);
    let (loser_conn, mut loser_rx) = test_connection(loser);
    registry.add_connection(winner_conn);
    registry.add_connection(loser_conn);

    let request = pending_request();
    registry.announce_created(&request).await;
    drain(&mut winner_rx);
    drain(&mut loser_rx);

    // A collector connecting after the broadcast never saw `created`, so
    // it must not receive the withdrawal either.
    let late = Identity::new(UserId::new(), Role::Collector);
    let (late_conn, mut late_rx) = test_connection(late);
    registry.add_connection(late_conn);

    registry.withdraw(request.id, Some(winner.user_id)).await;

    assert!(drain(&mut winner_rx).is_empty());
    assert!(matches!(
        drain(&mut loser_rx).as_slice(),
        [DispatchEvent::Withdrawn { request_id }] if *request_id == request.id
    ));
    assert!(drain(&mut late_rx).is_empty());
}

#[tokio::test]
async fn retire_drops_interest_tracking() {
    let registry = SessionRegistry::new();
    let collector = Identity::new(UserId::new(), Role::Collector);
    let (conn, mut rx) = test_connection(collector);
    registry.add_connection(conn);

    let request = pending_request();
    registry.announce_created(&request).await;
    drain(&mut rx);

    registry.retire(request.id).await;
    assert!(registry.interested_in(request.id).is_empty());

    registry.withdraw(request.id, None).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test]
async fn disconnect_prunes_all_indexes() {
    let registry = SessionRegistry::new();
    let collector = Identity::new(UserId::new(), Role::Collector);
    let (conn, _rx) = test_connection(collector);
    let conn_id = conn.id;
    registry.add_connection(conn);

    let request = pending_request();
    registry.announce_created(&request).await;

    registry.remove_connection(conn_id);
    assert_eq!(registry.connection_count(), 0);
    assert!(registry.connections_for(collector.user_id).is_empty());
    assert!(registry.interested_in(request.id).is_empty());
}

#[tokio::test]
async fn full_channel_drops_instead_of_blocking() {
    let registry = SessionRegistry::new();
    let user = Identity::new(UserId::new(), Role::Requester);

    let (tx, mut rx) = mpsc::channel(1);
    registry.add_connection(Arc::new(Connection::new(user, tx)));

    let event = DispatchEvent::Completed {
        request_id: RequestId::new(),
    };
    registry.push_to_user(user.user_id, event.clone()).await;
    registry.push_to_user(user.user_id, event).await;

    // The second push found the channel full and was dropped.
    assert_eq!(drain(&mut rx).len(), 1);
}
