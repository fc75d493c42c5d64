//! End-to-end dispatch flows: engine, registry, and relay wired together
//! the way `main` wires them, with client reconcilers consuming the pushed
//! events.

use std::sync::Arc;

use chrono::Utc;
use recirca_client::{CollectorView, RequesterView};
use recirca_core::store::MemoryRequestStore;
use recirca_core::{
    DispatchError, LifecycleEngine, LocationRelay,
};
use recirca_model::{
    CreateRequestPayload, DispatchEvent, GeoPoint, Identity, LocationUpdate,
    MaterialEntry, MaterialType, Role, UserId,
};
use tokio::sync::mpsc;

use super::{drain, test_connection};
use crate::ws::SessionRegistry;

struct Harness {
    engine: Arc<LifecycleEngine>,
    relay: LocationRelay,
    registry: Arc<SessionRegistry>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryRequestStore::new());
    let registry = Arc::new(SessionRegistry::new());
    Harness {
        engine: Arc::new(LifecycleEngine::new(
            store.clone(),
            registry.clone(),
        )),
        relay: LocationRelay::new(store, registry.clone()),
        registry,
    }
}

fn plastic_payload() -> CreateRequestPayload {
    CreateRequestPayload {
        materials: vec![MaterialEntry {
            material: MaterialType::Plastic,
            quantity_kg: 2.0,
        }],
        location: GeoPoint {
            latitude: -12.04,
            longitude: -77.04,
        },
    }
}

fn feed(view: &mut CollectorView, rx: &mut mpsc::Receiver<DispatchEvent>) {
    for event in drain(rx) {
        view.apply(&event);
    }
}

#[tokio::test]
async fn claim_race_leaves_loser_without_the_request() {
    let h = harness();

    let citizen = Identity::new(UserId::new(), Role::Requester);
    let first = Identity::new(UserId::new(), Role::Collector);
    let second = Identity::new(UserId::new(), Role::Collector);

    let (first_conn, mut first_rx) = test_connection(first);
    let (second_conn, mut second_rx) = test_connection(second);
    let (citizen_conn, mut citizen_rx) = test_connection(citizen);
    h.registry.add_connection(first_conn);
    h.registry.add_connection(second_conn);
    h.registry.add_connection(citizen_conn);

    let request = h.engine.submit(citizen, plastic_payload()).await.unwrap();

    // Both collectors see the broadcast in their candidate list.
    let mut first_view = CollectorView::new();
    let mut second_view = CollectorView::new();
    feed(&mut first_view, &mut first_rx);
    feed(&mut second_view, &mut second_rx);
    assert_eq!(first_view.pending_len(), 1);
    assert_eq!(second_view.pending_len(), 1);

    // Both race for it; exactly one wins.
    let first_token = first_view.claim_optimistic(request.id).unwrap();
    let second_token = second_view.claim_optimistic(request.id).unwrap();

    let first_result = h.engine.claim(first, request.id).await;
    let second_result = h.engine.claim(second, request.id).await;
    let won = first_result.unwrap();
    assert!(matches!(
        second_result,
        Err(DispatchError::Conflict(_))
    ));

    first_view.confirm(first_token, Some(won));
    second_view.rollback(second_token);
    feed(&mut first_view, &mut first_rx);
    feed(&mut second_view, &mut second_rx);

    // The loser's view no longer lists the request anywhere.
    assert_eq!(second_view.pending_len(), 0);
    assert!(second_view.active().is_none());
    assert!(first_view.active().is_some());

    // The requester was told who claimed.
    let citizen_events = drain(&mut citizen_rx);
    assert!(citizen_events.iter().any(|event| matches!(
        event,
        DispatchEvent::Claimed { claimant_id, .. }
            if *claimant_id == first.user_id
    )));
}

#[tokio::test]
async fn location_stream_reaches_requester_until_completion() {
    let h = harness();

    let citizen = Identity::new(UserId::new(), Role::Requester);
    let hauler = Identity::new(UserId::new(), Role::Collector);

    let (hauler_conn, mut hauler_rx) = test_connection(hauler);
    let (citizen_conn, mut citizen_rx) = test_connection(citizen);
    h.registry.add_connection(hauler_conn);
    h.registry.add_connection(citizen_conn);

    let request = h.engine.submit(citizen, plastic_payload()).await.unwrap();

    let mut citizen_view = RequesterView::new();
    let token = citizen_view.submit_optimistic(request.clone());
    citizen_view.confirm(token, Some(request.clone()));

    h.engine.claim(hauler, request.id).await.unwrap();
    drain(&mut hauler_rx);

    // The hauler is en route and keeps reporting position.
    let tick = LocationUpdate {
        request_id: request.id,
        collector_id: hauler.user_id,
        position: GeoPoint {
            latitude: -12.05,
            longitude: -77.05,
        },
        timestamp: Utc::now(),
    };
    h.relay.forward(hauler.user_id, tick).await.unwrap();

    for event in drain(&mut citizen_rx) {
        citizen_view.apply(&event);
    }
    let estimate = citizen_view.estimate().unwrap();
    assert!(estimate.distance_km > 0.0);
    assert!(estimate.eta_minutes >= 1);
    assert_eq!(
        citizen_view.claimant_position().unwrap().latitude,
        -12.05
    );

    // Handover happens; a straggler tick must not resurface.
    h.engine
        .complete(hauler, request.id, Some(1.9))
        .await
        .unwrap();
    let stale = LocationUpdate {
        request_id: request.id,
        collector_id: hauler.user_id,
        position: GeoPoint {
            latitude: -12.06,
            longitude: -77.06,
        },
        timestamp: Utc::now(),
    };
    h.relay.forward(hauler.user_id, stale).await.unwrap();

    for event in drain(&mut citizen_rx) {
        citizen_view.apply(&event);
    }
    assert!(citizen_view.active().is_none());
    assert!(citizen_view.claimant_position().is_none());
    let notice = citizen_view.take_terminal_notice().unwrap();
    assert_eq!(notice.request_id, request.id);
}

#[tokio::test]
async fn cancellation_of_pending_request_clears_collector_lists() {
    let h = harness();

    let citizen = Identity::new(UserId::new(), Role::Requester);
    let hauler = Identity::new(UserId::new(), Role::Collector);

    let (hauler_conn, mut hauler_rx) = test_connection(hauler);
    h.registry.add_connection(hauler_conn);

    let request = h.engine.submit(citizen, plastic_payload()).await.unwrap();

    let mut view = CollectorView::new();
    feed(&mut view, &mut hauler_rx);
    assert_eq!(view.pending_len(), 1);

    h.engine.cancel(citizen, request.id).await.unwrap();
    feed(&mut view, &mut hauler_rx);
    assert_eq!(view.pending_len(), 0);

    // All per-request bookkeeping is gone.
    assert!(h.registry.interested_in(request.id).is_empty());
}

#[tokio::test]
async fn snapshot_covers_collectors_who_missed_the_broadcast() {
    let h = harness();

    let citizen = Identity::new(UserId::new(), Role::Requester);
    let request = h.engine.submit(citizen, plastic_payload()).await.unwrap();

    // This collector connected after the broadcast.
    let mut view = CollectorView::new();
    view.reset_from_snapshot(h.engine.pending_snapshot().await.unwrap());
    assert_eq!(view.pending_len(), 1);
    assert_eq!(
        view.pending_requests().next().unwrap().id,
        request.id
    );
}
