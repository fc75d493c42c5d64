mod dispatch_flow_tests;
mod registry_tests;

use std::sync::Arc;

use recirca_model::{DispatchEvent, Identity};
use tokio::sync::mpsc;

use crate::ws::Connection;

/// A registered connection plus the receiving end of its channel.
pub(crate) fn test_connection(
    identity: Identity,
) -> (Arc<Connection>, mpsc::Receiver<DispatchEvent>) {
    let (tx, rx) = mpsc::channel(16);
    (Arc::new(Connection::new(identity, tx)), rx)
}

/// Everything currently queued on a connection's channel.
pub(crate) fn drain(
    rx: &mut mpsc::Receiver<DispatchEvent>,
) -> Vec<DispatchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
