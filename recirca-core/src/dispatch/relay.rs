use std::sync::Arc;

use recirca_model::{DispatchEvent, LocationUpdate, UserId};
use tracing::debug;

use crate::dispatch::sink::EventSink;
use crate::error::Result;
use crate::store::RequestStore;

/// Forwards a claimant's position stream to the requester while the
/// request is `claimed`.
///
/// No history is retained; only the latest position is ever relevant.
/// Ticks for a request that is no longer claimed, or from a sender who is
/// not its claimant, are dropped silently. Updates may arrive out of order
/// relative to a terminal transition, so a stale tick is expected and
/// bounded to exactly that: one stale tick, never a stale state.
pub struct LocationRelay {
    store: Arc<dyn RequestStore>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for LocationRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationRelay").finish_non_exhaustive()
    }
}

impl LocationRelay {
    pub fn new(store: Arc<dyn RequestStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// Forward one position tick from `sender` if it passes the
    /// still-claimed, still-claimant guard.
    pub async fn forward(
        &self,
        sender: UserId,
        update: LocationUpdate,
    ) -> Result<()> {
        let Some(request) = self.store.get(update.request_id).await? else {
            debug!(request_id = %update.request_id, "location tick for unknown request dropped");
            return Ok(());
        };

        if !request.is_claimed_by(sender) {
            debug!(
                request_id = %update.request_id,
                state = request.state.as_str(),
                "stale location tick dropped"
            );
            return Ok(());
        }

        self.sink
            .push_to_user(
                request.requester_id,
                DispatchEvent::Location {
                    request_id: update.request_id,
                    lat: update.position.latitude,
                    lng: update.position.longitude,
                },
            )
            .await;

        Ok(())
    }
}
