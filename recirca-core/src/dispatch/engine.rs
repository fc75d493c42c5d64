use std::sync::Arc;

use chrono::Utc;
use recirca_model::{
    CreateRequestPayload, DispatchEvent, Identity, PickupRequest, RequestId,
    RequestState, UserId,
};
use tracing::info;

use crate::dispatch::sink::EventSink;
use crate::error::{DispatchError, Result};
use crate::store::{RequestStore, TransitionFields};

/// The request lifecycle state machine and claim arbitration.
///
/// The engine owns the authority to transition request state. Every
/// transition is a conditional store update; pushes happen only after the
/// store write commits, and a failed push never rolls a transition back.
pub struct LifecycleEngine {
    store: Arc<dyn RequestStore>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for LifecycleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEngine").finish_non_exhaustive()
    }
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn RequestStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// Create a new pending request and announce it to connected
    /// collectors. Collectors that connect later pick it up through the
    /// pending snapshot instead.
    pub async fn submit(
        &self,
        requester: Identity,
        payload: CreateRequestPayload,
    ) -> Result<PickupRequest> {
        if !requester.is_requester() {
            return Err(DispatchError::Conflict(
                "collectors cannot submit pickup requests".into(),
            ));
        }

        let request = PickupRequest::new(
            requester.user_id,
            payload.materials,
            payload.location,
        )?;
        self.store.create(&request).await?;

        info!(request_id = %request.id, "request created");
        self.sink.announce_created(&request).await;

        Ok(request)
    }

    /// Atomically claim a pending request for `collector`.
    ///
    /// Exactly one of any number of concurrent claims wins; losers get a
    /// conflict and nothing is broadcast on their behalf.
    pub async fn claim(
        &self,
        collector: Identity,
        id: RequestId,
    ) -> Result<PickupRequest> {
        if !collector.is_collector() {
            return Err(DispatchError::Conflict(
                "only collectors may claim requests".into(),
            ));
        }

        let updated = self
            .store
            .update_state(
                id,
                RequestState::Pending,
                RequestState::Claimed,
                TransitionFields::claim(collector.user_id, Utc::now()),
            )
            .await?;

        info!(request_id = %id, claimant = %collector.user_id, "request claimed");

        self.sink
            .push_to_user(
                updated.requester_id,
                DispatchEvent::Claimed {
                    request_id: id,
                    claimant_id: collector.user_id,
                },
            )
            .await;
        self.sink.withdraw(id, Some(collector.user_id)).await;

        Ok(updated)
    }

    /// Cancel a request. Only its requester may do so, from `pending` or
    /// `claimed`.
    pub async fn cancel(
        &self,
        actor: Identity,
        id: RequestId,
    ) -> Result<PickupRequest> {
        // A claim may race in between the read and the conditional write;
        // cancelling is still legal from the new state, so re-read once.
        for _ in 0..2 {
            let current = self
                .store
                .get(id)
                .await?
                .ok_or(DispatchError::NotFound(id))?;

            if current.requester_id != actor.user_id {
                return Err(DispatchError::Conflict(
                    "only the requester may cancel this request".into(),
                ));
            }
            if current.state.is_terminal() {
                return Err(DispatchError::Conflict(format!(
                    "request {id} is already {}",
                    current.state.as_str()
                )));
            }

            match self
                .store
                .update_state(
                    id,
                    current.state,
                    RequestState::Cancelled,
                    TransitionFields::terminal(Utc::now()),
                )
                .await
            {
                Ok(updated) => {
                    info!(request_id = %id, "request cancelled");
                    if let Some(claimant) = updated.claimant_id {
                        self.sink
                            .push_to_user(
                                claimant,
                                DispatchEvent::Cancelled { request_id: id },
                            )
                            .await;
                    }
                    if current.state == RequestState::Pending {
                        // Pull it out of collector candidate lists.
                        self.sink.withdraw(id, None).await;
                    }
                    self.sink.retire(id).await;
                    return Ok(updated);
                }
                Err(DispatchError::Conflict(_)) => continue,
                Err(err) => return Err(err),
            }
        }

        Err(DispatchError::Conflict(format!(
            "request {id} changed state concurrently"
        )))
    }

    /// Complete a claimed request. Either party may do so; the measured
    /// quantity is recorded when given.
    pub async fn complete(
        &self,
        actor: Identity,
        id: RequestId,
        collected_kg: Option<f64>,
    ) -> Result<PickupRequest> {
        if let Some(kg) = collected_kg {
            if !kg.is_finite() || kg < 0.0 {
                return Err(DispatchError::Validation(format!(
                    "collected quantity must be non-negative, got {kg} kg"
                )));
            }
        }

        let current = self
            .store
            .get(id)
            .await?
            .ok_or(DispatchError::NotFound(id))?;

        if !current.involves(actor.user_id) {
            return Err(DispatchError::Conflict(
                "only a party to the request may complete it".into(),
            ));
        }

        let mut fields = TransitionFields::terminal(Utc::now());
        fields.collected_kg = collected_kg;

        let updated = self
            .store
            .update_state(id, RequestState::Claimed, RequestState::Completed, fields)
            .await?;

        info!(request_id = %id, "request completed");

        let counterpart = if actor.user_id == updated.requester_id {
            updated.claimant_id
        } else {
            Some(updated.requester_id)
        };
        if let Some(user) = counterpart {
            self.sink
                .push_to_user(user, DispatchEvent::Completed { request_id: id })
                .await;
        }
        self.sink.retire(id).await;

        Ok(updated)
    }

    /// The pending set, for collector snapshot fetches on (re)connect.
    pub async fn pending_snapshot(&self) -> Result<Vec<PickupRequest>> {
        self.store.list_pending().await
    }

    /// The requester's current non-terminal request, for requester
    /// snapshot fetches on (re)connect.
    pub async fn active_for_requester(
        &self,
        requester: UserId,
    ) -> Result<Option<PickupRequest>> {
        self.store.active_for_requester(requester).await
    }

    /// Fetch one request. Pending requests are visible to any collector;
    /// anything else only to its parties.
    pub async fn fetch(
        &self,
        actor: Identity,
        id: RequestId,
    ) -> Result<PickupRequest> {
        let request = self
            .store
            .get(id)
            .await?
            .ok_or(DispatchError::NotFound(id))?;

        let visible = request.involves(actor.user_id)
            || (actor.is_collector() && request.state == RequestState::Pending);
        if !visible {
            return Err(DispatchError::NotFound(id));
        }

        Ok(request)
    }
}
