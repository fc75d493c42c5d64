//! In-memory request store.
//!
//! Backs the test suite and the `memory` store mode. The dashmap entry lock
//! makes `update_state` an atomic check-and-set per request id, the same
//! guarantee the PostgreSQL backend gets from its conditional UPDATE.

use async_trait::async_trait;
use dashmap::DashMap;
use recirca_model::{PickupRequest, RequestId, RequestState, UserId};

use crate::error::{DispatchError, Result};
use crate::store::{RequestStore, TransitionFields};

#[derive(Debug, Default)]
pub struct MemoryRequestStore {
    requests: DashMap<RequestId, PickupRequest>,
}

impl MemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RequestStore for MemoryRequestStore {
    async fn create(&self, request: &PickupRequest) -> Result<()> {
        self.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<PickupRequest>> {
        Ok(self.requests.get(&id).map(|entry| entry.clone()))
    }

    async fn list_pending(&self) -> Result<Vec<PickupRequest>> {
        let mut pending: Vec<PickupRequest> = self
            .requests
            .iter()
            .filter(|entry| entry.state == RequestState::Pending)
            .map(|entry| entry.clone())
            .collect();
        pending.sort_by_key(|request| request.created_at);
        Ok(pending)
    }

    async fn active_for_requester(
        &self,
        requester: UserId,
    ) -> Result<Option<PickupRequest>> {
        let mut active: Vec<PickupRequest> = self
            .requests
            .iter()
            .filter(|entry| {
                entry.requester_id == requester && !entry.state.is_terminal()
            })
            .map(|entry| entry.clone())
            .collect();
        active.sort_by_key(|request| request.created_at);
        Ok(active.pop())
    }

    async fn update_state(
        &self,
        id: RequestId,
        expected: RequestState,
        new: RequestState,
        fields: TransitionFields,
    ) -> Result<PickupRequest> {
        // get_mut holds the shard lock for the duration of the mutation,
        // serializing competing transitions on the same id.
        let mut entry = self
            .requests
            .get_mut(&id)
            .ok_or(DispatchError::NotFound(id))?;

        if entry.state != expected {
            return Err(DispatchError::Conflict(format!(
                "request {id} is {}, expected {}",
                entry.state.as_str(),
                expected.as_str()
            )));
        }

        entry.state = new;
        if let Some(claimant) = fields.claimant_id {
            entry.claimant_id = Some(claimant);
        }
        if let Some(at) = fields.claimed_at {
            entry.claimed_at = Some(at);
        }
        if let Some(at) = fields.terminal_at {
            entry.terminal_at = Some(at);
        }
        if let Some(kg) = fields.collected_kg {
            entry.collected_kg = Some(kg);
        }

        Ok(entry.clone())
    }
}
