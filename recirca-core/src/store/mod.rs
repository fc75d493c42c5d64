//! Request store port and backends.
//!
//! The store is the only durable, mutable shared resource in the system.
//! All writes to a given request id are serialized through the conditional
//! [`RequestStore::update_state`], which is what makes claim arbitration a
//! single atomic check-and-set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recirca_model::{PickupRequest, RequestId, RequestState, UserId};

use crate::error::Result;

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryRequestStore;
#[cfg(feature = "database")]
pub use postgres::PostgresRequestStore;

/// Write-once fields applied alongside a state transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionFields {
    pub claimant_id: Option<UserId>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub terminal_at: Option<DateTime<Utc>>,
    pub collected_kg: Option<f64>,
}

impl TransitionFields {
    /// Fields for a `pending -> claimed` transition.
    pub fn claim(claimant: UserId, at: DateTime<Utc>) -> Self {
        Self {
            claimant_id: Some(claimant),
            claimed_at: Some(at),
            ..Self::default()
        }
    }

    /// Fields for a transition into a terminal state.
    pub fn terminal(at: DateTime<Utc>) -> Self {
        Self {
            terminal_at: Some(at),
            ..Self::default()
        }
    }
}

/// Durable request storage.
///
/// `update_state` is conditional on the currently stored state: it succeeds
/// and returns the updated record only if the stored state equals
/// `expected`, and reports a conflict otherwise. Backends must make the
/// check-and-set atomic per request id.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn create(&self, request: &PickupRequest) -> Result<()>;

    async fn get(&self, id: RequestId) -> Result<Option<PickupRequest>>;

    /// All requests currently in the `pending` state, oldest first.
    async fn list_pending(&self) -> Result<Vec<PickupRequest>>;

    /// The requester's current non-terminal request, if any.
    async fn active_for_requester(
        &self,
        requester: UserId,
    ) -> Result<Option<PickupRequest>>;

    /// Conditionally transition `id` from `expected` to `new`, applying
    /// `fields`. Returns the updated record, `DispatchError::Conflict` when
    /// the stored state differs from `expected`, or
    /// `DispatchError::NotFound` for an unknown id.
    async fn update_state(
        &self,
        id: RequestId,
        expected: RequestState,
        new: RequestState,
        fields: TransitionFields,
    ) -> Result<PickupRequest>;
}
