use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::geo::GeoPoint;
use crate::ids::{RequestId, UserId};
use crate::material::MaterialEntry;

/// Lifecycle state of a pickup request.
///
/// `Completed` and `Cancelled` are terminal: once reached, no field besides
/// audit metadata may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Pending,
    Claimed,
    Completed,
    Cancelled,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Completed | RequestState::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Claimed => "claimed",
            RequestState::Completed => "completed",
            RequestState::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestState::Pending),
            "claimed" => Some(RequestState::Claimed),
            "completed" => Some(RequestState::Completed),
            "cancelled" => Some(RequestState::Cancelled),
            _ => None,
        }
    }
}

/// A citizen's submission describing materials and pickup location.
///
/// Materials and location are immutable after creation; editing requires a
/// new request. Transition timestamps are write-once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickupRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    /// Absent until claimed, immutable once set.
    pub claimant_id: Option<UserId>,
    pub materials: Vec<MaterialEntry>,
    pub location: GeoPoint,
    pub state: RequestState,
    pub created_at: DateTime<Utc>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub terminal_at: Option<DateTime<Utc>>,
    /// Final transferred quantity, recorded at completion.
    pub collected_kg: Option<f64>,
}

impl PickupRequest {
    /// Build a new pending request, validating the payload before it can
    /// reach the state machine.
    pub fn new(
        requester_id: UserId,
        materials: Vec<MaterialEntry>,
        location: GeoPoint,
    ) -> Result<Self> {
        if materials.is_empty() {
            return Err(ModelError::EmptyMaterials);
        }
        for entry in &materials {
            entry.validate()?;
        }
        location.validate()?;

        Ok(Self {
            id: RequestId::new(),
            requester_id,
            claimant_id: None,
            materials,
            location,
            state: RequestState::Pending,
            created_at: Utc::now(),
            claimed_at: None,
            terminal_at: None,
            collected_kg: None,
        })
    }

    /// Total quantity the requester estimated across all line items.
    pub fn requested_kg(&self) -> f64 {
        self.materials.iter().map(|m| m.quantity_kg).sum()
    }

    pub fn is_claimed_by(&self, user: UserId) -> bool {
        self.state == RequestState::Claimed && self.claimant_id == Some(user)
    }

    /// Whether `user` is a party to this request (its requester or claimant).
    pub fn involves(&self, user: UserId) -> bool {
        self.requester_id == user || self.claimant_id == Some(user)
    }
}
