//! Core data model definitions shared across Recirca crates.
#![allow(missing_docs)]

pub mod api;
pub mod dispatch;
pub mod error;
pub mod geo;
pub mod identity;
pub mod ids;
pub mod material;
pub mod request;

// Intentionally curated re-exports for downstream consumers.
pub use api::{CompleteRequestPayload, CreateRequestPayload};
pub use dispatch::{ClientMessage, DispatchEvent};
pub use error::{ModelError, Result as ModelResult};
pub use geo::{GeoPoint, LocationUpdate, DEFAULT_LOCATION};
pub use identity::{Identity, Role};
pub use ids::{RequestId, UserId};
pub use material::{MaterialEntry, MaterialType};
pub use request::{PickupRequest, RequestState};
