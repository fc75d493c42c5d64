//! # Recirca Client
//!
//! Client-side view state for the dispatch protocol, one reconciler per
//! role. Each reconciler merges server-pushed events into locally held
//! view state and supports optimistic local edits for actions the client
//! itself issued.
//!
//! Push events are a supplement, never the source of truth: both
//! reconcilers accept a full snapshot (`reset_from_snapshot`) which a
//! client must fetch on every (re)connect.
#![allow(missing_docs)]

pub mod collector;
pub mod overlay;
pub mod requester;

use recirca_core::geo;
use recirca_model::GeoPoint;

pub use collector::CollectorView;
pub use overlay::{ActionToken, OptimisticOverlay};
pub use requester::RequesterView;

/// Distance and travel-time estimate between two coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteEstimate {
    pub distance_km: f64,
    pub eta_minutes: u32,
}

impl RouteEstimate {
    pub fn between(from: GeoPoint, to: GeoPoint) -> Self {
        let distance_km = geo::distance_km(from, to);
        Self {
            distance_km,
            eta_minutes: geo::eta_minutes(distance_km),
        }
    }
}

/// A terminal transition the user has not yet been shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalNotice {
    pub request_id: recirca_model::RequestId,
    pub state: recirca_model::RequestState,
}
