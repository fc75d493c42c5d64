//! The requester's local view: the active request and the claimant's
//! last-known position.

use recirca_model::{
    DispatchEvent, GeoPoint, PickupRequest, RequestState,
};
use tracing::debug;

use crate::overlay::{ActionToken, OptimisticOverlay};
use crate::{RouteEstimate, TerminalNotice};

/// Undo snapshots for the requester's optimistic actions.
#[derive(Debug)]
enum Undo {
    /// An optimistic submit filled the active slot.
    Submit,
    /// An optimistic cancel/complete cleared it.
    Clear {
        request: PickupRequest,
        claimant_position: Option<GeoPoint>,
    },
}

#[derive(Debug, Default)]
pub struct RequesterView {
    active: Option<PickupRequest>,
    claimant_position: Option<GeoPoint>,
    estimate: Option<RouteEstimate>,
    overlay: OptimisticOverlay<Undo>,
    notice: Option<TerminalNotice>,
}

impl RequesterView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one server-pushed event into the view.
    pub fn apply(&mut self, event: &DispatchEvent) {
        match event {
            DispatchEvent::Claimed {
                request_id,
                claimant_id,
            } => {
                if let Some(active) = self.active.as_mut() {
                    if active.id == *request_id {
                        active.state = RequestState::Claimed;
                        active.claimant_id = Some(*claimant_id);
                    }
                }
            }
            DispatchEvent::Location {
                request_id,
                lat,
                lng,
            } => {
                // Only the current request's claimant position matters; a
                // tick for any other id (including a just-terminated one)
                // is stale.
                let Some(active) = self.active.as_ref() else {
                    debug!(request_id = %request_id, "location tick with no active request");
                    return;
                };
                if active.id != *request_id {
                    return;
                }
                let position = GeoPoint {
                    latitude: *lat,
                    longitude: *lng,
                };
                self.claimant_position = Some(position);
                self.estimate =
                    Some(RouteEstimate::between(position, active.location));
            }
            DispatchEvent::Completed { request_id }
            | DispatchEvent::Cancelled { request_id } => {
                if self
                    .active
                    .as_ref()
                    .is_some_and(|active| active.id == *request_id)
                {
                    self.clear_active();
                    self.notice = Some(TerminalNotice {
                        request_id: *request_id,
                        state: match event {
                            DispatchEvent::Cancelled { .. } => {
                                RequestState::Cancelled
                            }
                            _ => RequestState::Completed,
                        },
                    });
                }
            }
            DispatchEvent::Created { .. }
            | DispatchEvent::Withdrawn { .. }
            | DispatchEvent::Pong { .. } => {}
        }
    }

    /// Replace the view with a freshly fetched snapshot of the user's own
    /// active request.
    pub fn reset_from_snapshot(&mut self, active: Option<PickupRequest>) {
        let same_request = match (&self.active, &active) {
            (Some(current), Some(fresh)) => current.id == fresh.id,
            _ => false,
        };
        if !same_request {
            self.claimant_position = None;
            self.estimate = None;
        }
        self.active = active;
        self.overlay.clear();
    }

    /// Optimistically show a just-submitted request as active.
    pub fn submit_optimistic(
        &mut self,
        request: PickupRequest,
    ) -> ActionToken {
        self.active = Some(request);
        self.claimant_position = None;
        self.estimate = None;
        self.overlay.begin(Undo::Submit)
    }

    /// Optimistically cancel the active request.
    pub fn cancel_optimistic(&mut self) -> Option<ActionToken> {
        let request = self.active.take()?;
        let undo = Undo::Clear {
            request,
            claimant_position: self.claimant_position.take(),
        };
        self.estimate = None;
        Some(self.overlay.begin(undo))
    }

    /// Optimistically complete the active request.
    pub fn complete_optimistic(&mut self) -> Option<ActionToken> {
        self.cancel_optimistic()
    }

    /// The server confirmed the action; swap in the authoritative record
    /// where supplied.
    pub fn confirm(
        &mut self,
        token: ActionToken,
        authoritative: Option<PickupRequest>,
    ) {
        if !self.overlay.settle(token) {
            return;
        }
        if let Some(request) = authoritative {
            if !request.state.is_terminal() {
                self.active = Some(request);
            }
        }
    }

    /// The server rejected the action; restore the pre-action state.
    pub fn rollback(&mut self, token: ActionToken) {
        match self.overlay.rollback(token) {
            Some(Undo::Submit) => {
                self.clear_active();
            }
            Some(Undo::Clear {
                request,
                claimant_position,
            }) => {
                self.claimant_position = claimant_position;
                self.estimate = claimant_position.map(|position| {
                    RouteEstimate::between(position, request.location)
                });
                self.active = Some(request);
            }
            None => {}
        }
    }

    pub fn active(&self) -> Option<&PickupRequest> {
        self.active.as_ref()
    }

    /// Last-known claimant position, while one exists.
    pub fn claimant_position(&self) -> Option<GeoPoint> {
        self.claimant_position
    }

    /// Distance/ETA from the claimant's last-known position to the pickup.
    pub fn estimate(&self) -> Option<RouteEstimate> {
        self.estimate
    }

    /// Surface the terminal notice exactly once.
    pub fn take_terminal_notice(&mut self) -> Option<TerminalNotice> {
        self.notice.take()
    }

    fn clear_active(&mut self) {
        self.active = None;
        self.claimant_position = None;
        self.estimate = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recirca_model::{
        MaterialEntry, MaterialType, RequestId, UserId,
    };

    fn submitted_request() -> PickupRequest {
        PickupRequest::new(
            UserId::new(),
            vec![MaterialEntry {
                material: MaterialType::Plastic,
                quantity_kg: 2.0,
            }],
            GeoPoint {
                latitude: -12.04,
                longitude: -77.04,
            },
        )
        .unwrap()
    }

    fn view_with_claimed_request() -> (RequesterView, PickupRequest) {
        let mut view = RequesterView::new();
        let request = submitted_request();
        let token = view.submit_optimistic(request.clone());
        view.confirm(token, Some(request.clone()));
        view.apply(&DispatchEvent::Claimed {
            request_id: request.id,
            claimant_id: UserId::new(),
        });
        (view, request)
    }

    #[test]
    fn claimed_event_updates_active_request() {
        let (view, _) = view_with_claimed_request();
        let active = view.active().unwrap();
        assert_eq!(active.state, RequestState::Claimed);
        assert!(active.claimant_id.is_some());
    }

    #[test]
    fn location_tick_updates_position_and_estimate() {
        let (mut view, request) = view_with_claimed_request();

        view.apply(&DispatchEvent::Location {
            request_id: request.id,
            lat: -12.05,
            lng: -77.05,
        });

        let position = view.claimant_position().unwrap();
        assert_eq!(position.latitude, -12.05);

        let estimate = view.estimate().unwrap();
        assert!(estimate.distance_km > 0.0);
        assert!(estimate.eta_minutes >= 1);

        // A closer tick shrinks the estimate.
        view.apply(&DispatchEvent::Location {
            request_id: request.id,
            lat: request.location.latitude,
            lng: request.location.longitude,
        });
        assert!(view.estimate().unwrap().distance_km < estimate.distance_km);
    }

    #[test]
    fn stale_location_after_terminal_is_dropped() {
        let (mut view, request) = view_with_claimed_request();

        view.apply(&DispatchEvent::Completed {
            request_id: request.id,
        });
        assert!(view.active().is_none());

        view.apply(&DispatchEvent::Location {
            request_id: request.id,
            lat: -12.05,
            lng: -77.05,
        });
        assert!(view.claimant_position().is_none());
        assert!(view.estimate().is_none());
    }

    #[test]
    fn location_for_other_request_is_ignored() {
        let (mut view, _request) = view_with_claimed_request();

        view.apply(&DispatchEvent::Location {
            request_id: RequestId::new(),
            lat: -12.05,
            lng: -77.05,
        });
        assert!(view.claimant_position().is_none());
    }

    #[test]
    fn terminal_notice_surfaces_once() {
        let (mut view, request) = view_with_claimed_request();

        view.apply(&DispatchEvent::Cancelled {
            request_id: request.id,
        });
        let notice = view.take_terminal_notice().unwrap();
        assert_eq!(notice.state, RequestState::Cancelled);
        assert!(view.take_terminal_notice().is_none());
    }

    #[test]
    fn rejected_submit_rolls_back_to_idle() {
        let mut view = RequesterView::new();
        let token = view.submit_optimistic(submitted_request());
        assert!(view.active().is_some());

        view.rollback(token);
        assert!(view.active().is_none());
    }

    #[test]
    fn rejected_cancel_restores_active_and_position() {
        let (mut view, request) = view_with_claimed_request();
        view.apply(&DispatchEvent::Location {
            request_id: request.id,
            lat: -12.05,
            lng: -77.05,
        });

        let token = view.cancel_optimistic().unwrap();
        assert!(view.active().is_none());
        assert!(view.claimant_position().is_none());

        view.rollback(token);
        assert_eq!(view.active().unwrap().id, request.id);
        assert!(view.claimant_position().is_some());
        assert!(view.estimate().is_some());
    }

    #[test]
    fn snapshot_is_authoritative() {
        let (mut view, _request) = view_with_claimed_request();

        view.reset_from_snapshot(None);
        assert!(view.active().is_none());
        assert!(view.claimant_position().is_none());
    }
}
