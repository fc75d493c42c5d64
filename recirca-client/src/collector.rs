//! The collector's local view: the pending candidate list and the one
//! assignment currently being worked.

use std::collections::{BTreeMap, HashSet};

use recirca_model::{
    DispatchEvent, GeoPoint, PickupRequest, RequestId, RequestState,
};
use tracing::debug;

use crate::overlay::{ActionToken, OptimisticOverlay};
use crate::{RouteEstimate, TerminalNotice};

/// Undo snapshots for the collector's optimistic actions.
#[derive(Debug)]
enum Undo {
    /// An optimistic claim moved `request` from the candidate list to the
    /// active slot.
    Claim { request: PickupRequest },
    /// An optimistic completion cleared the active slot.
    Complete { request: PickupRequest },
}

#[derive(Debug, Default)]
pub struct CollectorView {
    /// Pending candidates keyed by id, creation-ordered for display.
    pending: BTreeMap<RequestId, PickupRequest>,
    /// Ids this view has already seen leave the pending set. A `created`
    /// that arrives after the matching `withdrawn` must not resurrect the
    /// entry.
    removed: HashSet<RequestId>,
    active: Option<PickupRequest>,
    overlay: OptimisticOverlay<Undo>,
    notice: Option<TerminalNotice>,
}

impl CollectorView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one server-pushed event into the view.
    pub fn apply(&mut self, event: &DispatchEvent) {
        match event {
            DispatchEvent::Created { request } => {
                if request.state != RequestState::Pending {
                    return;
                }
                if self.removed.contains(&request.id)
                    || self.pending.contains_key(&request.id)
                {
                    debug!(request_id = %request.id, "duplicate created ignored");
                    return;
                }
                self.pending.insert(request.id, request.clone());
            }
            DispatchEvent::Claimed { request_id, .. }
            | DispatchEvent::Withdrawn { request_id } => {
                // Removing an absent id is a no-op.
                self.pending.remove(request_id);
                self.removed.insert(*request_id);
            }
            DispatchEvent::Completed { request_id }
            | DispatchEvent::Cancelled { request_id } => {
                self.pending.remove(request_id);
                self.removed.insert(*request_id);
                if self
                    .active
                    .as_ref()
                    .is_some_and(|active| active.id == *request_id)
                {
                    self.active = None;
                    self.notice = Some(TerminalNotice {
                        request_id: *request_id,
                        state: terminal_state(event),
                    });
                }
            }
            DispatchEvent::Location { .. } | DispatchEvent::Pong { .. } => {}
        }
    }

    /// Replace the candidate list with a freshly fetched pending snapshot.
    pub fn reset_from_snapshot(&mut self, pending: Vec<PickupRequest>) {
        self.pending = pending
            .into_iter()
            .filter(|request| request.state == RequestState::Pending)
            .map(|request| (request.id, request))
            .collect();
        self.removed.clear();
        self.overlay.clear();
    }

    /// Optimistically claim a candidate: it leaves the list and becomes
    /// the active assignment immediately. Returns `None` when the id is
    /// not claimable from this view.
    pub fn claim_optimistic(&mut self, id: RequestId) -> Option<ActionToken> {
        if self.active.is_some() {
            return None;
        }
        let mut request = self.pending.remove(&id)?;
        request.state = RequestState::Claimed;
        self.active = Some(request.clone());
        Some(self.overlay.begin(Undo::Claim { request }))
    }

    /// Optimistically complete the active assignment.
    pub fn complete_optimistic(&mut self) -> Option<(ActionToken, RequestId)> {
        let request = self.active.take()?;
        let id = request.id;
        let token = self.overlay.begin(Undo::Complete { request });
        Some((token, id))
    }

    /// The server confirmed the action; the authoritative record replaces
    /// the optimistic one where supplied.
    pub fn confirm(
        &mut self,
        token: ActionToken,
        authoritative: Option<PickupRequest>,
    ) {
        if !self.overlay.settle(token) {
            return;
        }
        if let Some(request) = authoritative {
            if request.state == RequestState::Claimed {
                self.active = Some(request);
            }
        }
    }

    /// The server rejected the action; restore the pre-action state.
    pub fn rollback(&mut self, token: ActionToken) {
        match self.overlay.rollback(token) {
            Some(Undo::Claim { mut request }) => {
                self.active = None;
                // The claim lost; the request is someone else's now unless
                // a snapshot says otherwise.
                if !self.removed.contains(&request.id) {
                    request.state = RequestState::Pending;
                    request.claimant_id = None;
                    self.pending.insert(request.id, request);
                }
            }
            Some(Undo::Complete { request }) => {
                self.active = Some(request);
            }
            None => {}
        }
    }

    /// Candidates in creation order.
    pub fn pending_requests(&self) -> impl Iterator<Item = &PickupRequest> {
        self.pending.values()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn active(&self) -> Option<&PickupRequest> {
        self.active.as_ref()
    }

    /// Distance/ETA from the collector's position to a candidate pickup.
    pub fn route_to(
        &self,
        my_position: GeoPoint,
        id: RequestId,
    ) -> Option<RouteEstimate> {
        let request = self
            .pending
            .get(&id)
            .or(self.active.as_ref().filter(|active| active.id == id))?;
        Some(RouteEstimate::between(my_position, request.location))
    }

    /// Surface the terminal notice exactly once.
    pub fn take_terminal_notice(&mut self) -> Option<TerminalNotice> {
        self.notice.take()
    }
}

fn terminal_state(event: &DispatchEvent) -> RequestState {
    match event {
        DispatchEvent::Cancelled { .. } => RequestState::Cancelled,
        _ => RequestState::Completed,
    }
}
