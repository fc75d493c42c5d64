use async_trait::async_trait;
use recirca_model::{DispatchEvent, PickupRequest, RequestId, UserId};

/// Push side of the dispatch channel.
///
/// Delivery is best-effort everywhere: implementations log and drop on
/// transport failure, they never surface it. The store remains the source
/// of truth and reconnecting clients recover via snapshot fetch, so a lost
/// push can delay a client's view but never corrupt it. That is also why
/// these methods return nothing.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Push an event to every live session of `user`. No live session, no
    /// delivery; the event is dropped, not queued.
    async fn push_to_user(&self, user: UserId, event: DispatchEvent);

    /// Fan a `created` event out to every connected collector session,
    /// remembering which sessions received it so a later withdrawal can
    /// reach exactly those.
    async fn announce_created(&self, request: &PickupRequest);

    /// Send `withdrawn` to every collector session that received the
    /// `created` broadcast for this id, minus `except`'s own sessions.
    async fn withdraw(&self, request_id: RequestId, except: Option<UserId>);

    /// Drop all per-request bookkeeping after a terminal transition.
    async fn retire(&self, request_id: RequestId);
}
