//! The request lifecycle engine, the event sink port it pushes through,
//! and the live location relay.

pub mod engine;
pub mod relay;
pub mod sink;

pub use engine::LifecycleEngine;
pub use relay::LocationRelay;
pub use sink::EventSink;

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use recirca_model::{DispatchEvent, PickupRequest, RequestId, UserId};
    use tokio::sync::Mutex;

    use super::EventSink;

    /// Records every push for assertion; stands in for the server's
    /// session registry.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub pushed: Mutex<Vec<(UserId, DispatchEvent)>>,
        pub announced: Mutex<Vec<PickupRequest>>,
        pub withdrawn: Mutex<Vec<(RequestId, Option<UserId>)>>,
        pub retired: Mutex<Vec<RequestId>>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn pushed_to(&self, user: UserId) -> Vec<DispatchEvent> {
            self.pushed
                .lock()
                .await
                .iter()
                .filter(|(target, _)| *target == user)
                .map(|(_, event)| event.clone())
                .collect()
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn push_to_user(&self, user: UserId, event: DispatchEvent) {
            self.pushed.lock().await.push((user, event));
        }

        async fn announce_created(&self, request: &PickupRequest) {
            self.announced.lock().await.push(request.clone());
        }

        async fn withdraw(
            &self,
            request_id: RequestId,
            except: Option<UserId>,
        ) {
            self.withdrawn.lock().await.push((request_id, except));
        }

        async fn retire(&self, request_id: RequestId) {
            self.retired.lock().await.push(request_id);
        }
    }
}
