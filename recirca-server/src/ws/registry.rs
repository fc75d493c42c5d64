use std::{fmt, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use recirca_core::EventSink;
use recirca_model::{DispatchEvent, PickupRequest, RequestId, UserId};
use uuid::Uuid;

use crate::ws::connection::Connection;

/// Maps authenticated users to their live connections and tracks which
/// connections were told about each broadcast request.
///
/// Consulted fresh before every push; never cached by callers. Delivery is
/// best-effort throughout: a send failure is logged and the event dropped.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    /// Active WebSocket connections mapped by connection ID
    connections: Arc<DashMap<Uuid, Arc<Connection>>>,
    /// Connection IDs per user - one user may hold several sessions
    by_user: Arc<DashMap<UserId, Vec<Uuid>>>,
    /// Collector connections that received the `created` broadcast,
    /// per request - the later `withdrawn` fan-out targets exactly these
    interest: Arc<DashMap<RequestId, Vec<Uuid>>>,
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("connection_count", &self.connections.len())
            .field("user_count", &self.by_user.len())
            .field("tracked_requests", &self.interest.len())
            .finish()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection
    pub fn add_connection(&self, connection: Arc<Connection>) {
        self.by_user
            .entry(connection.identity.user_id)
            .or_default()
            .push(connection.id);
        self.connections.insert(connection.id, connection);
    }

    /// Remove a connection and clean up user and interest bookkeeping
    pub fn remove_connection(&self, conn_id: Uuid) {
        let Some((_, connection)) = self.connections.remove(&conn_id) else {
            return;
        };

        if let Some(mut conns) = self.by_user.get_mut(&connection.identity.user_id)
        {
            conns.retain(|id| id != &conn_id);
        }
        self.by_user.retain(|_, conns| !conns.is_empty());

        for mut interested in self.interest.iter_mut() {
            interested.value_mut().retain(|id| id != &conn_id);
        }
    }

    /// All live connections of one user
    pub fn connections_for(&self, user: UserId) -> Vec<Arc<Connection>> {
        self.by_user
            .get(&user)
            .map(|conns| {
                conns
                    .iter()
                    .filter_map(|id| {
                        self.connections.get(id).map(|c| c.clone())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All live collector connections
    pub fn collector_connections(&self) -> Vec<Arc<Connection>> {
        self.connections
            .iter()
            .filter(|entry| entry.identity.is_collector())
            .map(|entry| entry.clone())
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connection ids recorded as having seen `created` for a request.
    pub fn interested_in(&self, request_id: RequestId) -> Vec<Uuid> {
        self.interest
            .get(&request_id)
            .map(|conns| conns.clone())
            .unwrap_or_default()
    }

    fn send_or_log(connection: &Connection, event: DispatchEvent) {
        if let Err(err) = connection.send(event) {
            tracing::warn!("dropping event: {err}");
        }
    }
}

#[async_trait]
impl EventSink for SessionRegistry {
    async fn push_to_user(&self, user: UserId, event: DispatchEvent) {
        for connection in self.connections_for(user) {
            Self::send_or_log(&connection, event.clone());
        }
    }

    async fn announce_created(&self, request: &PickupRequest) {
        let mut announced = Vec::new();
        for connection in self.collector_connections() {
            Self::send_or_log(
                &connection,
                DispatchEvent::Created {
                    request: request.clone(),
                },
            );
            announced.push(connection.id);
        }
        self.interest.insert(request.id, announced);
    }

    async fn withdraw(&self, request_id: RequestId, except: Option<UserId>) {
        for conn_id in self.interested_in(request_id) {
            let Some(connection) = self.connections.get(&conn_id) else {
                continue;
            };
            if Some(connection.identity.user_id) == except {
                continue;
            }
            Self::send_or_log(
                &connection,
                DispatchEvent::Withdrawn { request_id },
            );
        }
    }

    async fn retire(&self, request_id: RequestId) {
        self.interest.remove(&request_id);
    }
}
