use std::fmt;

use chrono::{DateTime, Utc};
use recirca_core::error::{DispatchError, Result};
use recirca_model::{DispatchEvent, Identity};
use tokio::sync::mpsc;
use uuid::Uuid;

/// One live websocket session.
#[derive(Clone)]
pub struct Connection {
    /// Unique connection ID
    pub id: Uuid,
    /// Authenticated identity behind this connection
    pub identity: Identity,
    /// Channel to send events to this connection
    sender: mpsc::Sender<DispatchEvent>,
    /// When the session was established
    pub connected_at: DateTime<Utc>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.identity.user_id)
            .field("role", &self.identity.role)
            .field("channel_closed", &self.sender.is_closed())
            .field("connected_at", &self.connected_at)
            .finish()
    }
}

impl Connection {
    pub fn new(identity: Identity, sender: mpsc::Sender<DispatchEvent>) -> Self {
        Self {
            id: Uuid::now_v7(),
            identity,
            sender,
            connected_at: Utc::now(),
        }
    }

    /// Queue an event for this connection without blocking. A full or
    /// closed channel drops the event; the snapshot-on-connect path makes
    /// that loss recoverable.
    pub fn send(&self, event: DispatchEvent) -> Result<()> {
        self.sender.try_send(event).map_err(|err| {
            DispatchError::Transport(format!("connection {}: {err}", self.id))
        })
    }
}
