use serde::{Deserialize, Serialize};

use crate::ids::{RequestId, UserId};
use crate::request::PickupRequest;

/// Server-pushed events carried over the dispatch channel.
///
/// Delivery is best-effort: a missed event is recovered by the snapshot
/// fetch on reconnect, never by replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    // Server -> collectors
    Created { request: PickupRequest },
    Withdrawn { request_id: RequestId },

    // Server -> requester
    Claimed {
        request_id: RequestId,
        claimant_id: UserId,
    },
    Location {
        request_id: RequestId,
        lat: f64,
        lng: f64,
    },

    // Server -> both parties
    Completed { request_id: RequestId },
    Cancelled { request_id: RequestId },

    // Heartbeat
    Pong { timestamp: i64 },
}

impl DispatchEvent {
    /// The request this event concerns, if any.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            DispatchEvent::Created { request } => Some(request.id),
            DispatchEvent::Withdrawn { request_id }
            | DispatchEvent::Claimed { request_id, .. }
            | DispatchEvent::Location { request_id, .. }
            | DispatchEvent::Completed { request_id }
            | DispatchEvent::Cancelled { request_id } => Some(*request_id),
            DispatchEvent::Pong { .. } => None,
        }
    }
}

/// Messages a connected client may send over the dispatch channel.
///
/// Lifecycle transitions go through the HTTP API; the channel only carries
/// position ticks and the heartbeat upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Location {
        request_id: RequestId,
        lat: f64,
        lng: f64,
    },
    Ping { timestamp: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_carry_snake_case_type_tags() {
        let event = DispatchEvent::Withdrawn {
            request_id: RequestId::new(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"withdrawn\""));

        let event = DispatchEvent::Location {
            request_id: RequestId::new(),
            lat: -12.05,
            lng: -77.05,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"location\""));

        let roundtrip: DispatchEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(roundtrip, DispatchEvent::Location { .. }));
    }

    #[test]
    fn client_message_parses_location_tick() {
        let id = RequestId::new();
        let raw = format!(
            "{{\"type\":\"location\",\"request_id\":\"{id}\",\"lat\":-12.05,\"lng\":-77.05}}"
        );
        let msg: ClientMessage = serde_json::from_str(&raw).unwrap();
        match msg {
            ClientMessage::Location {
                request_id, lat, ..
            } => {
                assert_eq!(request_id, id);
                assert_eq!(lat, -12.05);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
