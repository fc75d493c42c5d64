use anyhow::Result;
use axum::extract::ws::{Message, Utf8Bytes};
use recirca_model::{ClientMessage, DispatchEvent};

/// Convert a DispatchEvent to a WebSocket message
pub fn event_to_websocket(event: &DispatchEvent) -> Result<Message> {
    let json = serde_json::to_string(event)?;
    Ok(Message::Text(Utf8Bytes::from(json)))
}

/// Convert a WebSocket message to a ClientMessage
pub fn websocket_to_client(msg: Message) -> Result<ClientMessage> {
    match msg {
        Message::Text(text) => {
            let client_msg: ClientMessage = serde_json::from_str(text.as_str())?;
            Ok(client_msg)
        }
        Message::Binary(bin) => {
            let client_msg: ClientMessage = serde_json::from_slice(bin.as_ref())?;
            Ok(client_msg)
        }
        _ => Err(anyhow::anyhow!("Unsupported message type")),
    }
}

/// Create a pong response
pub fn create_pong(timestamp: i64) -> DispatchEvent {
    DispatchEvent::Pong { timestamp }
}
