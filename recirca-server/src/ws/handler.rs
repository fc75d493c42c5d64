use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, State,
    },
    response::Response,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use recirca_model::{
    ClientMessage, DispatchEvent, GeoPoint, Identity, LocationUpdate,
};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::infra::app_state::AppState;
use crate::ws::{messages, Connection};

/// Handle WebSocket upgrade request
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, identity))
}

/// Handle an individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, identity: Identity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<DispatchEvent>(100);

    let connection = Arc::new(Connection::new(identity, tx));
    let conn_id = connection.id;

    state.registry.add_connection(connection.clone());
    tracing::debug!(
        user = %identity.user_id,
        role = identity.role.as_str(),
        "websocket session opened"
    );

    // Spawn task to handle outgoing events
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(ws_msg) = messages::event_to_websocket(&event) {
                if ws_sender.send(ws_msg).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(frame @ (Message::Text(_) | Message::Binary(_))) => {
                match messages::websocket_to_client(frame) {
                    Ok(client_msg) => {
                        handle_client_message(
                            client_msg,
                            &state,
                            &connection,
                            identity,
                        )
                        .await;
                    }
                    Err(err) => {
                        tracing::warn!("unparseable client frame: {err}");
                    }
                }
            }
            Ok(Message::Close(_)) => {
                break;
            }
            Ok(_) => {}
            Err(err) => {
                tracing::error!("WebSocket error: {err}");
                break;
            }
        }
    }

    // Clean up on disconnect
    state.registry.remove_connection(conn_id);
    tracing::debug!(user = %identity.user_id, "websocket session closed");
}

/// Handle one inbound client message
async fn handle_client_message(
    msg: ClientMessage,
    state: &AppState,
    connection: &Connection,
    identity: Identity,
) {
    match msg {
        ClientMessage::Location {
            request_id,
            lat,
            lng,
        } => {
            // Position ticks only ever come from collectors.
            if !identity.is_collector() {
                tracing::warn!(
                    user = %identity.user_id,
                    "ignoring location tick from non-collector"
                );
                return;
            }

            let update = LocationUpdate {
                request_id,
                collector_id: identity.user_id,
                position: GeoPoint {
                    latitude: lat,
                    longitude: lng,
                },
                timestamp: Utc::now(),
            };

            if let Err(err) =
                state.relay.forward(identity.user_id, update).await
            {
                tracing::error!("location relay failed: {err}");
            }
        }
        ClientMessage::Ping { timestamp } => {
            if let Err(err) = connection.send(messages::create_pong(timestamp))
            {
                tracing::debug!("pong dropped: {err}");
            }
        }
    }
}
