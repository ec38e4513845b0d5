//! WebSocket stream of automaton transitions.
use crate::events::TransitionEvent;
use crate::state::AppState;
use apron_core::FlightId;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Handler for WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsQuery>,
) -> axum::response::Response {
    let rx = state.events().subscribe_transitions();
    ws.on_upgrade(move |socket| handle_socket(socket, rx, params.flight_id))
        .into_response()
}

#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    flight_id: Option<FlightId>,
}

async fn handle_socket(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<TransitionEvent>,
    flight_filter: Option<FlightId>,
) {
    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if flight_filter.is_some_and(|id| id != event.flight_id) {
                            continue;
                        }
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(err) => {
                                tracing::warn!("Failed to encode transition event: {}", err);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::debug!("WebSocket client skipped {} transition events", missed);
                        continue;
                    }
                    Err(_) => break,
                }
            }
        }
    }
}
