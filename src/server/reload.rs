//! Live-reload channel
//!
//! Rebuild notifications fan out to connected browsers over a websocket;
//! clients respond to a reload message by refreshing the page.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ServerState;

/// Messages sent over the live-reload channel
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// A rebuild succeeded and the artifact set was swapped
    Reload { reason: String },
}

/// Handle websocket upgrade for the reload channel
pub async fn reload_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> Response {
    ws.on_upgrade(|socket| handle_reload_socket(socket, state))
}

async fn handle_reload_socket(socket: WebSocket, state: Arc<ServerState>) {
    let (mut sender, mut receiver) = socket.split();

    let mut reload_rx = state.reload_tx.subscribe();

    if let Ok(json) = serde_json::to_string(&ReloadMessage::Connected) {
        let _ = sender.send(Message::Text(json)).await;
    }

    debug!("Reload client connected");

    let send_task = tokio::spawn(async move {
        while let Ok(message) = reload_rx.recv().await {
            if let Ok(json) = serde_json::to_string(&message) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Close(_) => {
                    debug!("Reload client disconnected");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    debug!("Reload connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_string(&ReloadMessage::Reload {
            reason: "src changed".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"type\":\"reload\""));
        assert!(json.contains("src changed"));
    }
}
