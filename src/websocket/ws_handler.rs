use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Upgrades to a websocket that receives every notification as JSON text.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<Mutex<broadcast::Sender<String>>>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<Mutex<broadcast::Sender<String>>>) {
    let mut rx = match state.lock() {
        Ok(tx) => tx.subscribe(),
        Err(_) => {
            tracing::error!("Websocket channel lock poisoned");
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();
    tracing::debug!("Websocket client connected");

    // Push stored notifications out as they are emitted.
    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    if sender.send(Message::Text(msg.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Websocket client lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Clients only listen; drain until they close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    tracing::debug!("Websocket client disconnected");
}
