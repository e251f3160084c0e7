use crate::api::handler::AppState;
use crate::reconcile::Dashboard;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// GET /stream - pushes every tick's dashboard as a JSON text frame
pub async fn stream_ticks(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_tick_stream(socket, state.ticks.clone()))
}

async fn handle_tick_stream(socket: WebSocket, mut ticks: watch::Receiver<Arc<Dashboard>>) {
    let (mut sender, mut receiver) = socket.split();

    // Only watch for the client going away
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    let mut send_task = tokio::spawn(async move {
        loop {
            // Clone out of the borrow so the guard is not held across the send
            let dashboard = ticks.borrow_and_update().clone();
            match serde_json::to_string(dashboard.as_ref()) {
                Ok(json) => {
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!("⚠️ Failed to encode tick: {}", e),
            }

            if ticks.changed().await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    }
    debug!("🔌 Tick stream closed");
}
