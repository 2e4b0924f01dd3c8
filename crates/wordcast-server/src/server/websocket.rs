use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};

/// WebSocket handler for the word stream
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    // Join the stream audience; the guard leaves on every exit path
    let (handle, mut outbox) = state.engine.client_channel();
    let membership = state.engine.connect_client(handle);
    let id = membership.id();

    // Word forwarding task
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = outbox.next().await {
            if sender.send(Message::Text(frame.to_string())).await.is_err() {
                return;
            }
        }
        // Closed by the engine (pruned or shutting down)
        let _ = sender.send(Message::Close(None)).await;
    });

    // Receive task: the stream is write-only, inbound frames are only drained
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Close(_) => break,
                Message::Text(text) => {
                    tracing::trace!("Ignoring inbound message: {}", text);
                }
                _ => {}
            }
        }
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            tracing::debug!(connection = %id, "Send task completed");
            recv_task.abort();
        }
        _ = &mut recv_task => {
            tracing::debug!(connection = %id, "Receive task completed");
            send_task.abort();
        }
    }

    drop(membership);
}
