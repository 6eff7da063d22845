//! `/live`: pushes every [`LiveEvent`] to connected clients as JSON text frames.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::broadcast::error::RecvError;

use crate::app::AppState;
use crate::events::LiveEvent;

#[utoipa::path(
    get,
    path = "/live",
    tag = "Live",
    responses((status = 101, description = "WebSocket stream of result, remove and news events"))
)]
pub async fn live(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_events(socket, state))
}

async fn stream_events(mut socket: WebSocket, state: AppState) {
    let mut events = state.live.subscribe();
    tracing::debug!(clients = state.live.receiver_count(), "live client connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "live client lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if socket.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(error = %err, "live socket error");
                    break;
                }
            },
        }
    }

    tracing::debug!("live client disconnected");
}

async fn send_event(socket: &mut WebSocket, event: &LiveEvent) -> Result<(), axum::Error> {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(event = event.name(), error = %err, "failed to encode live event");
            return Ok(());
        }
    };
    socket.send(Message::Text(text)).await
}
