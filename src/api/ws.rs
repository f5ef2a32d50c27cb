use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use tracing::{debug, warn};

use crate::{controller::AppState, notify::Notification};

/// GET /ws - Stream notifications as JSON text frames `{topic, data}`
pub async fn notifications(ws: WebSocketUpgrade, State(st): State<AppState>) -> impl IntoResponse {
    let rx = st.notifier.subscribe();
    ws.on_upgrade(move |socket| forward(socket, rx))
}

async fn forward(socket: WebSocket, mut rx: Receiver<Notification>) {
    let (mut sender, mut receiver) = socket.split();
    debug!("notification subscriber connected");

    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Ok(notification) => {
                    let text = match serde_json::to_string(&notification) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(topic = notification.topic(), error = %e, "notification not serializable");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                // Missed notifications are recovered by re-fetching over REST.
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "notification subscriber lagging"),
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("notification subscriber disconnected");
}
