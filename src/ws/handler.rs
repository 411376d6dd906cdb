//! WebSocket transport for the session hub.
//!
//! One task per connection owns both socket halves and at most one group
//! subscription. Holding the subscription in a single `Option` is what makes
//! "a connection belongs to at most one group" structural: processing a new
//! join replaces it, and the replaced receiver is dropped before the hub is
//! told about the leave.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::hub::SessionHub;
use crate::models::{
    BroadcastMessage, ClientMessage, LoadMessage, PongMessage, ReceiveMessage, ServerMessage,
};

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(hub): State<Arc<SessionHub>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Whether a relayed message goes out on this connection. A group broadcast
/// reaches every subscriber including the one that sent it; the sender's own
/// copy is dropped here.
pub(crate) fn should_deliver(msg: &BroadcastMessage, connection_id: &str) -> bool {
    msg.sender_id != connection_id
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<SessionHub>) {
    // Generate unique connection ID to identify this client
    let connection_id = Uuid::new_v4().to_string();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    // The connection's current group subscription, at most one.
    let mut subscription: Option<(String, broadcast::Receiver<BroadcastMessage>)> = None;

    loop {
        tokio::select! {
            incoming = receiver.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        warn!("WebSocket error on connection {}: {}", connection_id, e);
                        break;
                    }
                };

                // Parse the incoming frame as a tagged event
                let client_msg: ClientMessage = match serde_json::from_str(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        error!("Failed to parse message from connection {}: {}", connection_id, e);
                        continue;
                    }
                };

                match client_msg {
                    ClientMessage::Join(join) => {
                        // Joining a new document implicitly leaves the previous one.
                        if let Some((old_doc, old_rx)) = subscription.take() {
                            drop(old_rx);
                            hub.leave(&connection_id, &old_doc).await;
                        }

                        let (rx, baseline) = hub.join(&connection_id, &join.document_id).await;
                        subscription = Some((join.document_id, rx));

                        let load = ServerMessage::Load(LoadMessage { content: baseline });
                        if send_message(&mut sender, &load).await.is_err() {
                            break;
                        }
                    }
                    ClientMessage::SendText(text_msg) => {
                        hub.propagate_change(&connection_id, &text_msg.document_id, text_msg.content)
                            .await;
                    }
                    ClientMessage::Ping => {
                        let pong = ServerMessage::Pong(PongMessage {
                            date: chrono::Utc::now().to_rfc3339(),
                        });
                        if send_message(&mut sender, &pong).await.is_err() {
                            break;
                        }
                    }
                }
            }
            relayed = group_recv(&mut subscription) => {
                match relayed {
                    Ok(msg) => {
                        // Skip messages from this connection to prevent echo
                        if !should_deliver(&msg, &connection_id) {
                            continue;
                        }
                        let out = ServerMessage::ReceiveText(ReceiveMessage { content: msg.content });
                        if send_message(&mut sender, &out).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Whole-content frames: whatever was missed is superseded
                        // by the next message anyway.
                        warn!("Connection {} lagged behind, skipped {} messages", connection_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        subscription = None;
                    }
                }
            }
        }
    }

    // Transport gone; release the group membership.
    if let Some((document_id, rx)) = subscription.take() {
        drop(rx);
        hub.leave(&connection_id, &document_id).await;
    }
    info!("WebSocket connection terminated for {}", connection_id);
}

/// Await the group channel when subscribed, otherwise park this select arm.
async fn group_recv(
    subscription: &mut Option<(String, broadcast::Receiver<BroadcastMessage>)>,
) -> Result<BroadcastMessage, broadcast::error::RecvError> {
    match subscription {
        Some((_, rx)) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(msg).unwrap();
    sender.send(Message::Text(text)).await
}
