//! WebSocket handling for the trivia server.
//!
//! Every connection gets one send task and one receive task, same shape as
//! the teacher's `handle_server_logic`/`handle_client_logic` pair, but there
//! is no handshake to negotiate first: a connection simply registers with
//! the shared `MessageBus` and starts relaying. The dispatcher never sees a
//! `ConnectionId` — it only ever emits to a `RoomTarget` — so joining a
//! connection into its player-name room happens here, speculatively, before
//! the `JoinRoom` event is even forwarded to the dispatcher.
//!
//! That's a deliberate trade: `MessageBus::join` just inserts into a
//! `HashSet`, so joining a name that the dispatcher is about to reject as
//! taken is harmless on its own, and it's the only way the rejected
//! player's own `Error` event (addressed to that same player-name room) can
//! reach them at all. The one edge case this doesn't cover cleanly is a
//! rejected `PlayerNameChanged`: the connection moves to the new name room
//! immediately, so an error emitted to the old name afterward won't reach
//! it. Acceptable for now — a rename failure still updates nothing in
//! `Session`, it just leaves that one rejection unseen by its caller.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use protocol::{InboundEvent, OutboundEvent};

use crate::state::AppState;
use game_engine::dispatcher::DispatcherEvent;

/// Upgrades one HTTP connection into a registered bus member, then runs its
/// send/receive pump until either side closes.
pub async fn handle_socket(stream: WebSocket, state: Arc<AppState>) {
    let conn_id = state.next_connection_id();
    let outbound_rx = state.bus.register(conn_id);
    let (sender, receiver) = stream.split();

    let mut send_task = tokio::spawn(send_loop(sender, outbound_rx));
    let mut recv_task = tokio::spawn(recv_loop(receiver, state.clone(), conn_id));

    tokio::select! {
        result = &mut send_task => {
            recv_task.abort();
            if let Err(err) = result {
                tracing::error!(?err, "send loop panicked");
            }
        }
        result = &mut recv_task => {
            send_task.abort();
            if let Err(err) = result {
                tracing::error!(?err, "receive loop panicked");
            }
        }
    }

    state.bus.unregister(conn_id);
}

/// Drains this connection's outbound queue and forwards each event to the
/// client as a JSON text frame. Ends when the socket closes or the bus
/// drops the sending half (on `unregister`).
async fn send_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound_rx: tokio::sync::mpsc::UnboundedReceiver<OutboundEvent>,
) {
    while let Some(event) = outbound_rx.recv().await {
        let text = match serde_json::to_string(&event) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(?err, "failed to encode outbound event");
                continue;
            }
        };
        if sender.send(Message::Text(text.into())).await.is_err() {
            break;
        }
    }
}

/// Reads JSON text frames off the socket, deserializes them into
/// `InboundEvent`, and forwards them into the dispatcher's mailbox.
/// Non-text frames and malformed JSON are logged and dropped rather than
/// killing the connection — one bad frame from a buggy client shouldn't
/// take the whole session down.
async fn recv_loop(mut receiver: SplitStream<WebSocket>, state: Arc<AppState>, conn_id: u64) {
    while let Some(Ok(message)) = receiver.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };
        let event: InboundEvent = match serde_json::from_str(&text) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(?err, "dropping malformed inbound frame");
                continue;
            }
        };

        match &event {
            InboundEvent::JoinRoom { player_name } => state.bus.join(player_name, conn_id),
            InboundEvent::PlayerNameChanged { old_name, new_name } => state.bus.rename(old_name, new_name, conn_id),
            _ => {}
        }

        if state.to_dispatcher.send(DispatcherEvent::Inbound(event)).await.is_err() {
            tracing::error!("dispatcher mailbox closed, dropping connection");
            break;
        }
    }
}
