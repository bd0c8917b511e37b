//! Shared server state. Generalizes the teacher's per-room `AppState`
//! registry (`rooms: Mutex<HashMap<String, Room>>`) into a single mailbox
//! and message bus: spec.md §9 runs one polymorphic game per process
//! rather than hosting many rooms side by side, so there is exactly one
//! dispatcher actor here instead of a room lookup per connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use engine_core::room::{ConnectionId, MessageBus};
use game_engine::dispatcher::DispatcherEvent;
use protocol::OutboundEvent;
use tokio::sync::mpsc;

pub struct AppState {
    pub to_dispatcher: mpsc::Sender<DispatcherEvent>,
    pub bus: Arc<MessageBus<OutboundEvent>>,
    next_connection_id: AtomicU64,
}

impl AppState {
    pub fn new(to_dispatcher: mpsc::Sender<DispatcherEvent>, bus: Arc<MessageBus<OutboundEvent>>) -> Self {
        AppState {
            to_dispatcher,
            bus,
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Hands out a fresh id for a newly accepted websocket connection.
    pub fn next_connection_id(&self) -> ConnectionId {
        self.next_connection_id.fetch_add(1, Ordering::Relaxed)
    }
}
