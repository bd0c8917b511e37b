//! Room registry & message bus (spec.md §4.1).
//!
//! Generalizes the teacper's per-room channel pair in
//! `relay-server/src/lobby.rs` (`Room::to_host_sender` /
//! `host_to_client_broadcaster`) from "one room per game session, relayed
//! to a single host" into "one room per player name plus the implicit
//! `all` room, fanned out directly by the server that owns the game
//! state". Each connection keeps its own unbounded outbound queue so a
//! slow client's socket can never block the dispatcher or reorder another
//! client's messages — the bus only ever pushes, the per-connection write
//! pump (in `trivia-server`) drains at the client's own pace.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use tokio::sync::mpsc;

use protocol::{RoomTarget, Team};

pub type ConnectionId = u64;

/// The reserved room every connection is implicitly a member of.
const ALL_ROOM: &str = "\0all";

fn team_room(team: Team) -> String {
    format!("\0team:{}", team)
}

/// Transport-agnostic room registry and fan-out primitive.
///
/// `M` is the outbound message type (`protocol::OutboundEvent` in
/// practice); kept generic so this crate stays independent of the game
/// domain, the same separation of concerns the teacher draws between
/// `backbone-lib` and the games it hosts.
pub struct MessageBus<M> {
    inner: Mutex<Inner<M>>,
}

struct Inner<M> {
    rooms: HashMap<String, HashSet<ConnectionId>>,
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<M>>,
}

impl<M: Clone> Default for MessageBus<M> {
    fn default() -> Self {
        MessageBus {
            inner: Mutex::new(Inner {
                rooms: HashMap::new(),
                connections: HashMap::new(),
            }),
        }
    }
}

impl<M: Clone> MessageBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns the receiving half of its
    /// outbound queue. The connection is automatically a member of the
    /// `all` room.
    pub fn register(&self, conn: ConnectionId) -> mpsc::UnboundedReceiver<M> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock().unwrap();
        inner.connections.insert(conn, tx);
        inner.rooms.entry(ALL_ROOM.to_string()).or_default().insert(conn);
        rx
    }

    /// Drops a connection from every room it belongs to.
    pub fn unregister(&self, conn: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        inner.connections.remove(&conn);
        for members in inner.rooms.values_mut() {
            members.remove(&conn);
        }
    }

    /// Joins a named room (one per player name, or a reserved team room).
    pub fn join(&self, room: &str, conn: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        inner.rooms.entry(room.to_string()).or_default().insert(conn);
    }

    /// Leaves a named room.
    pub fn leave(&self, room: &str, conn: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(members) = inner.rooms.get_mut(room) {
            members.remove(&conn);
        }
    }

    /// Atomically moves a connection from one private room to another,
    /// preserving the membership-dependent rename semantics of spec.md
    /// §4.1 ("a rename operation `leave(old); join(new)` preserves private
    /// routing").
    pub fn rename(&self, old_room: &str, new_room: &str, conn: ConnectionId) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(members) = inner.rooms.get_mut(old_room) {
            members.remove(&conn);
        }
        inner.rooms.entry(new_room.to_string()).or_default().insert(conn);
    }

    pub fn join_team(&self, team: Team, conn: ConnectionId) {
        self.join(&team_room(team), conn);
    }

    /// Folds every connection currently in `player_room` into `team`'s room,
    /// without removing them from `player_room`. Used when a player is
    /// assigned to a team after already being joined under their own name —
    /// the caller only knows the player's name, not their `ConnectionId`.
    pub fn join_team_by_name(&self, player_room: &str, team: Team) {
        let mut inner = self.inner.lock().unwrap();
        let members: Vec<ConnectionId> = inner.rooms.get(player_room).map(|set| set.iter().copied().collect()).unwrap_or_default();
        let dest = inner.rooms.entry(team_room(team)).or_default();
        for conn in members {
            dest.insert(conn);
        }
    }

    pub fn leave_team(&self, team: Team, conn: ConnectionId) {
        self.leave(&team_room(team), conn);
    }

    /// Sends `msg` to every member of `room`. Delivery order per recipient
    /// connection always matches call order, since each connection has its
    /// own FIFO queue.
    pub fn send_room(&self, room: &str, msg: M) {
        let inner = self.inner.lock().unwrap();
        let Some(members) = inner.rooms.get(room) else {
            return;
        };
        for conn in members {
            if let Some(sender) = inner.connections.get(conn) {
                if sender.send(msg.clone()).is_err() {
                    // The connection's write pump already dropped its
                    // receiver; the room is cleaned up on the next
                    // `unregister` call from that connection's handler task.
                    tracing::debug!(room, connection = conn, "dropping message, receiver gone");
                }
            }
        }
    }

    /// Sends to the `all` room.
    pub fn broadcast(&self, msg: M) {
        self.send_room(ALL_ROOM, msg);
    }

    /// Resolves a `RoomTarget` and sends to it.
    pub fn send(&self, target: &RoomTarget, msg: M) {
        match target {
            RoomTarget::Player(name) => self.send_room(name, msg),
            RoomTarget::Team(team) => self.send_room(&team_room(*team), msg),
            RoomTarget::All => self.broadcast(msg),
        }
    }
}
