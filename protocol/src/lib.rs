//! The wire contract shared between the game engine and the transport layer.
//!
//! Unlike the postcard byte-tag framing this crate used to carry, events here
//! are named and JSON-shaped: `{"event": "<name>", "data": { ... }}`. This
//! mirrors the Socket.IO event surface the engine's protocol was distilled
//! from (`submit_answer`, `answer_correctness`, ...) rather than the binary
//! delta/full-update split used by the client-hosted relay this crate used to
//! serve. The room/broadcast *primitives* that carry these events are still
//! the teacher's (see `engine-core::room`); only the framing changed.

pub mod inbound;
pub mod outbound;
pub mod tunables;
pub mod types;

pub use inbound::InboundEvent;
pub use outbound::OutboundEvent;
pub use types::*;

/// The buffer size for the channel that feeds the dispatcher. Kept from the
/// teacher's `CHANNEL_BUFFER_SIZE` so a burst of slow clients can't stall
/// faster ones before the dispatcher drains its mailbox.
pub const CHANNEL_BUFFER_SIZE: usize = 256;
