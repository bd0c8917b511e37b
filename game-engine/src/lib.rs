//! The trivia game domain: session state, lobby and flow control, scoring,
//! and the eight per-question-type handlers, all wired together by the
//! dispatcher (spec.md §4). Transport-agnostic: `trivia-server` is the only
//! crate that knows about websockets.

pub mod collaborators;
pub mod dispatcher;
pub mod error;
pub mod flow;
pub mod handlers;
pub mod loader;
pub mod lobby;
pub mod question;
pub mod scoring;
pub mod session;
pub mod timers;

use engine_core::traits::HandlerCommand;
use protocol::OutboundEvent;

/// Shorthand used by every module that emits handler commands.
pub type Command = HandlerCommand<OutboundEvent>;
