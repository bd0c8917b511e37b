//! Core abstraction between the question-type state machines and the
//! dispatcher (spec.md §4.11, §9).
//!
//! This is a direct generalization of the teacher's `BackEndArchitecture`
//! trait: instead of one game backend per hosted game with its own
//! `ServerRpcPayload`/`DeltaInformation`/`ViewState` type parameters, this
//! server runs one polymorphic trivia engine whose "backend" changes with
//! the current question's type. The event-in/commands-out shape and the
//! command vocabulary (`Delta` -> `Emit`, `SetTimer`/`CancelTimer` kept
//! verbatim, `KickPlayer`/`TerminateRoom` replaced by `AdvanceQuestion`/
//! `EndGame` which are this domain's equivalent terminal transitions) are
//! kept from `BackendCommand`.
//!
//! # Data Flow
//!
//! ```text
//! Inbound event -> TypeHandler::on_event/on_time_up -> Vec<HandlerCommand>
//!                                                           |
//!                                                           v
//!                                         dispatcher applies each command:
//!                                         Emit        -> room registry send/broadcast
//!                                         ArmTimer    -> Clock::arm
//!                                         CancelTimer -> Clock::cancel
//!                                         AdvanceQuestion / EndGame -> flow controller
//! ```
//!
//! Handlers never perform I/O themselves; they only mutate the session they
//! are given and return the commands describing what should happen next.
//! This keeps every handler a plain, synchronous function that is trivial
//! to unit test without a running dispatcher or network stack.

use protocol::RoomTarget;

use crate::clock::TimerId;

/// Commands emitted by a handler to be applied by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerCommand<Outbound> {
    /// Send `event` to the given room.
    Emit {
        target: RoomTarget,
        event: Outbound,
    },

    /// Arms (or re-arms) the named timer to fire after `delay_ms`.
    ArmTimer { id: TimerId, delay_ms: u64 },

    /// Cancels a previously armed timer, if still pending.
    CancelTimer { id: TimerId },

    /// Advances the flow controller to the next question.
    AdvanceQuestion,

    /// Ends the game and shows the final score.
    EndGame,
}

impl<Outbound> HandlerCommand<Outbound> {
    pub fn emit(target: RoomTarget, event: Outbound) -> Self {
        HandlerCommand::Emit { target, event }
    }

    pub fn emit_all(event: Outbound) -> Self {
        HandlerCommand::Emit {
            target: RoomTarget::All,
            event,
        }
    }

    pub fn emit_player(name: impl Into<String>, event: Outbound) -> Self {
        HandlerCommand::Emit {
            target: RoomTarget::Player(name.into()),
            event,
        }
    }
}

/// The shared interface every question-type state machine implements.
///
/// `Session` and `Outbound` are left generic over the crate that defines
/// them (`game-engine`) so this trait can live in the networking-agnostic
/// `engine-core` crate without depending on the game domain.
pub trait TypeHandler<Session, Inbound, Outbound> {
    /// Called once when the question becomes live (after the preview
    /// window). Should arm the primary timer.
    fn initialize(&self, session: &mut Session) -> Vec<HandlerCommand<Outbound>>;

    /// Called for every inbound event routed to this question's type while
    /// it is live. Unrecognized events for this type are simply not routed
    /// here by the dispatcher.
    fn on_event(&self, session: &mut Session, event: Inbound) -> Vec<HandlerCommand<Outbound>>;

    /// Called when the primary timer (or a type-specific secondary timer)
    /// fires.
    fn on_time_up(&self, session: &mut Session, timer_id: TimerId) -> Vec<HandlerCommand<Outbound>>;
}
