//! Dispatcher (spec.md §4.11): the single owner of `Session`. Routes every
//! inbound event and timer firing to the lobby controller, the flow
//! controller, or the current question's `TypeHandler`, then resolves the
//! returned commands into whatever happens next.
//!
//! Grounded on the teacher's `MiddleLayer::update_server` command pump
//! (`backbone-lib/src/middle_layer.rs`): drain one mailbox, resolve a
//! target, apply the commands it returns, go around again. The pump itself
//! (`run`) is the async half of that; everything else here is plain,
//! synchronous routing so it can be unit tested without spinning up a
//! `Clock` or `MessageBus` at all.

use std::sync::Arc;

use engine_core::clock::{Clock, TimerId};
use engine_core::dictionary::Dictionary;
use engine_core::room::MessageBus;
use engine_core::traits::TypeHandler;
use protocol::outbound::ErrorPayload;
use protocol::{InboundEvent, OutboundEvent, QuestionType};
use serde_json::json;
use tokio::sync::mpsc;

use crate::collaborators::{QuizStore, WordProvider};
use crate::error::EngineError;
use crate::handlers::abcd::AbcdHandler;
use crate::handlers::blind_map::BlindMapHandler;
use crate::handlers::drawing::DrawingHandler;
use crate::handlers::guess_number::GuessANumberHandler;
use crate::handlers::math_quiz::MathQuizHandler;
use crate::handlers::open_answer::OpenAnswerHandler;
use crate::handlers::word_chain::WordChainHandler;
use crate::question::QuestionKind;
use crate::session::Session;
use crate::timers;
use crate::{flow, lobby, Command};

/// Everything that can land in the dispatcher's mailbox: a client event off
/// the wire, or a timer this same dispatcher previously armed firing back.
/// `Clock<DispatcherEvent>` posts `TimerFired` through the same channel an
/// inbound event arrives on, so the actor loop has exactly one place to
/// read from.
#[derive(Debug, Clone)]
pub enum DispatcherEvent {
    Inbound(InboundEvent),
    TimerFired(TimerId),
    /// Host-triggered actions (spec.md §4.2/§4.3): there is no client-facing
    /// wire event for these, only the host page's own controls, but they
    /// still have to be serialized through the same single-owner mailbox
    /// as everything else that touches `Session`.
    StartGame { quiz_id: String },
    ActivateTeamMode,
    ResetGame,
}

fn error_to(player_name: &str, err: EngineError) -> Vec<Command> {
    vec![Command::emit_player(player_name, OutboundEvent::Error(ErrorPayload { error: err.to_string() }))]
}

fn question_type(kind: &QuestionKind) -> QuestionType {
    match kind {
        QuestionKind::Abcd(_) => QuestionType::Abcd,
        QuestionKind::TrueFalse(_) => QuestionType::TrueFalse,
        QuestionKind::OpenAnswer(_) => QuestionType::OpenAnswer,
        QuestionKind::GuessANumber(_) => QuestionType::GuessANumber,
        QuestionKind::MathQuiz(_) => QuestionType::MathQuiz,
        QuestionKind::WordChain(_) => QuestionType::WordChain,
        QuestionKind::Drawing(_) => QuestionType::Drawing,
        QuestionKind::BlindMap(_) => QuestionType::BlindMap,
    }
}

/// Owns the session and the one stateful handler (word-chain needs the
/// dictionary); every other handler is a zero-sized unit struct built on
/// the spot.
pub struct Dispatcher {
    pub session: Session,
    word_chain: WordChainHandler,
    quiz_store: Arc<dyn QuizStore>,
    words: Arc<dyn WordProvider>,
}

fn random_chain_letter() -> char {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    loop {
        let c = (b'a' + rng.gen_range(0..26)) as char;
        if engine_core::dictionary::is_valid_chain_letter(c) {
            return c;
        }
    }
}

impl Dispatcher {
    pub fn new(dictionary: Arc<Dictionary>, quiz_store: Arc<dyn QuizStore>, words: Arc<dyn WordProvider>) -> Self {
        Dispatcher {
            session: Session::new(),
            word_chain: WordChainHandler { dictionary },
            quiz_store,
            words,
        }
    }

    /// Starts a game; not a wire event since it's triggered by the host
    /// surface rather than a player (spec.md §4.3 has no client-facing
    /// "start" message, only the host page's action).
    pub fn start_game(&mut self, quiz_id: &str) -> Vec<Command> {
        match flow::start_game(&mut self.session, quiz_id, self.quiz_store.as_ref(), self.words.as_ref(), random_chain_letter) {
            Ok(commands) => commands,
            Err(err) => vec![Command::emit_all(OutboundEvent::Error(ErrorPayload { error: err.to_string() }))],
        }
    }

    /// Same host-only footing as `start_game`. Returns each player's new
    /// team assignment so the transport layer can fold the connection's
    /// private room into its team room without reaching into `Session`
    /// itself (room membership lives in `engine_core::room`, not here).
    pub fn activate_team_mode(&mut self) -> Result<Vec<(String, protocol::Team)>, EngineError> {
        lobby::activate_team_mode(&mut self.session)?;
        let assignments = self
            .session
            .players
            .iter()
            .filter_map(|(name, player)| player.team.map(|team| (name.clone(), team)))
            .collect();
        Ok(assignments)
    }

    pub fn reset(&mut self) -> Vec<Command> {
        flow::reset(&mut self.session)
    }

    /// Routes one event off the wire. Lobby-scoped events are handled
    /// directly; everything else goes to the current question's handler,
    /// which ignores events that don't belong to its type.
    pub fn handle_inbound(&mut self, event: InboundEvent) -> Vec<Command> {
        match event {
            InboundEvent::JoinRoom { player_name } => {
                lobby::join(&mut self.session, player_name.clone()).unwrap_or_else(|e| error_to(&player_name, e))
            }
            InboundEvent::PlayerNameChanged { old_name, new_name } => {
                lobby::rename(&mut self.session, old_name.clone(), new_name).unwrap_or_else(|e| error_to(&old_name, e))
            }
            InboundEvent::PlayerLeaving { player_name } => {
                lobby::player_leaving(&mut self.session, player_name.clone()).unwrap_or_else(|e| error_to(&player_name, e))
            }
            InboundEvent::RemoteDisplayConnected => {
                self.session.is_remote_connected = true;
                vec![Command::emit_all(OutboundEvent::RemoteDisplayConnected(json!({})))]
            }
            InboundEvent::IsRemoteConnected => {
                vec![Command::emit_all(OutboundEvent::IsRemoteConnected(json!({
                    "connected": self.session.is_remote_connected,
                })))]
            }
            InboundEvent::ShowFinalScore => flow::show_final_score(&mut self.session),
            InboundEvent::TimeUp => self.resolve(vec![Command::AdvanceQuestion]),
            other => {
                let commands = self.dispatch_event(other);
                self.resolve(commands)
            }
        }
    }

    /// Routes a timer firing. `START_GAME`/`ADVANCE_DELAY` are the flow
    /// controller's own transition timers; `PREVIEW` hands off to the
    /// question's `initialize`; anything else belongs to the current
    /// question's handler.
    pub fn handle_timer(&mut self, timer_id: TimerId) -> Vec<Command> {
        match timer_id {
            timers::START_GAME | timers::ADVANCE_DELAY => flow::advance(&mut self.session),
            timers::PREVIEW => {
                let mut commands = flow::begin_live_phase(&mut self.session);
                commands.extend(self.dispatch_initialize());
                commands
            }
            other => {
                let commands = self.dispatch_timer(other);
                self.resolve(commands)
            }
        }
    }

    /// Expands the two terminal commands a handler can return
    /// (`AdvanceQuestion`/`EndGame`) into the flow-controller transition
    /// they stand for. Everything else passes through untouched.
    fn resolve(&mut self, commands: Vec<Command>) -> Vec<Command> {
        let mut resolved = Vec::with_capacity(commands.len());
        for command in commands {
            match command {
                Command::AdvanceQuestion => resolved.extend(flow::time_up(&mut self.session)),
                Command::EndGame => resolved.extend(flow::show_final_score(&mut self.session)),
                other => resolved.push(other),
            }
        }
        resolved
    }

    fn current_question_type(&self) -> Option<QuestionType> {
        self.session.current_question().map(|q| question_type(&q.kind))
    }

    fn dispatch_event(&mut self, event: InboundEvent) -> Vec<Command> {
        match self.current_question_type() {
            Some(QuestionType::Abcd) | Some(QuestionType::TrueFalse) => AbcdHandler.on_event(&mut self.session, event),
            Some(QuestionType::OpenAnswer) => OpenAnswerHandler.on_event(&mut self.session, event),
            Some(QuestionType::GuessANumber) => GuessANumberHandler.on_event(&mut self.session, event),
            Some(QuestionType::MathQuiz) => MathQuizHandler.on_event(&mut self.session, event),
            Some(QuestionType::WordChain) => self.word_chain.on_event(&mut self.session, event),
            Some(QuestionType::Drawing) => DrawingHandler.on_event(&mut self.session, event),
            Some(QuestionType::BlindMap) => BlindMapHandler.on_event(&mut self.session, event),
            None => Vec::new(),
        }
    }

    fn dispatch_timer(&mut self, timer_id: TimerId) -> Vec<Command> {
        match self.current_question_type() {
            Some(QuestionType::Abcd) | Some(QuestionType::TrueFalse) => AbcdHandler.on_time_up(&mut self.session, timer_id),
            Some(QuestionType::OpenAnswer) => OpenAnswerHandler.on_time_up(&mut self.session, timer_id),
            Some(QuestionType::GuessANumber) => GuessANumberHandler.on_time_up(&mut self.session, timer_id),
            Some(QuestionType::MathQuiz) => MathQuizHandler.on_time_up(&mut self.session, timer_id),
            Some(QuestionType::WordChain) => self.word_chain.on_time_up(&mut self.session, timer_id),
            Some(QuestionType::Drawing) => DrawingHandler.on_time_up(&mut self.session, timer_id),
            Some(QuestionType::BlindMap) => BlindMapHandler.on_time_up(&mut self.session, timer_id),
            None => Vec::new(),
        }
    }

    fn dispatch_initialize(&mut self) -> Vec<Command> {
        match self.current_question_type() {
            Some(QuestionType::Abcd) | Some(QuestionType::TrueFalse) => AbcdHandler.initialize(&mut self.session),
            Some(QuestionType::OpenAnswer) => OpenAnswerHandler.initialize(&mut self.session),
            Some(QuestionType::GuessANumber) => GuessANumberHandler.initialize(&mut self.session),
            Some(QuestionType::MathQuiz) => MathQuizHandler.initialize(&mut self.session),
            Some(QuestionType::WordChain) => self.word_chain.initialize(&mut self.session),
            Some(QuestionType::Drawing) => DrawingHandler.initialize(&mut self.session),
            Some(QuestionType::BlindMap) => BlindMapHandler.initialize(&mut self.session),
            None => Vec::new(),
        }
    }
}

/// The actor loop itself: owns the dispatcher, a timer clock wired back
/// into its own mailbox, and the message bus every `Emit` command resolves
/// against. Runs until `events` closes (every sender, including the
/// clock's, has been dropped).
pub async fn run(
    mut dispatcher: Dispatcher,
    mut events: mpsc::Receiver<DispatcherEvent>,
    clock: Clock<DispatcherEvent>,
    bus: Arc<MessageBus<OutboundEvent>>,
) {
    while let Some(event) = events.recv().await {
        let commands = match event {
            DispatcherEvent::Inbound(inbound) => dispatcher.handle_inbound(inbound),
            DispatcherEvent::TimerFired(timer_id) => dispatcher.handle_timer(timer_id),
            DispatcherEvent::StartGame { quiz_id } => dispatcher.start_game(&quiz_id),
            DispatcherEvent::ActivateTeamMode => match dispatcher.activate_team_mode() {
                Ok(assignments) => {
                    for (player_name, team) in assignments {
                        bus.join_team_by_name(&player_name, team);
                    }
                    Vec::new()
                }
                Err(err) => vec![Command::emit_all(OutboundEvent::Error(ErrorPayload { error: err.to_string() }))],
            },
            DispatcherEvent::ResetGame => dispatcher.reset(),
        };
        for command in commands {
            match command {
                Command::Emit { target, event } => bus.send(&target, event),
                Command::ArmTimer { id, delay_ms } => clock.arm(id, delay_ms, DispatcherEvent::TimerFired).await,
                Command::CancelTimer { id } => clock.cancel(id).await,
                Command::AdvanceQuestion | Command::EndGame => {
                    tracing::error!("dispatcher terminal command reached the actor loop unresolved");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{QuestionDocument, QuizDocument};
    use engine_core::clock::now_ms;

    struct OneQuestionStore;
    impl QuizStore for OneQuestionStore {
        fn load_quiz(&self, _quiz_id: &str) -> Result<QuizDocument, EngineError> {
            Ok(QuizDocument {
                questions: vec![QuestionDocument {
                    question_type: QuestionType::Abcd,
                    category: "general".into(),
                    length_seconds: 10,
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_index: Some(0),
                    open_answer: None,
                    number_answer: None,
                    math_sequences: vec![],
                    drawing_words: vec![],
                    city_name: None,
                    anagram: None,
                    location: None,
                    map_type: None,
                    clues: vec![],
                }],
            })
        }
    }

    struct NoWords;
    impl WordProvider for NoWords {
        fn dictionary_contents(&self) -> Option<String> {
            None
        }
        fn random_seed_word(&self) -> String {
            "pes".into()
        }
    }

    fn dispatcher_with_player() -> Dispatcher {
        let mut dispatcher = Dispatcher::new(Arc::new(Dictionary::permissive()), Arc::new(OneQuestionStore), Arc::new(NoWords));
        dispatcher.handle_inbound(InboundEvent::JoinRoom { player_name: "alice".into() });
        dispatcher
    }

    #[test]
    fn joining_adds_the_player_to_the_session() {
        let dispatcher = dispatcher_with_player();
        assert!(dispatcher.session.has_player("alice"));
    }

    #[test]
    fn joining_twice_reports_an_error_to_the_offending_player() {
        let mut dispatcher = dispatcher_with_player();
        let commands = dispatcher.handle_inbound(InboundEvent::JoinRoom { player_name: "alice".into() });
        assert!(matches!(
            commands.as_slice(),
            [Command::Emit { target: protocol::RoomTarget::Player(name), event: OutboundEvent::Error(_) }] if name == "alice"
        ));
    }

    #[test]
    fn full_cycle_from_start_through_preview_into_the_live_question() {
        let mut dispatcher = dispatcher_with_player();
        dispatcher.start_game("quiz1");
        assert!(dispatcher.session.is_game_running);

        dispatcher.handle_timer(timers::START_GAME);
        assert_eq!(dispatcher.session.current_index, Some(0));

        dispatcher.handle_timer(timers::PREVIEW);
        assert!(dispatcher.session.question_start_ms.is_some());
        match &dispatcher.session.current_question().unwrap().kind {
            QuestionKind::Abcd(_) => {}
            _ => panic!("expected the loaded question to be an ABCD question"),
        }
    }

    #[test]
    fn answering_then_timing_out_advances_past_the_last_question_to_final_score() {
        let mut dispatcher = dispatcher_with_player();
        dispatcher.start_game("quiz1");
        dispatcher.handle_timer(timers::START_GAME);
        dispatcher.handle_timer(timers::PREVIEW);

        let start = dispatcher.session.question_start_ms.unwrap_or_else(now_ms);
        dispatcher.handle_inbound(InboundEvent::SubmitAnswer { player_name: "alice".into(), answer: 0, answer_time: start });
        // Solo player answering completes the question and fast-forwards
        // the primary timer; firing it now runs the same path a natural
        // timeout would.
        dispatcher.handle_timer(timers::PRIMARY);
        assert!(dispatcher.session.is_game_running, "still mid phase-transition delay");

        dispatcher.handle_timer(timers::ADVANCE_DELAY);
        assert!(!dispatcher.session.is_game_running, "the only question was answered; the game should have ended");
    }
}
