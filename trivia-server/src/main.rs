mod assets;
mod state;
mod ws;

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use engine_core::clock::Clock;
use engine_core::dictionary::Dictionary;
use engine_core::room::MessageBus;
use game_engine::dispatcher::{self, Dispatcher, DispatcherEvent};
use serde::Deserialize;
use tower_http::services::{ServeDir, ServeFile};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::state::AppState;

#[tokio::main]
/// Activates tracing, builds the single dispatcher actor this process runs
/// (spec.md §9 — one polymorphic game engine, not a room registry), then
/// serves websockets and the host-only control routes on `BIND_ADDR`.
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("{}=trace", env!("CARGO_CRATE_NAME")).into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .init();

    let (quiz_store, words) = assets::build_collaborators("quizzes", "dictionary.dic");
    let dictionary = match words.dictionary_contents() {
        Some(contents) => Dictionary::load(&contents),
        None => Dictionary::permissive(),
    };

    let (to_dispatcher, from_transport) = tokio::sync::mpsc::channel(protocol::CHANNEL_BUFFER_SIZE);
    let bus = Arc::new(MessageBus::new());
    let clock = Clock::new(to_dispatcher.clone());
    let engine = Dispatcher::new(Arc::new(dictionary), quiz_store, words);
    tokio::spawn(dispatcher::run(engine, from_transport, clock, bus.clone()));

    let app_state = Arc::new(AppState::new(to_dispatcher, bus));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/start", get(start_handler))
        .route("/activate-team-mode", get(activate_team_mode_handler))
        .route("/reset", get(reset_handler))
        .with_state(app_state)
        .fallback_service(ServeDir::new(".").not_found_service(ServeFile::new("index.html")));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.unwrap();
    tracing::info!(bind_addr, "listening");
    axum::serve(listener, app).await.unwrap();
}

/// Upgrades the HTTP request to a websocket and hands it to [`ws::handle_socket`].
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| ws::handle_socket(socket, state))
}

#[derive(Deserialize)]
struct StartQuery {
    quiz_id: String,
}

/// Host-only control route: there is no client-facing "start game" wire
/// event (spec.md §4.3), only the host page's own action, so it is exposed
/// as a plain route rather than something routed through `InboundEvent`.
async fn start_handler(State(state): State<Arc<AppState>>, Query(query): Query<StartQuery>) -> &'static str {
    match state.to_dispatcher.send(DispatcherEvent::StartGame { quiz_id: query.quiz_id }).await {
        Ok(()) => "started",
        Err(_) => "dispatcher unavailable",
    }
}

async fn activate_team_mode_handler(State(state): State<Arc<AppState>>) -> &'static str {
    match state.to_dispatcher.send(DispatcherEvent::ActivateTeamMode).await {
        Ok(()) => "activated",
        Err(_) => "dispatcher unavailable",
    }
}

async fn reset_handler(State(state): State<Arc<AppState>>) -> &'static str {
    match state.to_dispatcher.send(DispatcherEvent::ResetGame).await {
        Ok(()) => "reset",
        Err(_) => "dispatcher unavailable",
    }
}
