use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oddout::prompts::{BuiltinPrompts, PromptSource};
use oddout::state::AppState;
use oddout::store::{JsonFileStore, MemStore, SessionStore};
use oddout::{api, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oddout=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting oddout...");

    // File-backed session documents if a data dir is configured,
    // otherwise everything lives in memory.
    let store: Arc<dyn SessionStore> = match std::env::var("ODDOUT_DATA_DIR") {
        Ok(dir) => {
            tracing::info!("Persisting sessions under {}", dir);
            Arc::new(JsonFileStore::new(dir))
        }
        Err(_) => Arc::new(MemStore::new()),
    };

    let prompts = Arc::new(BuiltinPrompts::new());
    tracing::info!("Prompt source: {}", prompts.name());

    let state = Arc::new(AppState::new(store, prompts));

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/games", post(api::create_game))
        .route("/api/games/{id}/join", post(api::join_game))
        .route("/api/games/{id}/players", get(api::get_players))
        .route("/api/games/{id}/question", get(api::get_shared_question))
        .route(
            "/api/games/{id}/question/{user_id}",
            get(api::get_member_question),
        )
        .route("/api/games/{id}/liar", get(api::get_liar))
        .route("/api/games/{id}/answer", post(api::submit_answer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = std::env::var("ODDOUT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4613);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
