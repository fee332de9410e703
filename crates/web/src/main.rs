use axum::{
    routing::{get, post},
    Router,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use line_trainer_core::{LineDriver, Repertoire, TrainerConfig};

mod error;
mod routes;

/// A live training session and the repertoire it was created from
#[derive(Clone)]
pub struct SessionEntry {
    pub repertoire: Arc<Repertoire>,
    pub driver: LineDriver,
    pub last_used: Instant,
}

pub struct AppState {
    pub config: TrainerConfig,
    pub sessions: Mutex<HashMap<u64, SessionEntry>>,
    pub next_id: AtomicU64,
}

impl AppState {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn sessions(&self) -> MutexGuard<'_, HashMap<u64, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Disposes sessions nobody has touched for `max_idle`, returning how many went
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|id, entry| {
            let keep = now.duration_since(entry.last_used) < max_idle;
            if !keep {
                entry.driver.dispose();
                tracing::info!(id, "Session evicted after idle timeout");
            }
            keep
        });
        before - sessions.len()
    }
}

/// Sweeps idle sessions until the server stops
fn spawn_idle_sweeper(state: Arc<AppState>) {
    let max_idle = state.config.session_idle_timeout;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(max_idle / 4);
        loop {
            ticker.tick().await;
            state.evict_idle(max_idle);
        }
    });
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/puzzles", post(routes::synthesize_puzzles))
        .route("/sessions", post(routes::training::create_session))
        .route(
            "/sessions/:id",
            get(routes::training::get_session).delete(routes::training::delete_session),
        )
        .route("/sessions/:id/move", post(routes::training::attempt_move))
        .route("/sessions/:id/hint", post(routes::training::show_hint))
        .route("/sessions/:id/back", post(routes::training::go_back))
        .route("/sessions/:id/forward", post(routes::training::go_forward))
        .route("/sessions/:id/flip", post(routes::training::flip_board))
        .route("/sessions/:id/reset", post(routes::training::reset_session))
        .route("/sessions/:id/variation", post(routes::training::switch_variation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = TrainerConfig::from_env();
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config));
    spawn_idle_sweeper(Arc::clone(&state));

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server running at http://{}", bind_addr);

    if let Err(e) = axum::serve(listener, app(state)).await {
        tracing::error!("Server error: {}", e);
    }
}
