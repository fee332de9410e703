use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::Instant;

use line_trainer_core::training::{AttemptOutcome, SessionSnapshot};
use line_trainer_core::{LineDriver, Repertoire, UiMove};

use crate::error::AppError;
use crate::{AppState, SessionEntry};

// ============================================================================
// REQUESTS / RESPONSES
// ============================================================================

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub pgn: String,
    #[serde(default)]
    pub variation: usize,
}

#[derive(Deserialize)]
pub struct MoveRequest {
    /// Square-to-square move as the board widget reports it, e.g. `e2e4` or `e1g1`
    pub uci: String,
}

#[derive(Deserialize)]
pub struct VariationRequest {
    pub index: usize,
}

#[derive(Serialize)]
pub struct CreatedSession {
    pub id: u64,
    pub variations: usize,
    pub snapshot: SessionSnapshot,
}

#[derive(Serialize)]
pub struct MoveResponse {
    pub outcome: AttemptOutcome,
    pub snapshot: SessionSnapshot,
}

#[derive(Serialize)]
pub struct NavigationResponse {
    pub moved: bool,
    pub snapshot: SessionSnapshot,
}

// ============================================================================
// HELPERS
// ============================================================================

/// Looks up a session and marks it as used
fn session(state: &AppState, id: u64) -> Result<SessionEntry, AppError> {
    let mut sessions = state.sessions();
    let entry = sessions
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
    entry.last_used = Instant::now();
    Ok(entry.clone())
}

fn driver(state: &AppState, id: u64) -> Result<LineDriver, AppError> {
    session(state, id).map(|entry| entry.driver)
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreatedSession>), AppError> {
    let repertoire = Repertoire::from_pgn(&req.pgn)?;

    let driver = LineDriver::new(state.config.timing.clone());
    driver.switch_variation(&repertoire, req.variation)?;

    let id = state.next_id.fetch_add(1, Ordering::Relaxed);
    let variations = repertoire.len();
    let snapshot = driver.snapshot();

    state.sessions().insert(
        id,
        SessionEntry {
            repertoire: Arc::new(repertoire),
            driver,
            last_used: Instant::now(),
        },
    );

    tracing::info!(id, variations, "Session created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedSession {
            id,
            variations,
            snapshot,
        }),
    ))
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SessionSnapshot>, AppError> {
    Ok(Json(driver(&state, id)?.snapshot()))
}

/// DELETE /sessions/:id
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    let entry = state
        .sessions()
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
    entry.driver.dispose();

    tracing::info!(id, "Session disposed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sessions/:id/move
pub async fn attempt_move(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    let driver = driver(&state, id)?;
    let mv: UiMove = req
        .uci
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{}", e)))?;

    let outcome = driver.attempt(mv);
    Ok(Json(MoveResponse {
        outcome,
        snapshot: driver.snapshot(),
    }))
}

/// POST /sessions/:id/hint
pub async fn show_hint(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let driver = driver(&state, id)?;
    driver.hint();
    Ok(Json(driver.snapshot()))
}

/// POST /sessions/:id/back
pub async fn go_back(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<NavigationResponse>, AppError> {
    let driver = driver(&state, id)?;
    let moved = driver.back();
    Ok(Json(NavigationResponse {
        moved,
        snapshot: driver.snapshot(),
    }))
}

/// POST /sessions/:id/forward
pub async fn go_forward(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<NavigationResponse>, AppError> {
    let driver = driver(&state, id)?;
    let moved = driver.forward();
    Ok(Json(NavigationResponse {
        moved,
        snapshot: driver.snapshot(),
    }))
}

/// POST /sessions/:id/flip
pub async fn flip_board(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let driver = driver(&state, id)?;
    driver.flip();
    Ok(Json(driver.snapshot()))
}

/// POST /sessions/:id/reset
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let driver = driver(&state, id)?;
    driver.reset();
    Ok(Json(driver.snapshot()))
}

/// POST /sessions/:id/variation
pub async fn switch_variation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<VariationRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let entry = session(&state, id)?;
    entry.driver.switch_variation(&entry.repertoire, req.index)?;
    Ok(Json(entry.driver.snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use line_trainer_core::training::Phase;
    use line_trainer_core::TrainerConfig;
    use std::time::Duration;

    const PGN: &str = "[Event \"Italian\"]\n\n1. e4 e5 2. Nf3 Nc6 3. Bc4 *\n\n\
                       [Event \"Queen's Gambit\"]\n\n1. d4 d5 2. c4 *\n";

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(TrainerConfig::default()))
    }

    async fn create(state: &Arc<AppState>) -> u64 {
        let req = CreateSessionRequest {
            pgn: PGN.to_string(),
            variation: 0,
        };
        let (status, Json(created)) = create_session(State(Arc::clone(state)), Json(req))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        created.id
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_lifecycle() {
        let state = state();
        let id = create(&state).await;

        let Json(resp) = attempt_move(
            State(Arc::clone(&state)),
            Path(id),
            Json(MoveRequest { uci: "e2e4".into() }),
        )
        .await
        .unwrap();
        assert!(matches!(resp.outcome, AttemptOutcome::Accepted { .. }));
        assert_eq!(resp.snapshot.cursor, 1);

        tokio::time::sleep(std::time::Duration::from_millis(600)).await;
        let Json(snap) = get_session(State(Arc::clone(&state)), Path(id)).await.unwrap();
        assert_eq!(snap.cursor, 2);
        assert_eq!(snap.phase, Phase::AwaitingMove);

        let Json(snap) = switch_variation(
            State(Arc::clone(&state)),
            Path(id),
            Json(VariationRequest { index: 1 }),
        )
        .await
        .unwrap();
        assert_eq!(snap.variation_name.as_deref(), Some("Queen's Gambit"));

        let status = delete_session(State(Arc::clone(&state)), Path(id)).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(matches!(
            get_session(State(state), Path(id)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sessions_are_evicted() {
        let state = state();
        let idle = create(&state).await;
        let active = create(&state).await;
        let max_idle = Duration::from_secs(60);

        tokio::time::advance(Duration::from_secs(45)).await;
        get_session(State(Arc::clone(&state)), Path(active)).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(state.evict_idle(max_idle), 1);
        assert!(matches!(
            get_session(State(Arc::clone(&state)), Path(idle)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(get_session(State(state), Path(active)).await.is_ok());
    }

    #[tokio::test]
    async fn test_bad_requests() {
        let state = state();
        let id = create(&state).await;

        let result = attempt_move(
            State(Arc::clone(&state)),
            Path(id),
            Json(MoveRequest { uci: "nonsense".into() }),
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = switch_variation(
            State(Arc::clone(&state)),
            Path(id),
            Json(VariationRequest { index: 7 }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Core(_))));

        let req = CreateSessionRequest {
            pgn: String::new(),
            variation: 0,
        };
        assert!(create_session(State(state), Json(req)).await.is_err());
    }
}
