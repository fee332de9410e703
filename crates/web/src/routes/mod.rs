use axum::{extract::State, Json};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use line_trainer_core::{Mistake, PuzzleSynthesizer, StockfishEngine};

use crate::error::AppError;
use crate::AppState;

pub mod training;

pub async fn health() -> &'static str {
    "OK"
}

/// POST /puzzles
///
/// Runs a whole batch on one engine process. Mistakes that produce no puzzle
/// are left out of the response.
pub async fn synthesize_puzzles(
    State(state): State<Arc<AppState>>,
    Json(mistakes): Json<Vec<Mistake>>,
) -> Result<Json<JsonValue>, AppError> {
    let path = state.config.stockfish_path.clone();
    let synthesis = state.config.synthesis;
    let submitted = mistakes.len();

    let puzzles = tokio::task::spawn_blocking(move || -> Result<JsonValue, AppError> {
        let engine = StockfishEngine::new(&path)
            .map_err(|e| AppError::Internal(format!("Failed to start engine: {}", e)))?;
        let mut synthesizer = PuzzleSynthesizer::new(engine, synthesis);
        let puzzles = synthesizer.synthesize_batch(&mistakes);
        Ok(serde_json::to_value(&puzzles).map_err(line_trainer_core::Error::from)?)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Synthesis task failed: {}", e)))??;

    tracing::info!(submitted, "Puzzle batch synthesized");

    Ok(Json(puzzles))
}
