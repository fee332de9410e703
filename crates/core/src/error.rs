//! Error types for line-trainer-core

use thiserror::Error;

use crate::board::MoveError;
use crate::engine::EngineError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Invalid FEN: {0}")]
    Fen(String),

    #[error("Move error: {0}")]
    Move(#[from] MoveError),

    #[error("PGN parsing error: {0}")]
    Pgn(String),

    #[error("No variations in this line")]
    NoVariations,

    #[error("Could not load variation {0}")]
    VariationIndex(usize),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
