//! Line Trainer Core Library
//!
//! Scripted-line verification and engine-assisted puzzle synthesis on top of
//! `shakmaty`.

use shakmaty::{Chess, Color, Position};

pub mod board;
pub mod castling;
pub mod config;
pub mod engine;
pub mod error;
pub mod parser;
pub mod puzzles;
pub mod training;

pub use board::UiMove;
pub use config::{SynthesisConfig, TimingConfig, TrainerConfig};
pub use engine::{EngineOracle, StockfishEngine};
pub use error::{Error, Result};
pub use puzzles::{Mistake, Puzzle, PuzzleSynthesizer, PuzzleTheme};
pub use training::{LineDriver, LineSession, Repertoire, Variation};

/// Basic position information
#[derive(Debug)]
pub struct PositionInfo {
    pub legal_move_count: u32,
    pub side_to_move: Color,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub is_stalemate: bool,
}

/// Analyzes a chess position
pub fn analyze_position(position: &Chess) -> PositionInfo {
    PositionInfo {
        legal_move_count: position.legal_moves().len() as u32,
        side_to_move: position.turn(),
        is_check: position.is_check(),
        is_checkmate: position.is_checkmate(),
        is_stalemate: position.is_stalemate(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_position() {
        let info = analyze_position(&Chess::default());
        assert_eq!(info.side_to_move, Color::White);
        assert_eq!(info.legal_move_count, 20);
        assert!(!info.is_check);
        assert!(!info.is_checkmate);
    }

    #[test]
    fn test_mated_position() {
        let position = board::parse_fen("3R2k1/5ppp/8/8/8/8/5PPP/6K1 b - - 1 1").unwrap();
        let info = analyze_position(&position);
        assert!(info.is_check);
        assert!(info.is_checkmate);
        assert_eq!(info.legal_move_count, 0);
    }
}
