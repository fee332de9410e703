//! Best-move oracle seam

use super::analysis::Evaluation;
use super::stockfish::{EngineError, StockfishEngine};

/// A single best-move answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineMove {
    /// Move in UCI notation (e.g. "d1d8")
    pub uci: String,
    pub evaluation: Evaluation,
}

/// Anything that can answer "best move at this FEN to this depth".
///
/// Each call is one blocking step; callers never issue overlapping queries
/// against the same handle.
pub trait EngineOracle {
    /// Returns `None` when the engine has no move (mate or stalemate on the board)
    fn best_move(&mut self, fen: &str, depth: u8) -> Result<Option<EngineMove>, EngineError>;
}

impl EngineOracle for StockfishEngine {
    fn best_move(&mut self, fen: &str, depth: u8) -> Result<Option<EngineMove>, EngineError> {
        self.set_position(Some(fen), None)?;
        let analysis = self.analyze(depth)?;

        if analysis.best_move.is_empty() || analysis.best_move == "(none)" {
            return Ok(None);
        }

        Ok(Some(EngineMove {
            uci: analysis.best_move,
            evaluation: analysis.evaluation,
        }))
    }
}

impl<T: EngineOracle + ?Sized> EngineOracle for &mut T {
    fn best_move(&mut self, fen: &str, depth: u8) -> Result<Option<EngineMove>, EngineError> {
        (**self).best_move(fen, depth)
    }
}
