//! Chess engine integration
//!
//! Provides the best-move oracle used by the puzzle synthesizer, backed by
//! UCI-compatible engines like Stockfish.

pub mod analysis;
pub mod oracle;
pub mod stockfish;

// Re-export main types for convenience
pub use analysis::{Evaluation, PositionAnalysis};
pub use oracle::{EngineMove, EngineOracle};
pub use stockfish::{EngineError, StockfishEngine};
