//! Puzzle synthesis from flagged game mistakes

mod synthesizer;
mod types;

pub use synthesizer::{PuzzleSynthesizer, MAX_SOLUTION_PLIES};
pub use types::*;
