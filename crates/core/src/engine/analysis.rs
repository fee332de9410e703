//! Types for representing engine search results

use std::fmt;

/// Represents a position evaluation from the side to move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// Centipawn score
    Centipawns(i32),
    /// Forced mate in N (negative when the side to move is being mated)
    Mate(i32),
}

impl Evaluation {
    /// Returns true if the engine sees a forced mate for the side to move
    pub fn is_winning_mate(&self) -> bool {
        matches!(self, Evaluation::Mate(moves) if *moves > 0)
    }

    /// Converts evaluation to a pawn-unit score
    pub fn as_score(&self) -> f32 {
        match self {
            Evaluation::Centipawns(cp) => *cp as f32 / 100.0,
            Evaluation::Mate(moves) => {
                if *moves > 0 {
                    100.0
                } else {
                    -100.0
                }
            }
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => {
                let score = *cp as f32 / 100.0;
                if score >= 0.0 {
                    write!(f, "+{:.2}", score)
                } else {
                    write!(f, "{:.2}", score)
                }
            }
            Evaluation::Mate(moves) => write!(f, "M{}", moves),
        }
    }
}

/// Complete analysis of a position
#[derive(Debug, Clone)]
pub struct PositionAnalysis {
    /// Best move found, empty when the engine reported none
    pub best_move: String,
    /// Evaluation of the position
    pub evaluation: Evaluation,
    /// Analysis depth reached
    pub depth: u8,
    /// Principal variation (best line of play)
    pub pv: Vec<String>,
}

impl PositionAnalysis {
    /// Returns a brief summary of the analysis
    pub fn summary(&self) -> String {
        format!(
            "Eval: {} | Best: {} | Depth: {} | PV: {}",
            self.evaluation,
            self.best_move,
            self.depth,
            self.pv.iter().take(5).cloned().collect::<Vec<_>>().join(" ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_display() {
        assert_eq!(Evaluation::Centipawns(35).to_string(), "+0.35");
        assert_eq!(Evaluation::Centipawns(-120).to_string(), "-1.20");
        assert_eq!(Evaluation::Mate(-2).to_string(), "M-2");
        assert!(Evaluation::Mate(1).is_winning_mate());
        assert!(!Evaluation::Centipawns(900).is_winning_mate());
    }
}
