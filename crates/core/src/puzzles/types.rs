//! Mistake input and puzzle output types

use serde::{Deserialize, Serialize, Serializer};
use shakmaty::Color;

use crate::board;

/// How the analysis pipeline classified a move.
///
/// Unrecognized tags deserialize to `Unknown` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum MistakeClassification {
    Inaccuracy,
    Mistake,
    Blunder,
    MissedTactic,
    Brilliant,
    #[default]
    Unknown,
}

impl MistakeClassification {
    pub fn from_tag(tag: &str) -> Self {
        let normalized: String = tag
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "inaccuracy" => MistakeClassification::Inaccuracy,
            "mistake" => MistakeClassification::Mistake,
            "blunder" => MistakeClassification::Blunder,
            "missedtactic" | "miss" => MistakeClassification::MissedTactic,
            "brilliant" => MistakeClassification::Brilliant,
            _ => MistakeClassification::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MistakeClassification::Inaccuracy => "inaccuracy",
            MistakeClassification::Mistake => "mistake",
            MistakeClassification::Blunder => "blunder",
            MistakeClassification::MissedTactic => "missed_tactic",
            MistakeClassification::Brilliant => "brilliant",
            MistakeClassification::Unknown => "unknown",
        }
    }
}

impl From<String> for MistakeClassification {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

/// One flagged position from a finished game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mistake {
    pub fen: String,
    #[serde(alias = "playedMoveUci")]
    pub played_move_uci: String,
    #[serde(default, alias = "engineBestMoveUci")]
    pub engine_best_move_uci: Option<String>,
    #[serde(default)]
    pub classification: MistakeClassification,
    #[serde(default, alias = "moveNumber")]
    pub move_number: u32,
}

/// Heuristic tag describing what the puzzle's final move does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleTheme {
    Checkmate,
    Check,
    Capture,
    Castling,
    Tactics,
}

impl PuzzleTheme {
    /// Derives the theme from the last move of the solution
    pub fn from_last_san(san: Option<&str>) -> Self {
        match san {
            Some(s) if s.contains('#') => PuzzleTheme::Checkmate,
            Some(s) if s.contains('+') => PuzzleTheme::Check,
            Some(s) if s.contains('x') => PuzzleTheme::Capture,
            Some(s) if s.starts_with("O-O") => PuzzleTheme::Castling,
            _ => PuzzleTheme::Tactics,
        }
    }

    /// Lenient tag lookup; anything unknown is `Tactics`
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "checkmate" | "mate" => PuzzleTheme::Checkmate,
            "check" => PuzzleTheme::Check,
            "capture" => PuzzleTheme::Capture,
            "castling" => PuzzleTheme::Castling,
            _ => PuzzleTheme::Tactics,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PuzzleTheme::Checkmate => "checkmate",
            PuzzleTheme::Check => "check",
            PuzzleTheme::Capture => "capture",
            PuzzleTheme::Castling => "castling",
            PuzzleTheme::Tactics => "tactics",
        }
    }
}

fn serialize_color<S: Serializer>(color: &Color, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(board::color_name(*color))
}

/// A short forced line built from a mistake.
///
/// `solution_uci` alternates solver and opponent starting with the side to
/// move at `origin_fen`, and is always 1, 3 or 4 plies long.
#[derive(Debug, Clone, Serialize)]
pub struct Puzzle<'a> {
    pub origin_fen: String,
    #[serde(serialize_with = "serialize_color")]
    pub solving_side: Color,
    pub solution_uci: Vec<String>,
    /// Best effort; may be shorter than `solution_uci`
    pub solution_san: Vec<String>,
    pub theme: PuzzleTheme,
    pub source_mistake: &'a Mistake,
}

impl Puzzle<'_> {
    pub fn len(&self) -> usize {
        self.solution_uci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solution_uci.is_empty()
    }

    pub fn is_single_move(&self) -> bool {
        self.solution_uci.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_last_san() {
        assert_eq!(PuzzleTheme::from_last_san(Some("Qxf7#")), PuzzleTheme::Checkmate);
        assert_eq!(PuzzleTheme::from_last_san(Some("Bb5+")), PuzzleTheme::Check);
        assert_eq!(PuzzleTheme::from_last_san(Some("Nxe5")), PuzzleTheme::Capture);
        assert_eq!(PuzzleTheme::from_last_san(Some("O-O-O")), PuzzleTheme::Castling);
        assert_eq!(PuzzleTheme::from_last_san(Some("Nf3")), PuzzleTheme::Tactics);
        assert_eq!(PuzzleTheme::from_last_san(None), PuzzleTheme::Tactics);
        assert_eq!(PuzzleTheme::from_tag("fork"), PuzzleTheme::Tactics);
    }

    #[test]
    fn test_mistake_json_is_lenient() {
        let json = r#"[
            {"fen": "8/8/8/8/8/8/8/8 w - - 0 1", "played_move_uci": "e2e4",
             "engine_best_move_uci": "d2d4", "classification": "blunder", "move_number": 12},
            {"fen": "8/8/8/8/8/8/8/8 w - - 0 1", "playedMoveUci": "e2e4",
             "classification": "missed-tactic"},
            {"fen": "8/8/8/8/8/8/8/8 w - - 0 1", "played_move_uci": "e2e4",
             "classification": "great_find"}
        ]"#;
        let mistakes: Vec<Mistake> = serde_json::from_str(json).unwrap();
        assert_eq!(mistakes[0].classification, MistakeClassification::Blunder);
        assert_eq!(mistakes[0].engine_best_move_uci.as_deref(), Some("d2d4"));
        assert_eq!(mistakes[1].classification, MistakeClassification::MissedTactic);
        assert_eq!(mistakes[1].engine_best_move_uci, None);
        assert_eq!(mistakes[2].classification, MistakeClassification::Unknown);
        assert_eq!(mistakes[2].move_number, 0);
    }
}
