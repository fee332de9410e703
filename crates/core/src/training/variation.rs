//! Trainable variations and the repertoire that groups them

use shakmaty::{Chess, Color, Position};

use crate::board::{self, MoveError};
use crate::error::{Error, Result};
use crate::parser;

/// One trainable line: a start position plus the expected SAN moves.
///
/// The move list is fixed once parsed; re-parsing produces a new value.
#[derive(Debug, Clone)]
pub struct Variation {
    name: String,
    starting_position: Chess,
    expected_moves: Vec<String>,
    trained_side: Color,
}

impl Variation {
    /// Builds a variation; the trained side defaults to the side to move at the start
    pub fn new(
        name: String,
        starting_position: Chess,
        expected_moves: Vec<String>,
        trained_side: Option<Color>,
    ) -> Self {
        let trained_side = trained_side.unwrap_or_else(|| starting_position.turn());
        Self {
            name,
            starting_position,
            expected_moves,
            trained_side,
        }
    }

    /// Parses movetext from the standard starting position
    pub fn from_movetext(movetext: &str) -> Result<Self> {
        parser::parse_movetext(movetext, None, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn starting_position(&self) -> &Chess {
        &self.starting_position
    }

    pub fn starting_fen(&self) -> String {
        board::to_fen(&self.starting_position)
    }

    pub fn expected_moves(&self) -> &[String] {
        &self.expected_moves
    }

    pub fn expected_at(&self, cursor: usize) -> Option<&str> {
        self.expected_moves.get(cursor).map(String::as_str)
    }

    pub fn trained_side(&self) -> Color {
        self.trained_side
    }

    pub fn len(&self) -> usize {
        self.expected_moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expected_moves.is_empty()
    }

    /// Whether the learner owns the move at `cursor`.
    ///
    /// Derived from the line's parity, not the board, so replayed positions
    /// always agree with the script.
    pub fn is_trained_turn(&self, cursor: usize) -> bool {
        let starts_with_trained = self.starting_position.turn() == self.trained_side;
        (cursor % 2 == 0) == starts_with_trained
    }

    /// Position after the first `cursor` expected moves
    pub fn position_at(&self, cursor: usize) -> std::result::Result<Chess, MoveError> {
        let end = cursor.min(self.expected_moves.len());
        board::replay(&self.starting_position, &self.expected_moves[..end])
    }
}

/// Ordered variations of one line or chapter
#[derive(Debug, Clone, Default)]
pub struct Repertoire {
    variations: Vec<Variation>,
}

impl Repertoire {
    pub fn new(variations: Vec<Variation>) -> Self {
        Self { variations }
    }

    pub fn from_pgn(pgn: &str) -> Result<Self> {
        Ok(Self::new(parser::parse_variations(pgn)?))
    }

    pub fn len(&self) -> usize {
        self.variations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variation> {
        self.variations.iter()
    }

    pub fn get(&self, index: usize) -> Result<&Variation> {
        if self.variations.is_empty() {
            return Err(Error::NoVariations);
        }
        self.variations
            .get(index)
            .ok_or(Error::VariationIndex(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_follows_start_and_side() {
        let white = Variation::from_movetext("1. e4 e5 2. Nf3").unwrap();
        assert!(white.is_trained_turn(0));
        assert!(!white.is_trained_turn(1));
        assert!(white.is_trained_turn(2));

        let as_black = Variation::new(
            "Black".to_string(),
            Chess::default(),
            white.expected_moves().to_vec(),
            Some(Color::Black),
        );
        assert!(!as_black.is_trained_turn(0));
        assert!(as_black.is_trained_turn(1));
    }

    #[test]
    fn test_position_at_clamps_to_line() {
        let variation = Variation::from_movetext("1. e4 e5").unwrap();
        let end = variation.position_at(2).unwrap();
        let past = variation.position_at(7).unwrap();
        assert_eq!(board::to_fen(&end), board::to_fen(&past));
        assert_eq!(board::to_fen(&variation.position_at(0).unwrap()), board::STARTING_FEN);
    }

    #[test]
    fn test_repertoire_lookup_errors() {
        let empty = Repertoire::default();
        assert!(matches!(empty.get(0), Err(Error::NoVariations)));

        let repertoire = Repertoire::from_pgn("1. d4 d5 *").unwrap();
        assert_eq!(repertoire.len(), 1);
        assert!(repertoire.get(0).is_ok());
        assert!(matches!(repertoire.get(3), Err(Error::VariationIndex(3))));
    }
}
