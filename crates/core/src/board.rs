//! Move, SAN and FEN helpers shared by the line trainer and the puzzle synthesizer.
//!
//! Legality, SAN encoding and FEN handling all come from `shakmaty`; this
//! module only adapts them to the string-based forms the trainer stores.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, File, Move, Position, Role, Square};
use thiserror::Error;

use crate::error::{Error, Result};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    #[error("Invalid SAN: {0}")]
    InvalidSan(String),

    #[error("Invalid UCI move: {0}")]
    InvalidUci(String),

    #[error("Illegal move in position: {0}")]
    Illegal(String),
}

/// A square-to-square move as entered on the board widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UiMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Role>,
}

impl UiMove {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn with_promotion(mut self, role: Role) -> Self {
        self.promotion = Some(role);
        self
    }

    /// Resolves the move against a position
    pub fn to_move(&self, position: &Chess) -> std::result::Result<Move, MoveError> {
        let uci = UciMove::Normal {
            from: self.from,
            to: self.to,
            promotion: self.promotion,
        };
        uci.to_move(position)
            .map_err(|_| MoveError::Illegal(self.to_string()))
    }
}

impl fmt::Display for UiMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(role) = self.promotion {
            write!(f, "{}", role.char())?;
        }
        Ok(())
    }
}

impl FromStr for UiMove {
    type Err = MoveError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(MoveError::InvalidUci(s.to_string()));
        }

        let from: Square = s[0..2]
            .parse()
            .map_err(|_| MoveError::InvalidUci(s.to_string()))?;
        let to: Square = s[2..4]
            .parse()
            .map_err(|_| MoveError::InvalidUci(s.to_string()))?;

        let promotion = match s[4..].chars().next() {
            Some(ch) => match Role::from_char(ch.to_ascii_lowercase()) {
                Some(role) if role != Role::Pawn && role != Role::King => Some(role),
                _ => return Err(MoveError::InvalidUci(s.to_string())),
            },
            None => None,
        };

        Ok(Self {
            from,
            to,
            promotion,
        })
    }
}

/// Parses a FEN string into a standard chess position
pub fn parse_fen(fen: &str) -> Result<Chess> {
    let parsed: Fen = fen
        .trim()
        .parse()
        .map_err(|e| Error::Fen(format!("{}: {}", fen, e)))?;
    parsed
        .into_position(CastlingMode::Standard)
        .map_err(|e| Error::Fen(format!("{}: {}", fen, e)))
}

pub fn color_name(color: Color) -> &'static str {
    if color == Color::White { "white" } else { "black" }
}

pub fn to_fen(position: &Chess) -> String {
    Fen::from_position(position, EnPassantMode::Legal).to_string()
}

/// Removes trailing check and mate markers
pub fn strip_annotations(san: &str) -> &str {
    san.trim().trim_end_matches(['+', '#'])
}

/// Compares two SAN strings ignoring `+`/`#` suffixes.
/// Disambiguation and promotion letter case are compared verbatim.
pub fn san_matches(a: &str, b: &str) -> bool {
    strip_annotations(a) == strip_annotations(b)
}

pub fn is_capture_or_forcing(san: &str) -> bool {
    san.contains(['x', '+', '#'])
}

/// Encodes a legal move as SAN including its check or mate suffix
pub fn san_plus(position: &Chess, mv: Move) -> String {
    let mut san = San::from_move(position, mv.clone()).to_string();
    if let Ok(after) = position.clone().play(mv) {
        if after.is_checkmate() {
            san.push('#');
        } else if after.is_check() {
            san.push('+');
        }
    }
    san
}

/// Resolves a SAN string (annotations allowed) to a legal move
pub fn parse_san(position: &Chess, san: &str) -> std::result::Result<Move, MoveError> {
    let parsed: SanPlus = san
        .trim()
        .parse()
        .map_err(|_| MoveError::InvalidSan(san.to_string()))?;
    parsed
        .san
        .to_move(position)
        .map_err(|_| MoveError::Illegal(san.to_string()))
}

/// Resolves a UCI string to a legal move
pub fn parse_uci(position: &Chess, uci: &str) -> std::result::Result<Move, MoveError> {
    let parsed: UciMove = uci
        .trim()
        .parse()
        .map_err(|_| MoveError::InvalidUci(uci.to_string()))?;
    parsed
        .to_move(position)
        .map_err(|_| MoveError::Illegal(uci.to_string()))
}

/// Plays a legal move, returning the new position and the move's SAN
pub fn apply_move(position: &Chess, mv: Move) -> std::result::Result<(Chess, String), MoveError> {
    let san = san_plus(position, mv.clone());
    let next = position
        .clone()
        .play(mv)
        .map_err(|_| MoveError::Illegal(san.clone()))?;
    Ok((next, san))
}

/// Replays SAN moves from a starting position
pub fn replay(start: &Chess, moves: &[String]) -> std::result::Result<Chess, MoveError> {
    let mut position = start.clone();
    for san in moves {
        let mv = parse_san(&position, san)?;
        position = apply_move(&position, mv)?.0;
    }
    Ok(position)
}

/// Square the king lands on when castling with the given rook
pub fn castle_landing(king: Square, rook: Square) -> Square {
    if rook.file() > king.file() {
        Square::from_coords(File::G, king.rank())
    } else {
        Square::from_coords(File::C, king.rank())
    }
}

/// Convert a shakmaty Move to a UCI string in standard castling form
pub fn move_to_uci(mv: &Move) -> String {
    match mv {
        Move::Normal {
            from,
            to,
            promotion,
            ..
        } => {
            let promo = promotion.map(|r| r.char().to_string()).unwrap_or_default();
            format!("{}{}{}", from, to, promo)
        }
        Move::EnPassant { from, to, .. } => format!("{}{}", from, to),
        Move::Castle { king, rook } => format!("{}{}", king, castle_landing(*king, *rook)),
        Move::Put { .. } => String::new(),
    }
}

/// Board square the UI should highlight as a move's destination
pub fn display_destination(mv: &Move) -> Square {
    match mv {
        Move::Castle { king, rook } => castle_landing(*king, *rook),
        other => other.to(),
    }
}

/// Legal destinations per origin square, castling listed as king to landing square
pub fn legal_move_map(position: &Chess) -> HashMap<Square, Vec<Square>> {
    let mut map: HashMap<Square, Vec<Square>> = HashMap::new();
    for mv in position.legal_moves() {
        let Some(from) = mv.from() else { continue };
        let to = display_destination(&mv);
        let targets = map.entry(from).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moves(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_annotation_insensitive_comparison() {
        assert!(san_matches("Nf3+", "Nf3"));
        assert!(san_matches("Qxd8#", "Qxd8"));
        assert!(!san_matches("Nbd2", "Nd2"));
        assert!(!san_matches("e8=Q", "e8=q"));
    }

    #[test]
    fn test_replay_is_deterministic() {
        let start = Chess::default();
        let line = moves(&["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);

        for k in 0..=line.len() {
            let first = replay(&start, &line[..k]).unwrap();
            let second = replay(&start, &line[..k]).unwrap();
            assert_eq!(to_fen(&first), to_fen(&second));
        }

        let end = replay(&start, &line).unwrap();
        assert_eq!(
            to_fen(&end),
            "r1bqkbnr/1ppp1ppp/p1n5/1B2p3/4P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 4"
        );
    }

    #[test]
    fn test_replay_rejects_illegal_move() {
        let start = Chess::default();
        let err = replay(&start, &moves(&["e4", "Ke3"])).unwrap_err();
        assert_eq!(err, MoveError::Illegal("Ke3".to_string()));
    }

    #[test]
    fn test_san_plus_suffixes() {
        let pos = replay(&Chess::default(), &moves(&["f3", "e5", "g4"])).unwrap();
        let mv = parse_san(&pos, "Qh4").unwrap();
        assert_eq!(san_plus(&pos, mv), "Qh4#");

        let pos = parse_fen("4k3/8/8/8/8/8/8/R3K3 w - - 0 1").unwrap();
        let mv = parse_san(&pos, "Ra8").unwrap();
        assert_eq!(san_plus(&pos, mv), "Ra8+");
    }

    #[test]
    fn test_ui_move_parsing() {
        let mv: UiMove = "e7e8q".parse().unwrap();
        assert_eq!(mv.from, Square::E7);
        assert_eq!(mv.to, Square::E8);
        assert_eq!(mv.promotion, Some(Role::Queen));
        assert_eq!(mv.to_string(), "e7e8q");

        assert!("e2".parse::<UiMove>().is_err());
        assert!("e7e8k".parse::<UiMove>().is_err());
        assert!("z9e4".parse::<UiMove>().is_err());
    }

    #[test]
    fn test_castling_uci_is_standard_form() {
        let pos = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let mv = parse_san(&pos, "O-O").unwrap();
        assert_eq!(move_to_uci(&mv), "e1g1");
        assert_eq!(display_destination(&mv), Square::G1);

        let mv = parse_san(&pos, "O-O-O").unwrap();
        assert_eq!(move_to_uci(&mv), "e1c1");
    }

    #[test]
    fn test_legal_move_map_lists_castling_landing_squares() {
        let pos = parse_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let map = legal_move_map(&pos);
        let king = &map[&Square::E1];
        assert!(king.contains(&Square::G1));
        assert!(king.contains(&Square::C1));
        assert!(!king.contains(&Square::H1));
        assert!(!king.contains(&Square::A1));

        let start = legal_move_map(&Chess::default());
        let total: usize = start.values().map(Vec::len).sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn test_parse_fen_errors() {
        assert!(parse_fen(STARTING_FEN).is_ok());
        assert!(matches!(parse_fen("not a fen"), Err(Error::Fen(_))));
    }
}
