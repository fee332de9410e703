//! Castling square canonicalization
//!
//! The board widget moves the king two squares (e1g1), while shakmaty's
//! standard-castling resolution is fed the king-takes-own-rook form (e1h1).
//! The landing square is kept separately so markers never show the rook square.

use shakmaty::Square;

use crate::board::UiMove;

/// Result of mapping a UI castling move onto the internal form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CastlingMapping {
    /// King-to-rook move handed to the rules engine
    pub internal_move: UiMove,
    /// Square the king actually lands on
    pub display_square: Square,
}

/// Maps a king move onto its castling form.
///
/// Fires only when the move starts on `king_square`, the king stands on its
/// home square (e1/e8) and the target is one of g1, c1, g8, c8 on the same rank.
pub fn canonicalize(mv: UiMove, king_square: Square) -> Option<CastlingMapping> {
    if mv.from != king_square {
        return None;
    }

    let rook_home = match (mv.from, mv.to) {
        (Square::E1, Square::G1) => Square::H1,
        (Square::E1, Square::C1) => Square::A1,
        (Square::E8, Square::G8) => Square::H8,
        (Square::E8, Square::C8) => Square::A8,
        _ => return None,
    };

    Some(CastlingMapping {
        internal_move: UiMove {
            from: mv.from,
            to: rook_home,
            promotion: None,
        },
        display_square: mv.to,
    })
}
