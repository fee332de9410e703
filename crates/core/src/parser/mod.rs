//! Movetext parsing
//!
//! Turns annotated PGN movetext into trainable variations.

pub mod pgn;

pub use pgn::{parse_movetext, parse_variations};
