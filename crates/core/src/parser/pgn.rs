//! PGN movetext parsing into variations
//!
//! Comments, nested variations, NAGs, move numbers and result tokens are all
//! dropped. SAN tokens that do not resolve against the replay position are
//! skipped, so a variation may come out shorter than its source text.

use pgn_reader::{RawTag, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Color, Position};
use std::io::Cursor;
use std::ops::ControlFlow;
use tracing::{debug, warn};

use crate::board;
use crate::error::{Error, Result};
use crate::training::Variation;

#[derive(Default)]
struct VariationTags {
    event: Option<String>,
    chapter: Option<String>,
    fen: Option<String>,
    orientation: Option<Color>,
}

struct VariationMoves {
    name: Option<String>,
    trained_side: Option<Color>,
    start: Chess,
    current: Chess,
    moves: Vec<String>,
    skipped: usize,
}

/// Explicit settings that win over the PGN headers
#[derive(Default)]
struct Overrides {
    start_fen: Option<String>,
    trained_side: Option<Color>,
}

struct VariationParser {
    overrides: Overrides,
    games_seen: usize,
}

impl VariationParser {
    fn new(overrides: Overrides) -> Self {
        Self {
            overrides,
            games_seen: 0,
        }
    }
}

fn meaningful(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "?" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_orientation(value: &str) -> Option<Color> {
    match value.trim().to_ascii_lowercase().as_str() {
        "white" | "w" => Some(Color::White),
        "black" | "b" => Some(Color::Black),
        _ => None,
    }
}

impl Visitor for VariationParser {
    type Tags = VariationTags;
    type Movetext = VariationMoves;
    type Output = Result<Variation>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.games_seen += 1;
        ControlFlow::Continue(VariationTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let name_str = String::from_utf8_lossy(name);
        let value_str = value.decode_utf8_lossy().to_string();

        match name_str.as_ref() {
            "Event" => tags.event = meaningful(value_str),
            "ChapterName" => tags.chapter = meaningful(value_str),
            "FEN" => tags.fen = meaningful(value_str),
            "Orientation" => tags.orientation = parse_orientation(&value_str),
            _ => {}
        }

        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let fen = self.overrides.start_fen.clone().or(tags.fen);

        let start = match fen {
            Some(fen) => match board::parse_fen(&fen) {
                Ok(position) => position,
                Err(e) => return ControlFlow::Break(Err(e)),
            },
            None => Chess::default(),
        };

        ControlFlow::Continue(VariationMoves {
            name: tags.chapter.or(tags.event),
            trained_side: self.overrides.trained_side.or(tags.orientation),
            current: start.clone(),
            start,
            moves: Vec::new(),
            skipped: 0,
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        let token = san.to_string();

        match san.san.to_move(&movetext.current) {
            Ok(mv) => match movetext.current.clone().play(mv) {
                Ok(next) => {
                    movetext.current = next;
                    movetext.moves.push(token);
                }
                Err(_) => movetext.skipped += 1,
            },
            Err(_) => {
                debug!(token = %token, ply = movetext.moves.len(), "Skipping unresolvable SAN");
                movetext.skipped += 1;
            }
        }

        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        _movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        if movetext.skipped > 0 {
            debug!(
                skipped = movetext.skipped,
                kept = movetext.moves.len(),
                "Variation parsed with skipped tokens"
            );
        }

        let name = movetext
            .name
            .unwrap_or_else(|| format!("Variation {}", self.games_seen));

        Ok(Variation::new(
            name,
            movetext.start,
            movetext.moves,
            movetext.trained_side,
        ))
    }
}

fn read_all(pgn: &str, parser: &mut VariationParser) -> Result<Vec<Result<Variation>>> {
    let cursor = Cursor::new(pgn.as_bytes());
    let mut reader = pgn_reader::Reader::new(cursor);
    let mut results = Vec::new();

    loop {
        match reader.read_game(parser) {
            Ok(Some(result)) => results.push(result),
            Ok(None) => break,
            Err(e) => return Err(Error::Pgn(e.to_string())),
        }
    }

    Ok(results)
}

/// Parses every game in a PGN blob as one variation.
///
/// Games whose headers are unusable (bad FEN) are logged and left out.
pub fn parse_variations(pgn: &str) -> Result<Vec<Variation>> {
    let mut parser = VariationParser::new(Overrides::default());
    let results = read_all(pgn, &mut parser)?;

    let mut variations = Vec::with_capacity(results.len());
    for (idx, result) in results.into_iter().enumerate() {
        match result {
            Ok(variation) => variations.push(variation),
            Err(e) => warn!(game = idx + 1, error = %e, "Dropping unparseable variation"),
        }
    }

    Ok(variations)
}

/// Parses a single movetext blob from an explicit start position.
///
/// `start_fen` and `trained_side` take priority over any headers in the text.
/// Empty movetext yields a variation with no moves.
pub fn parse_movetext(
    movetext: &str,
    start_fen: Option<&str>,
    trained_side: Option<Color>,
) -> Result<Variation> {
    let mut parser = VariationParser::new(Overrides {
        start_fen: start_fen.map(str::to_string),
        trained_side,
    });

    match read_all(movetext, &mut parser)?.into_iter().next() {
        Some(result) => result,
        None => {
            let start = match start_fen {
                Some(fen) => board::parse_fen(fen)?,
                None => Chess::default(),
            };
            Ok(Variation::new(
                "Variation 1".to_string(),
                start,
                Vec::new(),
                trained_side,
            ))
        }
    }
}
