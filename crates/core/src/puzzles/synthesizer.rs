//! Puzzle synthesis engine
//!
//! Grows a short forced line from a mistake position by asking the engine
//! for the best move one ply at a time. Each query depends on the position
//! produced by the previous one, so a single synthesis is strictly sequential.

use shakmaty::{Chess, Move, Position};
use tracing::{debug, warn};

use super::types::*;
use crate::board;
use crate::config::SynthesisConfig;
use crate::engine::{EngineError, EngineOracle};
use crate::error::Result;

/// Upper bound on a synthesized solution
pub const MAX_SOLUTION_PLIES: usize = 4;

/// Plies recorded before the capture extension is considered
const CORE_PLIES: usize = 3;

pub struct PuzzleSynthesizer<E: EngineOracle> {
    engine: E,
    config: SynthesisConfig,
}

impl<E: EngineOracle> PuzzleSynthesizer<E> {
    pub fn new(engine: E, config: SynthesisConfig) -> Self {
        Self { engine, config }
    }

    /// Hands the engine back to the caller
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Builds a puzzle from one mistake.
    ///
    /// `Ok(None)` means nothing usable could be built; errors (bad FEN, engine
    /// failure) only concern this mistake.
    pub fn synthesize<'m>(&mut self, mistake: &'m Mistake) -> Result<Option<Puzzle<'m>>> {
        let origin = board::parse_fen(&mistake.fen)?;

        let (mut solution_uci, mut solution_san) = self.grow_line(&origin)?;

        if solution_uci.len() < CORE_PLIES {
            debug!(
                fen = %mistake.fen,
                plies = solution_uci.len(),
                "Line too short, falling back to single move"
            );
            match single_move_fallback(&origin, mistake) {
                Some((uci, san)) => {
                    solution_uci = vec![uci];
                    solution_san = san.into_iter().collect();
                }
                None => return Ok(None),
            }
        }

        let theme = PuzzleTheme::from_last_san(solution_san.last().map(String::as_str));

        Ok(Some(Puzzle {
            origin_fen: mistake.fen.clone(),
            solving_side: origin.turn(),
            solution_uci,
            solution_san,
            theme,
            source_mistake: mistake,
        }))
    }

    /// Synthesizes each mistake in turn; failures are logged and left out
    pub fn synthesize_batch<'m>(&mut self, mistakes: &'m [Mistake]) -> Vec<Puzzle<'m>> {
        let mut puzzles = Vec::with_capacity(mistakes.len());

        for (idx, mistake) in mistakes.iter().enumerate() {
            match self.synthesize(mistake) {
                Ok(Some(puzzle)) => puzzles.push(puzzle),
                Ok(None) => debug!(idx, fen = %mistake.fen, "No puzzle for mistake"),
                Err(e) => warn!(idx, fen = %mistake.fen, error = %e, "Puzzle synthesis failed"),
            }
        }

        puzzles
    }

    fn grow_line(&mut self, origin: &Chess) -> Result<(Vec<String>, Vec<String>)> {
        let mut position = origin.clone();
        let mut uci_line = Vec::with_capacity(MAX_SOLUTION_PLIES);
        let mut san_line = Vec::with_capacity(MAX_SOLUTION_PLIES);

        while uci_line.len() < MAX_SOLUTION_PLIES {
            let Some(mv) = self.query(&position, self.config.search_depth)? else {
                break;
            };

            uci_line.push(board::move_to_uci(&mv));
            let (next, san) = board::apply_move(&position, mv)?;
            san_line.push(san);
            position = next;

            if uci_line.len() == CORE_PLIES {
                if !position.is_game_over() {
                    if let Some(extension) = self.query(&position, self.config.extension_depth)? {
                        let san = board::san_plus(&position, extension.clone());
                        if board::is_capture_or_forcing(&san) {
                            uci_line.push(board::move_to_uci(&extension));
                            san_line.push(san);
                        }
                    }
                }
                break;
            }

            if position.is_game_over() {
                break;
            }
        }

        Ok((uci_line, san_line))
    }

    /// Asks the engine for its move; `None` if it has none or suggests an illegal one
    fn query(&mut self, position: &Chess, depth: u8) -> std::result::Result<Option<Move>, EngineError> {
        let fen = board::to_fen(position);
        let Some(answer) = self.engine.best_move(&fen, depth)? else {
            return Ok(None);
        };

        match board::parse_uci(position, &answer.uci) {
            Ok(mv) => {
                debug!(fen = %fen, best = %answer.uci, eval = %answer.evaluation, depth, "Engine move");
                Ok(Some(mv))
            }
            Err(e) => {
                debug!(fen = %fen, error = %e, "Engine suggested an unusable move");
                Ok(None)
            }
        }
    }
}

/// The analysis pipeline's own best move, SAN only if it resolves
fn single_move_fallback(origin: &Chess, mistake: &Mistake) -> Option<(String, Option<String>)> {
    let best = mistake
        .engine_best_move_uci
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())?;

    if best.parse::<board::UiMove>().is_err() {
        return None;
    }

    match board::parse_uci(origin, best) {
        Ok(mv) => {
            let uci = board::move_to_uci(&mv);
            Some((uci, Some(board::san_plus(origin, mv))))
        }
        Err(_) => Some((best.to_string(), None)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineMove, Evaluation};
    use crate::error::Error;
    use shakmaty::Color;
    use std::collections::VecDeque;

    /// Plays back canned answers in order, recording each query
    struct ScriptedEngine {
        answers: VecDeque<std::result::Result<Option<&'static str>, ()>>,
        queries: Vec<(String, u8)>,
    }

    impl ScriptedEngine {
        fn new(answers: &[Option<&'static str>]) -> Self {
            Self {
                answers: answers.iter().copied().map(Ok).collect(),
                queries: Vec::new(),
            }
        }

        fn failing_after(answers: &[Option<&'static str>]) -> Self {
            let mut engine = Self::new(answers);
            engine.answers.push_back(Err(()));
            engine
        }
    }

    impl EngineOracle for ScriptedEngine {
        fn best_move(&mut self, fen: &str, depth: u8) -> std::result::Result<Option<EngineMove>, EngineError> {
            self.queries.push((fen.to_string(), depth));
            match self.answers.pop_front() {
                Some(Ok(answer)) => Ok(answer.map(|uci| EngineMove {
                    uci: uci.to_string(),
                    evaluation: Evaluation::Centipawns(0),
                })),
                Some(Err(())) => Err(EngineError::ProtocolError("engine went away".into())),
                None => Ok(None),
            }
        }
    }

    fn mistake(fen: &str, best: Option<&str>) -> Mistake {
        Mistake {
            fen: fen.to_string(),
            played_move_uci: "a2a3".to_string(),
            engine_best_move_uci: best.map(str::to_string),
            classification: MistakeClassification::Blunder,
            move_number: 20,
        }
    }

    fn synthesizer(engine: ScriptedEngine) -> PuzzleSynthesizer<ScriptedEngine> {
        PuzzleSynthesizer::new(engine, SynthesisConfig::default())
    }

    #[test]
    fn test_blunder_with_immediate_mate() {
        let fen = "6k1/5ppp/8/8/8/8/5PPP/3Q2K1 w - - 0 1";
        let m = mistake(fen, Some("d1d8"));
        let mut synth = synthesizer(ScriptedEngine::new(&[Some("d1d8")]));

        let puzzle = synth.synthesize(&m).unwrap().unwrap();
        assert_eq!(puzzle.solution_uci, vec!["d1d8"]);
        assert_eq!(puzzle.solution_san, vec!["Qd8#"]);
        assert_eq!(puzzle.theme, PuzzleTheme::Checkmate);
        assert_eq!(puzzle.solving_side, Color::White);
        assert_eq!(synth.into_engine().queries.len(), 1, "mate ends the line");
    }

    #[test]
    fn test_three_ply_line_without_extension() {
        let m = mistake(board::STARTING_FEN, None);
        let mut synth = synthesizer(ScriptedEngine::new(&[
            Some("e2e4"),
            Some("e7e5"),
            Some("g1f3"),
            Some("b8c6"),
        ]));

        let puzzle = synth.synthesize(&m).unwrap().unwrap();
        assert_eq!(puzzle.solution_uci, vec!["e2e4", "e7e5", "g1f3"]);
        assert_eq!(puzzle.solution_san, vec!["e4", "e5", "Nf3"]);
        assert_eq!(puzzle.theme, PuzzleTheme::Tactics);

        let depths: Vec<u8> = synth.into_engine().queries.iter().map(|(_, d)| *d).collect();
        assert_eq!(depths, vec![12, 12, 12, 8]);
    }

    #[test]
    fn test_capture_extends_to_four_plies() {
        let m = mistake(board::STARTING_FEN, None);
        let mut synth = synthesizer(ScriptedEngine::new(&[
            Some("e2e4"),
            Some("d7d5"),
            Some("b1c3"),
            Some("d5e4"),
            Some("c3e4"),
        ]));

        let puzzle = synth.synthesize(&m).unwrap().unwrap();
        assert_eq!(puzzle.solution_uci, vec!["e2e4", "d7d5", "b1c3", "d5e4"]);
        assert_eq!(puzzle.solution_san.last().map(String::as_str), Some("dxe4"));
        assert_eq!(puzzle.theme, PuzzleTheme::Capture);
        assert_eq!(synth.into_engine().queries.len(), 4, "never more than four plies");
    }

    #[test]
    fn test_castling_reply_is_recorded_in_standard_form() {
        let fen = "r3k2r/pppq1ppp/2npbn2/2b1p3/2B1P3/2NPBN2/PPPQ1PPP/R3K2R w KQkq - 0 1";
        let m = mistake(fen, None);
        let mut synth = synthesizer(ScriptedEngine::new(&[
            Some("e1h1"),
            Some("e8c8"),
            Some("a1d1"),
            None,
        ]));

        let puzzle = synth.synthesize(&m).unwrap().unwrap();
        assert_eq!(puzzle.solution_uci, vec!["e1g1", "e8c8", "a1d1"]);
        assert_eq!(puzzle.solution_san, vec!["O-O", "O-O-O", "Rad1"]);
    }

    #[test]
    fn test_short_line_falls_back_to_single_move() {
        let m = mistake(board::STARTING_FEN, Some("d2d4"));
        // second answer is illegal for black, so only one ply is recorded
        let mut synth = synthesizer(ScriptedEngine::new(&[Some("e2e4"), Some("e2e4")]));

        let puzzle = synth.synthesize(&m).unwrap().unwrap();
        assert_eq!(puzzle.solution_uci, vec!["d2d4"]);
        assert_eq!(puzzle.solution_san, vec!["d4"]);
        assert!(puzzle.is_single_move());
    }

    #[test]
    fn test_fallback_san_is_best_effort() {
        let m = mistake(board::STARTING_FEN, Some("e2e5"));
        let mut synth = synthesizer(ScriptedEngine::new(&[None]));

        let puzzle = synth.synthesize(&m).unwrap().unwrap();
        assert_eq!(puzzle.solution_uci, vec!["e2e5"]);
        assert!(puzzle.solution_san.is_empty());
        assert_eq!(puzzle.theme, PuzzleTheme::Tactics);
    }

    #[test]
    fn test_nothing_to_synthesize() {
        // black is already mated
        let fen = "3Q2k1/5ppp/8/8/8/8/5PPP/6K1 b - - 1 1";
        let m = mistake(fen, None);
        let mut synth = synthesizer(ScriptedEngine::new(&[None]));
        assert!(synth.synthesize(&m).unwrap().is_none());

        let m = mistake(board::STARTING_FEN, Some("garbage"));
        let mut synth = synthesizer(ScriptedEngine::new(&[Some("e2e4")]));
        assert!(synth.synthesize(&m).unwrap().is_none());
    }

    #[test]
    fn test_solving_side_is_side_to_move() {
        let fen = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
        let m = mistake(fen, Some("e7e5"));
        let mut synth = synthesizer(ScriptedEngine::new(&[Some("e7e5"), Some("g1f3"), Some("b8c6")]));

        let puzzle = synth.synthesize(&m).unwrap().unwrap();
        assert_eq!(puzzle.solving_side, Color::Black);
        assert_eq!(puzzle.solution_uci.len(), 3);
    }

    #[test]
    fn test_batch_drops_failures_only() {
        let mistakes = vec![
            mistake("not a fen", Some("e2e4")),
            mistake(board::STARTING_FEN, Some("e2e4")),
            mistake(board::STARTING_FEN, Some("d2d4")),
        ];
        // first valid mistake hits an engine error, second gets an empty answer
        let engine = ScriptedEngine::failing_after(&[]);
        let mut synth = synthesizer(engine);

        let puzzles = synth.synthesize_batch(&mistakes);
        assert_eq!(puzzles.len(), 1);
        assert_eq!(puzzles[0].solution_uci, vec!["d2d4"]);
        assert!(std::ptr::eq(puzzles[0].source_mistake, &mistakes[2]));

        let mut synth = synthesizer(ScriptedEngine::new(&[]));
        assert!(matches!(synth.synthesize(&mistakes[0]), Err(Error::Fen(_))));
    }

    #[test]
    fn test_solution_length_invariant() {
        let scripts: Vec<Vec<Option<&'static str>>> = vec![
            vec![],
            vec![Some("e2e4")],
            vec![Some("e2e4"), Some("e7e5")],
            vec![Some("e2e4"), Some("e7e5"), Some("g1f3")],
            vec![Some("e2e4"), Some("d7d5"), Some("e4d5"), Some("d8d5")],
            vec![Some("e2e4"), Some("d7d5"), Some("b1c3"), Some("g8f6")],
            vec![Some("f2f3"), Some("e7e5"), Some("g2g4"), Some("d8h4")],
        ];

        for script in scripts {
            let m = mistake(board::STARTING_FEN, Some("g1f3"));
            let mut synth = synthesizer(ScriptedEngine::new(&script));
            let puzzle = synth.synthesize(&m).unwrap().unwrap();

            assert!(matches!(puzzle.len(), 1 | 3 | 4), "{:?}", puzzle.solution_uci);
            if puzzle.len() == 4 {
                assert!(board::is_capture_or_forcing(&puzzle.solution_san[3]));
            }
        }
    }

    #[test]
    fn test_puzzle_serializes() {
        let fen = "6k1/5ppp/8/8/8/8/5PPP/3Q2K1 w - - 0 1";
        let m = mistake(fen, Some("d1d8"));
        let mut synth = synthesizer(ScriptedEngine::new(&[Some("d1d8")]));
        let puzzle = synth.synthesize(&m).unwrap().unwrap();

        let json = serde_json::to_value(&puzzle).unwrap();
        assert_eq!(json["solving_side"], "white");
        assert_eq!(json["theme"], "checkmate");
        assert_eq!(json["source_mistake"]["classification"], "blunder");
    }
}
