//! Stockfish chess engine interface
//!
//! Spawns Stockfish as a subprocess and talks to it over UCI. One handle is
//! owned by one caller at a time; queries are strictly sequential.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use tracing::{debug, warn};

use super::analysis::{Evaluation, PositionAnalysis};

/// Error type for engine operations
#[derive(Debug)]
pub enum EngineError {
    /// Failed to start the engine process
    SpawnError(String),
    /// Failed to communicate with engine
    IoError(std::io::Error),
    /// Engine returned unexpected response
    ProtocolError(String),
    /// Engine not initialized
    NotInitialized,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::SpawnError(s) => write!(f, "Failed to start engine: {}", s),
            EngineError::IoError(e) => write!(f, "I/O error: {}", e),
            EngineError::ProtocolError(s) => write!(f, "Protocol error: {}", s),
            EngineError::NotInitialized => write!(f, "Engine not initialized"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::IoError(error)
    }
}

/// Wrapper around Stockfish chess engine
pub struct StockfishEngine {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    /// Whether UCI handshake completed
    initialized: bool,
}

impl StockfishEngine {
    /// Creates a new Stockfish engine instance
    ///
    /// # Arguments
    /// * `path` - Path to stockfish binary (or "stockfish" if in PATH)
    pub fn new(path: &str) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::SpawnError(format!("{}: {}", path, e)))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::SpawnError("Failed to open stdin".into()))?;

        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::SpawnError("Failed to open stdout".into()))?;

        let mut engine = StockfishEngine {
            process,
            stdin,
            stdout: BufReader::new(stdout),
            initialized: false,
        };

        engine.init_uci()?;

        Ok(engine)
    }

    fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "SF <");
        writeln!(self.stdin, "{}", cmd)?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        let read = self.stdout.read_line(&mut line)?;
        if read == 0 {
            return Err(EngineError::ProtocolError("engine closed its output".into()));
        }
        Ok(line.trim().to_string())
    }

    fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        loop {
            let line = self.read_line()?;
            if line.starts_with(expected) {
                return Ok(());
            }
        }
    }

    fn init_uci(&mut self) -> Result<(), EngineError> {
        self.send("uci")?;
        self.wait_for("uciok")?;

        self.send("isready")?;
        self.wait_for("readyok")?;

        self.initialized = true;
        Ok(())
    }

    /// Sets a position from a FEN string
    ///
    /// # Arguments
    /// * `fen` - FEN string, or None for starting position
    /// * `moves` - Optional list of UCI moves to play from the position
    pub fn set_position(&mut self, fen: Option<&str>, moves: Option<&[String]>) -> Result<(), EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }

        let pos_str = match fen {
            Some(f) => format!("position fen {}", f),
            None => "position startpos".to_string(),
        };

        let cmd = match moves {
            Some(m) if !m.is_empty() => format!("{} moves {}", pos_str, m.join(" ")),
            _ => pos_str,
        };

        self.send(&cmd)
    }

    /// Searches the current position to a fixed depth
    pub fn analyze(&mut self, depth: u8) -> Result<PositionAnalysis, EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }

        self.send(&format!("go depth {}", depth))?;

        let mut analysis = PositionAnalysis {
            best_move: String::new(),
            evaluation: Evaluation::Centipawns(0),
            depth: 0,
            pv: Vec::new(),
        };

        loop {
            let line = self.read_line()?;

            if line.starts_with("bestmove") {
                analysis.best_move = parse_bestmove(&line).ok_or_else(|| {
                    EngineError::ProtocolError(format!("malformed bestmove line: {}", line))
                })?;
                break;
            } else if line.starts_with("info") {
                apply_info_line(&line, &mut analysis);
            }
        }

        debug!(summary = %analysis.summary(), "SF >");
        Ok(analysis)
    }

    /// Quit the engine cleanly
    pub fn quit(&mut self) -> Result<(), EngineError> {
        self.send("quit")?;
        std::thread::sleep(Duration::from_millis(100));
        let _ = self.process.kill();
        Ok(())
    }
}

impl Drop for StockfishEngine {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            warn!(error = %e, "Stockfish did not quit cleanly");
        }
    }
}

/// Parses "bestmove e2e4 ponder e7e5"
fn parse_bestmove(line: &str) -> Option<String> {
    line.split_whitespace().nth(1).map(str::to_string)
}

/// Folds one "info ..." line into the running analysis
fn apply_info_line(line: &str, analysis: &mut PositionAnalysis) {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let mut i = 0;

    while i < parts.len() {
        match parts[i] {
            "depth" => {
                if let Some(d) = parts.get(i + 1).and_then(|v| v.parse().ok()) {
                    analysis.depth = d;
                }
                i += 2;
            }
            "score" => {
                let value = parts.get(i + 2).and_then(|v| v.parse::<i32>().ok());
                match (parts.get(i + 1), value) {
                    (Some(&"cp"), Some(cp)) => analysis.evaluation = Evaluation::Centipawns(cp),
                    (Some(&"mate"), Some(m)) => analysis.evaluation = Evaluation::Mate(m),
                    _ => {}
                }
                i += 3;
            }
            "pv" => {
                // Everything after "pv" is the principal variation
                analysis.pv = parts[i + 1..].iter().map(|s| s.to_string()).collect();
                break;
            }
            _ => {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_analysis() -> PositionAnalysis {
        PositionAnalysis {
            best_move: String::new(),
            evaluation: Evaluation::Centipawns(0),
            depth: 0,
            pv: Vec::new(),
        }
    }

    #[test]
    fn test_info_line_parsing() {
        let mut analysis = empty_analysis();
        apply_info_line(
            "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4 e7e5 g1f3",
            &mut analysis,
        );
        assert_eq!(analysis.depth, 20);
        assert_eq!(analysis.evaluation, Evaluation::Centipawns(35));
        assert_eq!(analysis.pv, vec!["e2e4", "e7e5", "g1f3"]);

        apply_info_line("info depth 21 score mate 3 pv d1d8", &mut analysis);
        assert_eq!(analysis.evaluation, Evaluation::Mate(3));
    }

    #[test]
    fn test_bestmove_parsing() {
        assert_eq!(parse_bestmove("bestmove e2e4 ponder e7e5").as_deref(), Some("e2e4"));
        assert_eq!(parse_bestmove("bestmove (none)").as_deref(), Some("(none)"));
        assert_eq!(parse_bestmove("bestmove"), None);
    }

    #[test]
    #[ignore] // Ignore by default - requires stockfish installed
    fn test_stockfish_init() {
        let engine = StockfishEngine::new("stockfish");
        assert!(engine.is_ok());
    }

    #[test]
    #[ignore]
    fn test_analyze_starting_position() {
        let mut engine = StockfishEngine::new("stockfish").unwrap();
        engine.set_position(None, None).unwrap();
        let analysis = engine.analyze(10).unwrap();

        assert!(!analysis.best_move.is_empty());
        println!("{}", analysis.summary());
    }
}
