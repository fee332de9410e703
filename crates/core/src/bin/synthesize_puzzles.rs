//! Builds puzzles from a JSON file of analyzed mistakes

use std::fs;

use line_trainer_core::{Mistake, PuzzleSynthesizer, StockfishEngine, TrainerConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: synthesize-puzzles <mistakes.json>");
        std::process::exit(1);
    });

    let config = TrainerConfig::from_env();

    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            std::process::exit(1);
        }
    };

    let mistakes: Vec<Mistake> = match serde_json::from_str(&raw) {
        Ok(mistakes) => mistakes,
        Err(e) => {
            eprintln!("Failed to parse mistakes: {}", e);
            std::process::exit(1);
        }
    };

    let engine = match StockfishEngine::new(&config.stockfish_path) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Failed to start engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(count = mistakes.len(), engine = %config.stockfish_path, "Synthesizing puzzles");

    let mut synthesizer = PuzzleSynthesizer::new(engine, config.synthesis);
    let puzzles = synthesizer.synthesize_batch(&mistakes);

    tracing::info!(built = puzzles.len(), dropped = mistakes.len() - puzzles.len(), "Done");

    match serde_json::to_string_pretty(&puzzles) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize puzzles: {}", e);
            std::process::exit(1);
        }
    }
}
