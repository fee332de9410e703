//! Trainer configuration from environment variables

use std::env;
use std::time::Duration;

use tracing::debug;

/// Delays for the line session's timed transitions
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimingConfig {
    /// Pause before the scripted opponent reply is played
    pub opponent_reply_delay: Duration,
    /// How long a rejected move stays on the board before the revert
    pub mistake_revert_delay: Duration,
    /// Lifetime of a Valid marker
    pub marker_clear_delay: Duration,
    /// Lifetime of a Hint marker
    pub hint_clear_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            opponent_reply_delay: Duration::from_millis(500),
            mistake_revert_delay: Duration::from_millis(1000),
            marker_clear_delay: Duration::from_millis(800),
            hint_clear_delay: Duration::from_millis(1500),
        }
    }
}

/// Search depths used while growing a puzzle line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthesisConfig {
    /// Depth for the main best-move queries
    pub search_depth: u8,
    /// Shallower depth for the optional capture extension
    pub extension_depth: u8,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            search_depth: 12,
            extension_depth: 8,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TrainerConfig {
    /// Path to Stockfish binary
    pub stockfish_path: String,

    pub synthesis: SynthesisConfig,

    pub timing: TimingConfig,

    /// Listen address for the web surface
    pub bind_addr: String,

    /// Web sessions untouched for this long are disposed
    pub session_idle_timeout: Duration,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            stockfish_path: "stockfish".to_string(),
            synthesis: SynthesisConfig::default(),
            timing: TimingConfig::default(),
            bind_addr: "127.0.0.1:3000".to_string(),
            session_idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl TrainerConfig {
    /// Load configuration from environment variables.
    /// Missing or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        let depth = |key: &str, default: u8| {
            lookup(key)
                .and_then(|v| v.parse::<u8>().ok())
                .filter(|d| *d > 0)
                .unwrap_or(default)
        };

        let config = Self {
            stockfish_path: lookup("STOCKFISH_PATH").unwrap_or(defaults.stockfish_path),
            synthesis: SynthesisConfig {
                search_depth: depth("PUZZLE_SEARCH_DEPTH", defaults.synthesis.search_depth),
                extension_depth: depth(
                    "PUZZLE_EXTENSION_DEPTH",
                    defaults.synthesis.extension_depth,
                ),
            },
            timing: TimingConfig {
                opponent_reply_delay: millis(
                    "OPPONENT_REPLY_DELAY_MS",
                    defaults.timing.opponent_reply_delay,
                ),
                mistake_revert_delay: millis(
                    "MISTAKE_REVERT_DELAY_MS",
                    defaults.timing.mistake_revert_delay,
                ),
                marker_clear_delay: millis(
                    "MARKER_CLEAR_DELAY_MS",
                    defaults.timing.marker_clear_delay,
                ),
                hint_clear_delay: millis("HINT_CLEAR_DELAY_MS", defaults.timing.hint_clear_delay),
            },
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_idle_timeout: lookup("SESSION_IDLE_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_idle_timeout),
        };

        debug!(?config, "Loaded trainer configuration");
        config
    }
}
