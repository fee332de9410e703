//! Line training: variations, the verification state machine and its timer driver

pub mod driver;
pub mod session;
pub mod variation;

pub use driver::LineDriver;
pub use session::{
    AttemptOutcome, AttemptResult, DelayedAction, LineSession, Marker, MarkerKind, Phase,
    Scheduled, SessionSnapshot,
};
pub use variation::{Repertoire, Variation};
