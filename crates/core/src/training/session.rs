//! Line verification state machine
//!
//! A `LineSession` walks a learner through one `Variation`. It never sleeps or
//! spawns: every delayed transition (opponent reply, mistake revert, marker
//! expiry) is handed back as a [`Scheduled`] value for the caller to run later
//! through [`LineSession::fire`]. Each one carries the session generation it
//! was created under and is ignored once that generation has moved on.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use shakmaty::{Chess, Color, Position, Square};
use tracing::{debug, info, warn};

use super::variation::{Repertoire, Variation};
use crate::board::{self, UiMove};
use crate::castling;
use crate::config::TimingConfig;
use crate::error::Result;

pub const EMPTY_VARIATION_MESSAGE: &str = "No moves in this variation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Loading,
    Ready,
    AwaitingMove,
    MoveAccepted,
    MoveRejected,
    LineComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    Valid,
    Invalid,
    Hint,
}

/// Transient board overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub square: Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayedAction {
    /// Play the scripted opponent move expected at `cursor`
    OpponentReply { cursor: usize },
    /// Rebuild the position after a rejected move made at `cursor`
    RevertMistake { cursor: usize },
    /// Drop the marker with this id if it is still showing
    ClearMarker { marker_id: u64 },
}

/// A transition the caller must fire after `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub generation: u64,
    pub delay: Duration,
    pub action: DelayedAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AttemptOutcome {
    /// Not the learner's turn, or the session is not accepting moves
    Ignored,
    /// Not a legal move in the current position
    Illegal,
    Accepted { san: String, complete: bool },
    Rejected { played: String, expected: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptResult {
    pub outcome: AttemptOutcome,
    pub scheduled: Vec<Scheduled>,
}

impl AttemptResult {
    fn unscheduled(outcome: AttemptOutcome) -> Self {
        Self {
            outcome,
            scheduled: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkerView {
    pub kind: MarkerKind,
    pub square: String,
}

/// Read-only view of a session, safe to persist or render
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub variation_index: usize,
    pub variation_name: Option<String>,
    pub cursor: usize,
    pub total_moves: usize,
    pub fen: String,
    pub side_to_move: &'static str,
    pub trained_side: &'static str,
    pub orientation: &'static str,
    pub learner_to_move: bool,
    pub is_check: bool,
    pub is_checkmate: bool,
    pub marker: Option<MarkerView>,
    pub hints_used: u32,
    pub mistakes_made: u32,
    pub moves_completed: u32,
    pub legal_moves: BTreeMap<String, Vec<String>>,
    pub message: Option<String>,
}

pub struct LineSession {
    timing: TimingConfig,
    variation: Option<Variation>,
    variation_index: usize,
    position: Chess,
    cursor: usize,
    /// Furthest cursor reached; bounds forward review
    furthest: usize,
    phase: Phase,
    marker: Option<Marker>,
    marker_id: u64,
    hints_used: u32,
    mistakes_made: u32,
    moves_completed: u32,
    orientation: Color,
    message: Option<String>,
    generation: u64,
}

impl LineSession {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            variation: None,
            variation_index: 0,
            position: Chess::default(),
            cursor: 0,
            furthest: 0,
            phase: Phase::Loading,
            marker: None,
            marker_id: 0,
            hints_used: 0,
            mistakes_made: 0,
            moves_completed: 0,
            orientation: Color::White,
            message: None,
            generation: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn marker(&self) -> Option<Marker> {
        self.marker
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    pub fn mistakes_made(&self) -> u32 {
        self.mistakes_made
    }

    pub fn moves_completed(&self) -> u32 {
        self.moves_completed
    }

    pub fn orientation(&self) -> Color {
        self.orientation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn variation(&self) -> Option<&Variation> {
        self.variation.as_ref()
    }

    /// Current position as FEN
    pub fn fen(&self) -> String {
        board::to_fen(&self.position)
    }

    pub fn is_learner_turn(&self) -> bool {
        self.variation
            .as_ref()
            .is_some_and(|v| v.is_trained_turn(self.cursor))
    }

    /// Starts a fresh session on `variation`, invalidating anything still scheduled
    pub fn load_variation(&mut self, variation: Variation, index: usize) -> Vec<Scheduled> {
        self.generation += 1;
        self.position = variation.starting_position().clone();
        self.cursor = 0;
        self.furthest = 0;
        self.marker = None;
        self.hints_used = 0;
        self.mistakes_made = 0;
        self.moves_completed = 0;
        self.orientation = variation.trained_side();
        self.variation_index = index;
        self.message = None;

        info!(
            index,
            name = variation.name(),
            moves = variation.len(),
            generation = self.generation,
            "Loaded variation"
        );

        let mut scheduled = Vec::new();
        if variation.is_empty() {
            self.phase = Phase::Ready;
            self.message = Some(EMPTY_VARIATION_MESSAGE.to_string());
        } else if variation.is_trained_turn(0) {
            self.phase = Phase::AwaitingMove;
        } else {
            self.phase = Phase::Ready;
            scheduled.push(self.schedule(
                self.timing.opponent_reply_delay,
                DelayedAction::OpponentReply { cursor: 0 },
            ));
        }

        self.variation = Some(variation);
        scheduled
    }

    /// Loads a variation out of a repertoire; on error the session is untouched
    pub fn load_from(&mut self, repertoire: &Repertoire, index: usize) -> Result<Vec<Scheduled>> {
        let variation = repertoire.get(index)?.clone();
        Ok(self.load_variation(variation, index))
    }

    /// Restarts the current variation from its first move
    pub fn reset(&mut self) -> Vec<Scheduled> {
        match self.variation.clone() {
            Some(variation) => self.load_variation(variation, self.variation_index),
            None => Vec::new(),
        }
    }

    /// Tears the session down; pending transitions become no-ops
    pub fn dispose(&mut self) {
        self.generation += 1;
        self.variation = None;
        self.marker = None;
        self.phase = Phase::Loading;
        self.message = None;
    }

    pub fn attempt_move(&mut self, mv: UiMove) -> AttemptResult {
        if !matches!(self.phase, Phase::AwaitingMove | Phase::MoveAccepted) {
            return AttemptResult::unscheduled(AttemptOutcome::Ignored);
        }
        if !self.is_learner_turn() {
            return AttemptResult::unscheduled(AttemptOutcome::Ignored);
        }
        let Some(expected) = self
            .variation
            .as_ref()
            .and_then(|v| v.expected_at(self.cursor))
            .map(str::to_string)
        else {
            return AttemptResult::unscheduled(AttemptOutcome::Ignored);
        };

        let king_square = self.position.board().king_of(self.position.turn());
        let internal = king_square
            .and_then(|k| castling::canonicalize(mv, k))
            .map_or(mv, |mapping| mapping.internal_move);

        let legal = match internal.to_move(&self.position) {
            Ok(legal) => legal,
            Err(e) => {
                debug!(error = %e, "Ignoring illegal attempt");
                return AttemptResult::unscheduled(AttemptOutcome::Illegal);
            }
        };

        // castling shows the king's landing square whichever form was entered
        let display_square = board::display_destination(&legal);

        // SAN is taken from the position before the move is applied
        let (next, san) = match board::apply_move(&self.position, legal) {
            Ok(applied) => applied,
            Err(e) => {
                debug!(error = %e, "Ignoring illegal attempt");
                return AttemptResult::unscheduled(AttemptOutcome::Illegal);
            }
        };
        self.position = next;

        if board::san_matches(&san, &expected) {
            self.cursor += 1;
            self.furthest = self.furthest.max(self.cursor);
            self.moves_completed += 1;

            let mut scheduled = vec![self.show_marker(MarkerKind::Valid, display_square)];
            let complete = self.cursor == self.total_moves();

            if complete {
                self.phase = Phase::LineComplete;
                info!(
                    mistakes = self.mistakes_made,
                    hints = self.hints_used,
                    "Line complete"
                );
            } else {
                self.phase = Phase::MoveAccepted;
                if !self.is_learner_turn() {
                    scheduled.push(self.schedule(
                        self.timing.opponent_reply_delay,
                        DelayedAction::OpponentReply {
                            cursor: self.cursor,
                        },
                    ));
                }
            }

            AttemptResult {
                outcome: AttemptOutcome::Accepted { san, complete },
                scheduled,
            }
        } else {
            self.mistakes_made += 1;
            self.marker_id += 1;
            self.marker = Some(Marker {
                kind: MarkerKind::Invalid,
                square: display_square,
            });
            self.phase = Phase::MoveRejected;

            debug!(played = %san, expected = %expected, cursor = self.cursor, "Move rejected");

            let revert = self.schedule(
                self.timing.mistake_revert_delay,
                DelayedAction::RevertMistake {
                    cursor: self.cursor,
                },
            );

            AttemptResult {
                outcome: AttemptOutcome::Rejected {
                    played: san,
                    expected,
                },
                scheduled: vec![revert],
            }
        }
    }

    /// Marks the origin square of the expected move
    pub fn show_hint(&mut self) -> Vec<Scheduled> {
        if !matches!(self.phase, Phase::AwaitingMove | Phase::MoveAccepted) || !self.is_learner_turn() {
            return Vec::new();
        }
        let Some(expected) = self
            .variation
            .as_ref()
            .and_then(|v| v.expected_at(self.cursor))
        else {
            return Vec::new();
        };

        let origin = match board::parse_san(&self.position, expected) {
            Ok(mv) => mv.from(),
            Err(e) => {
                warn!(error = %e, cursor = self.cursor, "Could not resolve hint");
                return Vec::new();
            }
        };
        let Some(square) = origin else {
            return Vec::new();
        };

        self.hints_used += 1;
        vec![self.show_marker(MarkerKind::Hint, square)]
    }

    /// Steps one move back through the line.
    ///
    /// `None` if there is nothing to step back to.
    pub fn go_back(&mut self) -> Option<Vec<Scheduled>> {
        if self.variation.is_none() || self.cursor == 0 {
            return None;
        }
        self.navigate_to(self.cursor - 1)
    }

    /// Steps forward through moves already reached; never reveals new ones
    pub fn go_forward(&mut self) -> Option<Vec<Scheduled>> {
        if self.variation.is_none() || self.cursor >= self.furthest {
            return None;
        }
        self.navigate_to(self.cursor + 1)
    }

    pub fn flip_orientation(&mut self) {
        self.orientation = self.orientation.other();
    }

    /// Runs a previously scheduled transition; stale ones are dropped
    pub fn fire(&mut self, scheduled: Scheduled) {
        if scheduled.generation != self.generation {
            debug!(
                stale = scheduled.generation,
                current = self.generation,
                "Dropping stale transition"
            );
            return;
        }

        match scheduled.action {
            DelayedAction::OpponentReply { cursor } => {
                if cursor == self.cursor
                    && matches!(self.phase, Phase::Ready | Phase::MoveAccepted)
                    && !self.is_learner_turn()
                {
                    self.play_scripted_reply();
                }
            }
            DelayedAction::RevertMistake { cursor } => {
                if cursor == self.cursor && self.phase == Phase::MoveRejected {
                    self.rebuild_position();
                    self.marker = None;
                    self.phase = Phase::AwaitingMove;
                }
            }
            DelayedAction::ClearMarker { marker_id } => {
                if marker_id == self.marker_id {
                    self.marker = None;
                }
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let info = crate::analyze_position(&self.position);

        let legal_moves = board::legal_move_map(&self.position)
            .into_iter()
            .map(|(from, targets)| {
                (
                    from.to_string(),
                    targets.into_iter().map(|sq| sq.to_string()).collect(),
                )
            })
            .collect();

        SessionSnapshot {
            phase: self.phase,
            variation_index: self.variation_index,
            variation_name: self.variation.as_ref().map(|v| v.name().to_string()),
            cursor: self.cursor,
            total_moves: self.total_moves(),
            fen: self.fen(),
            side_to_move: board::color_name(info.side_to_move),
            trained_side: board::color_name(
                self.variation
                    .as_ref()
                    .map_or(Color::White, |v| v.trained_side()),
            ),
            orientation: board::color_name(self.orientation),
            learner_to_move: self.is_learner_turn(),
            is_check: info.is_check,
            is_checkmate: info.is_checkmate,
            marker: self.marker.map(|m| MarkerView {
                kind: m.kind,
                square: m.square.to_string(),
            }),
            hints_used: self.hints_used,
            mistakes_made: self.mistakes_made,
            moves_completed: self.moves_completed,
            legal_moves,
            message: self.message.clone(),
        }
    }

    fn total_moves(&self) -> usize {
        self.variation.as_ref().map_or(0, Variation::len)
    }

    fn schedule(&self, delay: Duration, action: DelayedAction) -> Scheduled {
        Scheduled {
            generation: self.generation,
            delay,
            action,
        }
    }

    fn show_marker(&mut self, kind: MarkerKind, square: Square) -> Scheduled {
        self.marker_id += 1;
        self.marker = Some(Marker { kind, square });

        let delay = match kind {
            MarkerKind::Hint => self.timing.hint_clear_delay,
            _ => self.timing.marker_clear_delay,
        };
        self.schedule(
            delay,
            DelayedAction::ClearMarker {
                marker_id: self.marker_id,
            },
        )
    }

    /// Rebuilds the position at `cursor`. Landing where the opponent is to
    /// move hands control back to the scripted reply.
    fn navigate_to(&mut self, cursor: usize) -> Option<Vec<Scheduled>> {
        let previous = self.cursor;
        self.cursor = cursor;
        if !self.rebuild_position() {
            self.cursor = previous;
            return None;
        }

        self.marker = None;
        let mut scheduled = Vec::new();
        if self.cursor == self.total_moves() {
            self.phase = Phase::LineComplete;
        } else if self.is_learner_turn() {
            self.phase = Phase::AwaitingMove;
        } else {
            self.phase = Phase::Ready;
            scheduled.push(self.schedule(
                self.timing.opponent_reply_delay,
                DelayedAction::OpponentReply {
                    cursor: self.cursor,
                },
            ));
        }
        Some(scheduled)
    }

    /// Replays the line from its start up to the cursor
    fn rebuild_position(&mut self) -> bool {
        let Some(variation) = self.variation.as_ref() else {
            return false;
        };
        match variation.position_at(self.cursor) {
            Ok(position) => {
                self.position = position;
                true
            }
            Err(e) => {
                warn!(error = %e, cursor = self.cursor, "Replay failed");
                false
            }
        }
    }

    fn play_scripted_reply(&mut self) {
        let Some(expected) = self
            .variation
            .as_ref()
            .and_then(|v| v.expected_at(self.cursor))
        else {
            return;
        };

        let applied = board::parse_san(&self.position, expected)
            .and_then(|mv| board::apply_move(&self.position, mv));

        match applied {
            Ok((next, san)) => {
                debug!(san = %san, cursor = self.cursor, "Opponent reply");
                self.position = next;
                self.cursor += 1;
                self.furthest = self.furthest.max(self.cursor);
                self.phase = if self.cursor == self.total_moves() {
                    Phase::LineComplete
                } else {
                    Phase::AwaitingMove
                };
            }
            Err(e) => {
                warn!(error = %e, cursor = self.cursor, "Scripted reply could not be applied");
            }
        }
    }
}
