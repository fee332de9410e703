//! Async timer driver for a line session
//!
//! Runs each `Scheduled` transition on a tokio timer. All pending timers are
//! aborted when a new variation loads or the driver is disposed; the session's
//! generation check covers any timer that already woke up.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::sleep;

use super::session::{AttemptOutcome, LineSession, Scheduled, SessionSnapshot};
use super::variation::{Repertoire, Variation};
use crate::board::UiMove;
use crate::config::TimingConfig;
use crate::error::Result;

type Pending = Arc<Mutex<Vec<JoinHandle<()>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns one session and executes its delayed transitions.
///
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct LineDriver {
    session: Arc<Mutex<LineSession>>,
    pending: Pending,
}

impl LineDriver {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            session: Arc::new(Mutex::new(LineSession::new(timing))),
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn load(&self, variation: Variation, index: usize) {
        self.cancel_pending();
        let scheduled = lock(&self.session).load_variation(variation, index);
        self.spawn_all(scheduled);
    }

    /// Switches to another variation of a repertoire; the current one keeps running on error
    pub fn switch_variation(&self, repertoire: &Repertoire, index: usize) -> Result<()> {
        let variation = repertoire.get(index)?.clone();
        self.load(variation, index);
        Ok(())
    }

    pub fn attempt(&self, mv: UiMove) -> AttemptOutcome {
        let result = lock(&self.session).attempt_move(mv);
        self.spawn_all(result.scheduled);
        result.outcome
    }

    pub fn hint(&self) {
        let scheduled = lock(&self.session).show_hint();
        self.spawn_all(scheduled);
    }

    pub fn back(&self) -> bool {
        let navigated = lock(&self.session).go_back();
        self.spawn_navigation(navigated)
    }

    pub fn forward(&self) -> bool {
        let navigated = lock(&self.session).go_forward();
        self.spawn_navigation(navigated)
    }

    pub fn flip(&self) {
        lock(&self.session).flip_orientation();
    }

    pub fn reset(&self) {
        self.cancel_pending();
        let scheduled = lock(&self.session).reset();
        self.spawn_all(scheduled);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        lock(&self.session).snapshot()
    }

    /// Stops all timers and tears down the session
    pub fn dispose(&self) {
        self.cancel_pending();
        lock(&self.session).dispose();
    }

    fn cancel_pending(&self) {
        for handle in lock(&self.pending).drain(..) {
            handle.abort();
        }
    }

    fn spawn_navigation(&self, navigated: Option<Vec<Scheduled>>) -> bool {
        match navigated {
            Some(scheduled) => {
                self.spawn_all(scheduled);
                true
            }
            None => false,
        }
    }

    fn spawn_all(&self, scheduled: Vec<Scheduled>) {
        if scheduled.is_empty() {
            return;
        }

        let mut handles = lock(&self.pending);
        handles.retain(|h| !h.is_finished());

        for item in scheduled {
            let session = Arc::clone(&self.session);
            handles.push(tokio::spawn(async move {
                sleep(item.delay).await;
                lock(&session).fire(item);
            }));
        }
    }
}
