//! Resumable stopwatch: accumulated milliseconds plus an optional start mark.
//!
//! The session engine runs three of these (total, step, exercise) and the
//! global timer runs one.

use serde::{Deserialize, Serialize};

/// Longest elapsed time a restored record may carry (one year)
pub const MAX_ELAPSED_MS: i64 = 366 * 24 * 60 * 60 * 1000;

/// Elapsed-time accumulator that can be frozen and resumed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stopwatch {
    /// Time accumulated before the current run
    pub accumulated_ms: i64,
    /// Wall-clock start of the current run, if running
    pub started_at_ms: Option<i64>,
}

impl Stopwatch {
    pub fn is_running(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Zero the accumulator and start a fresh run
    pub fn restart(&mut self, now_ms: i64) {
        self.accumulated_ms = 0;
        self.started_at_ms = Some(now_ms);
    }

    /// Zero the accumulator and leave the stopwatch stopped
    pub fn clear(&mut self) {
        self.accumulated_ms = 0;
        self.started_at_ms = None;
    }

    /// Start a run at `now_ms`, replacing any running mark
    pub fn resume(&mut self, now_ms: i64) {
        self.started_at_ms = Some(now_ms);
    }

    /// Start a run only if not already running
    pub fn ensure_running(&mut self, now_ms: i64) {
        if self.started_at_ms.is_none() {
            self.started_at_ms = Some(now_ms);
        }
    }

    /// Fold the running portion into the accumulator and stop
    pub fn freeze(&mut self, now_ms: i64) {
        if let Some(started) = self.started_at_ms.take() {
            let run = now_ms.saturating_sub(started).max(0);
            self.accumulated_ms = self.accumulated_ms.saturating_add(run);
        }
    }

    pub fn elapsed_ms(&self, now_ms: i64) -> i64 {
        let running = self
            .started_at_ms
            .map(|started| now_ms.saturating_sub(started).max(0))
            .unwrap_or(0);
        self.accumulated_ms.saturating_add(running)
    }

    /// Whole elapsed seconds, floored
    pub fn elapsed_seconds(&self, now_ms: i64) -> u64 {
        (self.elapsed_ms(now_ms) / 1000).max(0) as u64
    }

    /// Equivalent stopwatch whose run (if any) is anchored at `now_ms`.
    ///
    /// Persisted records store this form so that re-anchoring on restore
    /// loses no time already elapsed.
    pub fn anchored_at(&self, now_ms: i64) -> Self {
        Self {
            accumulated_ms: self.elapsed_ms(now_ms),
            started_at_ms: self.started_at_ms.map(|_| now_ms),
        }
    }
}
