//! Session execution engine.
//!
//! The engine walks an immutable step sequence with a position pointer.
//! Timed steps store a wall-clock target rather than a countdown so that
//! sleep and backgrounding never desynchronize them; the remaining time is
//! recomputed on every read. Three resumable stopwatches track total,
//! per-step and per-exercise elapsed time.
//!
//! All control operations are infallible: calls that do not apply in the
//! current state are no-ops, and persistence failures are logged and
//! swallowed.

use crate::clock::Clock;
use crate::observer::{Listeners, Subscription};
use crate::snapshot::{EngineSnapshot, PersistedEngine};
use crate::stopwatch::{Stopwatch, MAX_ELAPSED_MS};
use crate::storage::KeyValueStore;
use crate::{Category, SessionState, SessionStep, StepKind};
use std::sync::Arc;

/// Options for `start_session`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StartOptions {
    /// Keep the accumulated total elapsed time (moving to another exercise)
    pub preserve_total_elapsed: bool,
    /// Entry step, clamped into the sequence
    pub start_index: Option<usize>,
}

/// Countdown for the current step.
///
/// At most one representation exists at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepTimer {
    Off,
    Running { target_ms: i64 },
    Frozen { remaining_seconds: u32 },
}

/// Whole seconds left until `target_ms`, floored and never negative
fn seconds_until(target_ms: i64, now_ms: i64) -> u32 {
    let seconds = target_ms.saturating_sub(now_ms).max(0) / 1000;
    u32::try_from(seconds).unwrap_or(u32::MAX)
}

/// Countdown length of a step; only timer kinds count down
fn countdown_seconds(step: &SessionStep) -> Option<u32> {
    step.duration_seconds.filter(|_| step.kind.is_timed())
}

/// Storage key for a category's engine record
pub fn storage_key(category: Category) -> String {
    format!("engine.snapshot.{}.v1", category.as_str())
}

pub struct SessionEngine {
    category: Category,
    storage_key: String,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    listeners: Listeners<EngineSnapshot>,

    state: SessionState,
    steps: Vec<SessionStep>,
    index: usize,
    paused: bool,
    timer: StepTimer,

    total: Stopwatch,
    step: Stopwatch,
    exercise: Stopwatch,
}

impl SessionEngine {
    /// Create the engine for a category, restoring any persisted session
    pub fn new(category: Category, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let mut engine = Self {
            category,
            storage_key: storage_key(category),
            store,
            clock,
            listeners: Listeners::default(),
            state: SessionState::Idle,
            steps: Vec::new(),
            index: 0,
            paused: false,
            timer: StepTimer::Off,
            total: Stopwatch::default(),
            step: Stopwatch::default(),
            exercise: Stopwatch::default(),
        };
        engine.restore();
        engine
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn steps(&self) -> &[SessionStep] {
        &self.steps
    }

    pub fn current_step(&self) -> Option<&SessionStep> {
        self.steps.get(self.index)
    }

    /// Register a listener, notified after every state-affecting mutation and
    /// on every tick while running
    pub fn subscribe(
        &self,
        listener: impl Fn(&EngineSnapshot) + 'static,
    ) -> Subscription<EngineSnapshot> {
        self.listeners.subscribe(listener)
    }

    /// Pure read of the current state
    pub fn snapshot(&self) -> EngineSnapshot {
        let now = self.clock.now_ms();

        let time_remaining_seconds = match self.timer {
            StepTimer::Off => None,
            StepTimer::Running { target_ms } => Some(seconds_until(target_ms, now)),
            StepTimer::Frozen { remaining_seconds } => Some(remaining_seconds),
        };

        EngineSnapshot {
            state: self.state,
            is_paused: self.paused,
            current_step: self.steps.get(self.index).cloned(),
            next_step: self.steps.get(self.index + 1).cloned(),
            step_index: self.index,
            step_count: self.steps.len(),
            time_remaining_seconds,
            total_elapsed_seconds: self.total.elapsed_seconds(now),
            step_elapsed_seconds: self.step.elapsed_seconds(now),
            exercise_elapsed_seconds: self.exercise.elapsed_seconds(now),
        }
    }

    // ------------------------------------------------------------------
    // Controls
    // ------------------------------------------------------------------

    /// Install a new step sequence and enter its first step
    pub fn start_session(&mut self, steps: Vec<SessionStep>, options: StartOptions) {
        let now = self.clock.now_ms();

        self.steps = steps;
        let last = self.steps.len().saturating_sub(1);
        self.index = options.start_index.unwrap_or(0).min(last);

        self.state = SessionState::Transition;
        self.paused = false;
        self.timer = StepTimer::Off;

        self.exercise.restart(now);
        if options.preserve_total_elapsed {
            self.total.ensure_running(now);
        } else {
            self.total.restart(now);
        }

        tracing::info!(
            category = %self.category,
            steps = self.steps.len(),
            index = self.index,
            preserve_total = options.preserve_total_elapsed,
            "Session started"
        );

        self.enter_current_step(now, now);
        self.commit();
    }

    pub fn pause(&mut self) -> bool {
        if self.paused || self.state.is_dormant() {
            return false;
        }
        let now = self.clock.now_ms();

        self.paused = true;
        if let StepTimer::Running { target_ms } = self.timer {
            self.timer = StepTimer::Frozen {
                remaining_seconds: seconds_until(target_ms, now),
            };
        }
        self.total.freeze(now);
        self.step.freeze(now);
        self.exercise.freeze(now);

        tracing::debug!(category = %self.category, "Paused");
        self.commit();
        true
    }

    pub fn resume(&mut self) -> bool {
        if !self.paused || self.state.is_dormant() {
            return false;
        }
        let now = self.clock.now_ms();

        self.paused = false;
        self.total.resume(now);
        self.step.resume(now);
        self.exercise.resume(now);
        if let StepTimer::Frozen { remaining_seconds } = self.timer {
            self.timer = StepTimer::Running {
                target_ms: now + i64::from(remaining_seconds) * 1000,
            };
        }

        tracing::debug!(category = %self.category, "Resumed");
        self.commit();
        true
    }

    /// Restart the current step: elapsed back to zero, countdown back to full
    pub fn reset_current_step(&mut self) {
        if self.state.is_dormant() {
            return;
        }
        let Some(duration) = self.current_step().map(countdown_seconds) else {
            return;
        };
        let now = self.clock.now_ms();

        if self.paused {
            self.step.clear();
        } else {
            self.step.restart(now);
        }

        if let Some(seconds) = duration {
            self.timer = if self.paused {
                StepTimer::Frozen {
                    remaining_seconds: seconds,
                }
            } else {
                StepTimer::Running {
                    target_ms: now + i64::from(seconds) * 1000,
                }
            };
        }

        tracing::debug!(category = %self.category, index = self.index, "Step reset");
        self.commit();
    }

    /// Confirm an interactive set; ignored on any other kind of step
    pub fn mark_done(&mut self) -> bool {
        if self.state.is_dormant() {
            return false;
        }
        if self.current_step().map(|s| s.kind) != Some(StepKind::AwaitUserDone) {
            return false;
        }
        let now = self.clock.now_ms();
        self.advance(now, now);
        self.commit();
        true
    }

    /// Move to the next step regardless of kind or timer
    pub fn skip(&mut self) -> bool {
        if self.state.is_dormant() {
            return false;
        }
        let now = self.clock.now_ms();
        tracing::debug!(category = %self.category, index = self.index, "Skipping step");
        self.advance(now, now);
        self.commit();
        true
    }

    /// Step back one position.
    ///
    /// From `Completed` this lands on the last step before the sentinel.
    /// Returns false at the first step: crossing into a previous exercise is
    /// the caller's job (see `WorkoutRunner::go_back`).
    pub fn back(&mut self) -> bool {
        if self.state == SessionState::Idle || self.steps.is_empty() {
            return false;
        }

        let target = if self.state == SessionState::Completed {
            let mut target = self.index.min(self.steps.len() - 1);
            if target > 0 && self.steps[target].is_completed() {
                target -= 1;
            }
            target
        } else if self.index == 0 {
            return false;
        } else {
            self.index - 1
        };

        let now = self.clock.now_ms();
        self.index = target;
        self.state = SessionState::Transition;
        self.paused = false;
        self.timer = StepTimer::Off;
        self.total.ensure_running(now);
        self.exercise.ensure_running(now);

        tracing::debug!(category = %self.category, index = target, "Stepped back");
        self.enter_current_step(now, now);
        self.commit();
        true
    }

    /// Abandon the session and erase its persisted record
    pub fn full_reset(&mut self) {
        self.state = SessionState::Idle;
        self.steps.clear();
        self.index = 0;
        self.paused = false;
        self.timer = StepTimer::Off;
        self.total.clear();
        self.step.clear();
        self.exercise.clear();

        if let Err(e) = self.store.remove(&self.storage_key) {
            tracing::warn!("Failed to erase {}: {}", self.storage_key, e);
        }

        tracing::info!(category = %self.category, "Session reset");
        self.notify();
    }

    /// Host regained the foreground: catch up on time spent in the background
    pub fn app_became_active(&mut self) {
        let now = self.clock.now_ms();
        self.reconcile(now);
        self.commit();
    }

    /// Host is about to be backgrounded
    pub fn app_will_resign_active(&mut self) {
        self.persist();
    }

    /// Periodic tick; auto-advances an expired countdown.
    ///
    /// Returns true when the step changed.
    pub fn tick(&mut self) -> bool {
        if self.state.is_dormant() || self.paused {
            return false;
        }
        let now = self.clock.now_ms();

        if let StepTimer::Running { target_ms } = self.timer {
            if target_ms <= now {
                self.timer = StepTimer::Off;
                self.advance(now, now);
                self.commit();
                return true;
            }
        }

        self.notify();
        false
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Enter the step at `index`. `started_ms` anchors the step clock and
    /// countdown; it trails `now_ms` only when catching up on expired steps.
    fn enter_current_step(&mut self, started_ms: i64, now_ms: i64) {
        if self.paused {
            self.step.clear();
        } else {
            self.step.restart(started_ms);
        }

        let Some(step) = self.steps.get(self.index) else {
            self.finish(now_ms);
            return;
        };
        let Some(state) = step.kind.session_state() else {
            self.finish(now_ms);
            return;
        };

        self.state = state;
        self.timer = match countdown_seconds(step) {
            Some(seconds) if self.paused => StepTimer::Frozen {
                remaining_seconds: seconds,
            },
            Some(seconds) => StepTimer::Running {
                target_ms: started_ms + i64::from(seconds) * 1000,
            },
            None => StepTimer::Off,
        };

        tracing::debug!(
            category = %self.category,
            index = self.index,
            kind = ?step.kind,
            label = %step.label,
            "Entered step"
        );
    }

    fn advance(&mut self, started_ms: i64, now_ms: i64) {
        self.index += 1;
        self.timer = StepTimer::Off;
        self.enter_current_step(started_ms, now_ms);
    }

    fn finish(&mut self, now_ms: i64) {
        self.state = SessionState::Completed;
        self.paused = false;
        self.timer = StepTimer::Off;
        self.total.freeze(now_ms);
        self.exercise.freeze(now_ms);
        self.step.freeze(now_ms);

        tracing::info!(
            category = %self.category,
            total_seconds = self.total.elapsed_seconds(now_ms),
            "Session completed"
        );
    }

    /// Advance through every countdown that expired while nothing was
    /// ticking, anchoring each following step at its predecessor's expiry.
    fn reconcile(&mut self, now_ms: i64) {
        if self.paused || self.state.is_dormant() {
            return;
        }

        while !self.state.is_dormant() {
            let Some(step) = self.steps.get(self.index) else {
                self.finish(now_ms);
                return;
            };
            if step.kind == StepKind::Completed {
                self.finish(now_ms);
                return;
            }
            let Some(seconds) = countdown_seconds(step) else {
                self.enter_current_step(now_ms, now_ms);
                return;
            };

            match self.timer {
                StepTimer::Running { target_ms } if target_ms <= now_ms => {
                    tracing::debug!(
                        category = %self.category,
                        index = self.index,
                        late_ms = now_ms.saturating_sub(target_ms),
                        "Countdown expired in background"
                    );
                    self.advance(target_ms, now_ms);
                }
                StepTimer::Running { .. } => return,
                StepTimer::Off | StepTimer::Frozen { .. } => {
                    self.timer = StepTimer::Running {
                        target_ms: now_ms + i64::from(seconds) * 1000,
                    };
                    return;
                }
            }
        }
    }

    fn commit(&mut self) {
        self.persist();
        self.notify();
    }

    fn notify(&self) {
        if !self.listeners.is_empty() {
            self.listeners.emit(&self.snapshot());
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    fn to_record(&self, now_ms: i64) -> PersistedEngine {
        let total = self.total.anchored_at(now_ms);
        let step = self.step.anchored_at(now_ms);
        let exercise = self.exercise.anchored_at(now_ms);

        let (target_time_ms, remaining_seconds_when_paused) = match self.timer {
            StepTimer::Off => (None, None),
            StepTimer::Running { target_ms } => (Some(target_ms), None),
            StepTimer::Frozen { remaining_seconds } => (None, Some(remaining_seconds)),
        };

        PersistedEngine {
            state: self.state,
            steps: self.steps.clone(),
            index: self.index,
            is_paused: self.paused,
            target_time_ms,
            remaining_seconds_when_paused,
            started_at_ms: total.started_at_ms,
            elapsed_before_pause_ms: total.accumulated_ms,
            step_started_at_ms: step.started_at_ms,
            step_elapsed_before_pause_ms: step.accumulated_ms,
            exercise_started_at_ms: exercise.started_at_ms,
            exercise_elapsed_before_pause_ms: exercise.accumulated_ms,
        }
    }

    /// Best-effort write; failures are logged and dropped
    fn persist(&self) {
        if self.state == SessionState::Idle {
            if let Err(e) = self.store.remove(&self.storage_key) {
                tracing::warn!("Failed to erase {}: {}", self.storage_key, e);
            }
            return;
        }

        let record = self.to_record(self.clock.now_ms());
        let result = serde_json::to_string(&record)
            .map_err(crate::Error::from)
            .and_then(|json| self.store.set(&self.storage_key, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to persist {}: {}", self.storage_key, e);
        }
    }

    fn restore(&mut self) {
        let raw = match self.store.get(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Unable to read {}: {}. Starting idle.", self.storage_key, e);
                return;
            }
        };

        let record: PersistedEngine = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse {}: {}. Starting idle.",
                    self.storage_key,
                    e
                );
                return;
            }
        };

        if let Err(reason) = check_record(&record, self.clock.now_ms()) {
            tracing::warn!(
                "Discarding {}: {}. Starting idle.",
                self.storage_key,
                reason
            );
            return;
        }

        self.apply_record(record);
    }

    fn apply_record(&mut self, record: PersistedEngine) {
        let now = self.clock.now_ms();

        self.state = record.state;
        self.steps = record.steps;
        self.index = record.index;
        self.paused = record.is_paused;

        self.timer = match (
            self.paused,
            record.target_time_ms,
            record.remaining_seconds_when_paused,
        ) {
            (true, _, Some(remaining_seconds)) => StepTimer::Frozen { remaining_seconds },
            (false, Some(target_ms), _) => StepTimer::Running { target_ms },
            _ => StepTimer::Off,
        };

        self.total.accumulated_ms = record.elapsed_before_pause_ms;
        self.step.accumulated_ms = record.step_elapsed_before_pause_ms;
        self.exercise.accumulated_ms = record.exercise_elapsed_before_pause_ms;

        // Elapsed clocks re-anchor at load; only countdown targets are
        // wall-clock across restarts.
        let mid_session = !self.state.is_dormant();
        let anchor = (mid_session && !self.paused).then_some(now);
        self.total.started_at_ms = anchor;
        self.step.started_at_ms = anchor;
        self.exercise.started_at_ms = anchor;

        if !mid_session {
            self.paused = false;
            self.timer = StepTimer::Off;
            tracing::debug!(category = %self.category, state = %self.state, "Restored dormant engine");
            return;
        }

        let current = self
            .current_step()
            .map(|s| (s.kind.session_state(), countdown_seconds(s)));
        if let Some((Some(state), duration)) = current {
            if self.state == SessionState::Transition {
                self.state = state;
            }
            if self.paused && self.timer == StepTimer::Off {
                if let Some(remaining_seconds) = duration {
                    self.timer = StepTimer::Frozen { remaining_seconds };
                }
            }
        }

        tracing::info!(
            category = %self.category,
            index = self.index,
            paused = self.paused,
            "Restored session"
        );

        self.reconcile(now);
        self.persist();
    }
}

/// Reject records whose numbers no engine could have written.
///
/// Countdown targets may lie arbitrarily far in the past (the host was
/// closed) but never before the epoch nor further ahead than the longest
/// step. Accumulators stay within `0..=MAX_ELAPSED_MS`.
fn check_record(record: &PersistedEngine, now_ms: i64) -> std::result::Result<(), String> {
    let accumulators = [
        ("elapsedBeforePauseMs", record.elapsed_before_pause_ms),
        ("stepElapsedBeforePauseMs", record.step_elapsed_before_pause_ms),
        ("exerciseElapsedBeforePauseMs", record.exercise_elapsed_before_pause_ms),
    ];
    for (field, value) in accumulators {
        if !(0..=MAX_ELAPSED_MS).contains(&value) {
            return Err(format!("{} out of range ({})", field, value));
        }
    }

    let longest_seconds = record
        .steps
        .iter()
        .filter_map(countdown_seconds)
        .max()
        .unwrap_or(0);

    if let Some(target_ms) = record.target_time_ms {
        let latest = now_ms.saturating_add(i64::from(longest_seconds) * 1000);
        if !(0..=latest).contains(&target_ms) {
            return Err(format!("targetTimeMs out of range ({})", target_ms));
        }
    }
    if let Some(remaining) = record.remaining_seconds_when_paused {
        if remaining > longest_seconds {
            return Err(format!(
                "remainingSecondsWhenPaused longer than any step ({})",
                remaining
            ));
        }
    }
    Ok(())
}
