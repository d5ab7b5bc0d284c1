//! Drives one category's engine through a selected workout.
//!
//! The engine only knows about a flat step list. Moving between the
//! exercises of a workout-category preset (next, back across the boundary,
//! picking a different exercise mid-session) is handled here.

use crate::engine::{SessionEngine, StartOptions};
use crate::plan::{clamp_day, effective_exercise_at, ExecutionType};
use crate::steps::{build_circuit_steps, build_workout_steps_for_exercise, last_interactive_index};
use crate::validate::{effective_sets, validate_exercise, SetStyle};
use crate::{Error, Exercise, Result, SessionState, SessionStep, Workout};

/// Whether every exercise the engine's session refers to is part of `workout`.
///
/// True for an idle engine.
pub fn session_belongs_to(engine: &SessionEngine, workout: &Workout) -> bool {
    engine
        .steps()
        .iter()
        .filter_map(|s| s.exercise_id.as_deref())
        .all(|id| workout.exercise_position(id).is_some())
}

pub struct WorkoutRunner {
    engine: SessionEngine,
    workout: Workout,
    execution: ExecutionType,
    day: u32,
    position: usize,
}

impl WorkoutRunner {
    /// Bind an engine to a workout of the same category.
    ///
    /// When the engine restored a session, the runner picks up at the
    /// exercise that session belongs to. A restored session of another
    /// preset is refused while in progress and discarded once completed.
    pub fn new(
        mut engine: SessionEngine,
        workout: Workout,
        execution: ExecutionType,
        day: u32,
    ) -> Result<Self> {
        if engine.category() != workout.category {
            return Err(Error::Other(format!(
                "preset '{}' belongs to {}, not {}",
                workout.id,
                workout.category,
                engine.category()
            )));
        }

        if !session_belongs_to(&engine, &workout) {
            match engine.state() {
                SessionState::Idle => {}
                SessionState::Completed => {
                    tracing::info!(
                        "Discarding completed {} session of another preset",
                        engine.category()
                    );
                    engine.full_reset();
                }
                _ => {
                    return Err(Error::Other(format!(
                        "a {} session from another preset is in progress",
                        engine.category()
                    )));
                }
            }
        }

        let execution = ExecutionType::for_workout(&workout, execution);
        let day = clamp_day(day, workout.repeat_count);
        let position = engine
            .steps()
            .iter()
            .find_map(|s| s.exercise_id.as_deref())
            .and_then(|id| workout.exercise_position(id))
            .unwrap_or(0);

        Ok(Self {
            engine,
            workout,
            execution,
            day,
            position,
        })
    }

    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut SessionEngine {
        &mut self.engine
    }

    pub fn workout(&self) -> &Workout {
        &self.workout
    }

    pub fn execution(&self) -> ExecutionType {
        self.execution
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn position(&self) -> usize {
        self.position
    }

    fn is_circuit(&self) -> bool {
        self.workout.category.is_circuit()
    }

    /// The selected exercise with today's plan programming applied
    pub fn current_exercise(&self) -> Option<Exercise> {
        self.exercise_at(self.position)
    }

    fn exercise_at(&self, position: usize) -> Option<Exercise> {
        effective_exercise_at(&self.workout, position, self.execution, self.day)
    }

    /// Steps for the whole circuit, or for the exercise at `position`
    pub fn steps_at(&self, position: usize) -> Vec<SessionStep> {
        if self.is_circuit() {
            return build_circuit_steps(&self.workout);
        }
        match self.exercise_at(position) {
            Some(ex) => build_workout_steps_for_exercise(&ex),
            None => vec![SessionStep::completed("Completed")],
        }
    }

    /// Start the selected exercise (or circuit) if nothing is running
    pub fn start(&mut self) -> bool {
        if self.engine.state() != SessionState::Idle {
            return false;
        }
        let steps = self.steps_at(self.position);
        self.engine.start_session(steps, StartOptions::default());
        true
    }

    pub fn has_next_exercise(&self) -> bool {
        !self.is_circuit() && self.position + 1 < self.workout.exercises.len()
    }

    /// After completing an exercise, continue with the following one
    pub fn next_exercise(&mut self) -> bool {
        if self.engine.state() != SessionState::Completed || !self.has_next_exercise() {
            return false;
        }
        self.position += 1;
        tracing::info!(
            "Moving on to exercise {} of {}",
            self.position + 1,
            self.workout.exercises.len()
        );
        let steps = self.steps_at(self.position);
        self.engine.start_session(
            steps,
            StartOptions {
                preserve_total_elapsed: true,
                start_index: None,
            },
        );
        true
    }

    /// Step back within the exercise, or into the end of the previous one
    pub fn go_back(&mut self) -> bool {
        let snap = self.engine.snapshot();
        if snap.state == SessionState::Idle {
            return false;
        }
        if snap.state == SessionState::Completed || snap.step_index > 0 {
            return self.engine.back();
        }
        if self.is_circuit() || self.position == 0 {
            return false;
        }

        self.position -= 1;
        let steps = self.steps_at(self.position);
        let start_index = last_interactive_index(&steps);
        tracing::debug!(
            "Back into exercise {} at step {}",
            self.position + 1,
            start_index
        );
        self.engine.start_session(
            steps,
            StartOptions {
                preserve_total_elapsed: true,
                start_index: Some(start_index),
            },
        );
        true
    }

    /// Switch to another exercise of a workout-category preset.
    ///
    /// Mid-session a valid exercise restarts the engine on it, keeping the
    /// total elapsed time; an invalid one fully resets the engine.
    pub fn select_exercise(&mut self, exercise_id: &str) -> Result<()> {
        if self.is_circuit() {
            return Err(Error::Other(format!(
                "{} presets run as a single circuit",
                self.workout.category
            )));
        }
        let position = self
            .workout
            .exercise_position(exercise_id)
            .ok_or_else(|| Error::NotFound(format!("exercise '{}'", exercise_id)))?;
        self.position = position;

        if self.engine.state() == SessionState::Idle {
            return Ok(());
        }

        let valid = self
            .exercise_at(position)
            .map(|ex| validate_exercise(&ex, SetStyle::Workout).is_ok())
            .unwrap_or(false);
        if valid {
            let steps = self.steps_at(position);
            self.engine.start_session(
                steps,
                StartOptions {
                    preserve_total_elapsed: true,
                    start_index: None,
                },
            );
        } else {
            self.engine.full_reset();
        }
        Ok(())
    }

    /// Preview of the next exercise, shown once the current one completes
    pub fn up_next_summary(&self) -> Option<String> {
        if !self.has_next_exercise() {
            return None;
        }
        let ex = self.exercise_at(self.position + 1)?;
        let weight = if ex.weight.trim().is_empty() {
            "-"
        } else {
            ex.weight.trim()
        };
        let measure = if ex.is_timed() {
            format!("Duration {}s", ex.duration_seconds)
        } else {
            format!("Reps {}", ex.reps)
        };
        Some(format!(
            "Up next: {} • Weight {} • Sets {} • {}",
            ex.name,
            weight,
            effective_sets(&ex, SetStyle::Workout).max(1),
            measure
        ))
    }
}
