//! Step builders: expand exercise definitions into ordered session steps.
//!
//! Every generated sequence ends with exactly one `Completed` sentinel.

mod circuit;
mod workout;

pub use circuit::build_circuit_steps;
pub use workout::build_workout_steps_for_exercise;
pub(crate) use workout::{MAX_WARMUP_SETS, MAX_WORKING_SETS};

use crate::{Exercise, SessionStep, StepKind};
use uuid::Uuid;

pub(crate) const MAX_DURATION_SECONDS: u32 = 3600;
pub(crate) const MAX_REPS: u32 = 500;
pub(crate) const MIN_SETUP_SECONDS: u32 = 1;
pub(crate) const MAX_SETUP_SECONDS: u32 = 600;

/// Build the steps for a category's preset, or for one exercise of it.
///
/// Circuit categories expand the whole preset; the workout category expands
/// only the given exercise.
pub fn build_steps(workout: &crate::Workout, exercise: Option<&Exercise>) -> Vec<SessionStep> {
    if workout.category.is_circuit() {
        return build_circuit_steps(workout);
    }
    match exercise.or_else(|| workout.exercises.first()) {
        Some(ex) => build_workout_steps_for_exercise(ex),
        None => vec![SessionStep::completed("Completed")],
    }
}

/// Index of the step a backwards jump into a finished exercise should land
/// on: the last interactive step, else the last timed active step, else the
/// final step.
pub fn last_interactive_index(steps: &[SessionStep]) -> usize {
    steps
        .iter()
        .rposition(|s| s.kind == StepKind::AwaitUserDone)
        .or_else(|| steps.iter().rposition(|s| s.kind == StepKind::TimedActive))
        .unwrap_or_else(|| steps.len().saturating_sub(1))
}

pub(crate) fn setup_step(ex: &Exercise, set_count: Option<u32>) -> Option<SessionStep> {
    let setup = ex.setup_seconds.filter(|s| *s > 0)?;
    Some(SessionStep {
        id: Uuid::new_v4(),
        kind: StepKind::SetupTimer,
        exercise_id: Some(ex.id.clone()),
        exercise_name: ex.name.clone(),
        label: "Setup".into(),
        set_index: set_count.map(|_| 1),
        set_count,
        side: None,
        duration_seconds: Some(setup.clamp(MIN_SETUP_SECONDS, MAX_SETUP_SECONDS)),
    })
}

pub(crate) fn rest_step(
    ex: Option<&Exercise>,
    label: impl Into<String>,
    seconds: u32,
    set: Option<(u32, u32)>,
) -> SessionStep {
    SessionStep {
        id: Uuid::new_v4(),
        kind: StepKind::RestTimer,
        exercise_id: ex.map(|e| e.id.clone()),
        exercise_name: ex.map(|e| e.name.clone()).unwrap_or_default(),
        label: label.into(),
        set_index: set.map(|(i, _)| i),
        set_count: set.map(|(_, n)| n),
        side: None,
        duration_seconds: Some(seconds),
    }
}

/// "30s" or "8 reps" for the exercise's mode
pub(crate) fn measure_label(ex: &Exercise) -> String {
    if ex.is_timed() {
        format!("{}s", ex.duration_seconds.clamp(1, MAX_DURATION_SECONDS))
    } else {
        format!("{} reps", ex.reps.clamp(1, MAX_REPS))
    }
}

pub(crate) fn active_kind(ex: &Exercise) -> (StepKind, Option<u32>) {
    if ex.is_timed() {
        (
            StepKind::TimedActive,
            Some(ex.duration_seconds.clamp(1, MAX_DURATION_SECONDS)),
        )
    } else {
        (StepKind::AwaitUserDone, None)
    }
}
