//! Multi-exercise mobility circuits.

use super::{active_kind, measure_label, rest_step, setup_step};
use crate::{Exercise, SessionStep, Side, Workout};
use uuid::Uuid;

const MAX_SETS: u32 = 50;
const MAX_REST_BETWEEN_EXERCISES: u32 = 120;
const MAX_REST_BETWEEN_SIDES: u32 = 60;
const MAX_REST_BETWEEN_SETS: u32 = 600;

/// Expand a circuit preset into session steps.
///
/// Per exercise: an optional setup countdown, then each set (left, optional
/// side rest, right for per-side exercises), with rest between sets. Rest
/// between exercises uses the preset's value. Called with a workout-category
/// preset it yields only the sentinel.
pub fn build_circuit_steps(workout: &Workout) -> Vec<SessionStep> {
    if !workout.category.is_circuit() {
        tracing::warn!(
            "Circuit builder called for workout-category preset {}",
            workout.id
        );
        return vec![SessionStep::completed("Completed")];
    }

    let between_exercises = workout
        .rest_between_exercises_seconds
        .min(MAX_REST_BETWEEN_EXERCISES);
    let mut out = Vec::new();

    for (position, ex) in workout.exercises.iter().enumerate() {
        let sets = ex.sets.clamp(1, MAX_SETS);

        for set in 1..=sets {
            if set == 1 {
                out.extend(setup_step(ex, Some(sets)));
            }

            if ex.per_side {
                out.push(active_step(ex, set, sets, Some(Side::Left)));

                let between_sides = ex.rest_seconds_between_sides.min(MAX_REST_BETWEEN_SIDES);
                if between_sides > 0 {
                    out.push(rest_step(
                        Some(ex),
                        "Rest (between sides)",
                        between_sides,
                        Some((set, sets)),
                    ));
                }

                out.push(active_step(ex, set, sets, Some(Side::Right)));
            } else {
                out.push(active_step(ex, set, sets, None));
            }

            if set < sets {
                let between_sets = ex.rest_seconds_between_sets.min(MAX_REST_BETWEEN_SETS);
                if between_sets > 0 {
                    out.push(rest_step(
                        Some(ex),
                        "Rest (between sets)",
                        between_sets,
                        Some((set, sets)),
                    ));
                }
            }
        }

        if position + 1 < workout.exercises.len() && between_exercises > 0 {
            out.push(rest_step(
                None,
                "Rest (between exercises)",
                between_exercises,
                None,
            ));
        }
    }

    out.push(SessionStep::completed("Completed"));

    tracing::debug!(
        "Built {} circuit steps for preset {}",
        out.len(),
        workout.id
    );
    out
}

fn active_step(ex: &Exercise, set: u32, sets: u32, side: Option<Side>) -> SessionStep {
    let (kind, duration_seconds) = active_kind(ex);
    let side_part = side.map(|s| format!(" ({})", s)).unwrap_or_default();

    SessionStep {
        id: Uuid::new_v4(),
        kind,
        exercise_id: Some(ex.id.clone()),
        exercise_name: ex.name.clone(),
        label: format!("Set {} of {}{} • {}", set, sets, side_part, measure_label(ex)),
        set_index: Some(set),
        set_count: Some(sets),
        side,
        duration_seconds,
    }
}
