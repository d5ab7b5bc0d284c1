//! Single-exercise workout sessions: warm-up sets followed by working sets.

use super::{active_kind, measure_label, rest_step, setup_step, MAX_REPS};
use crate::validate::{validate_exercise, SetStyle};
use crate::{Exercise, SessionStep};
use uuid::Uuid;

pub(crate) const MAX_WARMUP_SETS: u32 = 20;
pub(crate) const MAX_WORKING_SETS: u32 = 50;
const MAX_REST_SECONDS: u32 = 3600;

/// Expand one exercise into a workout session.
///
/// An exercise that fails validation yields a single `Completed` step whose
/// label is the reason; the engine runs it as a trivially short session.
///
/// Rest after a warm-up set uses `rest_seconds_between_sets`; rest after a
/// working set uses `rest_seconds_between_sides`. Time-mode exercises use
/// the warm-up rest for every set.
pub fn build_workout_steps_for_exercise(ex: &Exercise) -> Vec<SessionStep> {
    if let Err(e) = validate_exercise(ex, SetStyle::Workout) {
        tracing::info!("Exercise {} cannot start: {}", ex.id, e);
        let mut step = SessionStep::completed(e.to_string());
        step.exercise_name = ex.name.clone();
        return vec![step];
    }

    let mut out = Vec::new();
    out.extend(setup_step(ex, None));

    let warmups = ex.warmup_sets.min(MAX_WARMUP_SETS);
    let working = ex.working_sets.min(MAX_WORKING_SETS);
    let total = warmups + working;

    let warmup_rest = ex.rest_seconds_between_sets.min(MAX_REST_SECONDS);
    let working_rest = ex.rest_seconds_between_sides.min(MAX_REST_SECONDS);

    for i in 1..=total {
        let is_warmup = i <= warmups;
        let (phase_index, phase_count) = if is_warmup {
            (i, warmups)
        } else {
            (i - warmups, working)
        };

        out.push(active_step(ex, is_warmup, phase_index, phase_count));

        if i == total {
            break;
        }

        let rest_seconds = if is_warmup || ex.is_timed() {
            warmup_rest
        } else {
            working_rest
        };
        if rest_seconds == 0 {
            continue;
        }

        let base = if is_warmup { "Rest (warm-up)" } else { "Rest (working)" };
        let label = if is_warmup && i == warmups {
            format!("{} • {}", base, up_next_preview(ex, working))
        } else {
            base.to_string()
        };

        out.push(rest_step(
            Some(ex),
            label,
            rest_seconds,
            Some((phase_index, phase_count)),
        ));
    }

    out.push(SessionStep::completed("Completed"));

    tracing::debug!("Built {} workout steps for exercise {}", out.len(), ex.id);
    out
}

fn active_step(ex: &Exercise, is_warmup: bool, index: u32, count: u32) -> SessionStep {
    let (kind, duration_seconds) = active_kind(ex);

    let mut parts = vec![
        if is_warmup { "Warm-up" } else { "Working" }.to_string(),
        format!("Set {}/{}", index, count),
        measure_label(ex),
    ];
    if !is_warmup {
        parts.extend(annotations(ex));
    }

    SessionStep {
        id: Uuid::new_v4(),
        kind,
        exercise_id: Some(ex.id.clone()),
        exercise_name: ex.name.clone(),
        label: parts.join(" • "),
        set_index: Some(index),
        set_count: Some(count),
        side: None,
        duration_seconds,
    }
}

fn annotations(ex: &Exercise) -> Vec<String> {
    let mut out = Vec::new();
    if !ex.intensity.trim().is_empty() {
        out.push(format!("Intensity {}", ex.intensity.trim()));
    }
    if !ex.weight.trim().is_empty() {
        out.push(format!("Weight {}", ex.weight.trim()));
    }
    if !ex.tempo.trim().is_empty() {
        out.push(format!("Tempo {}", ex.tempo.trim()));
    }
    out
}

/// Preview of the first working set, shown on the warm-up -> working rest
fn up_next_preview(ex: &Exercise, working: u32) -> String {
    let mut parts = vec![format!("Up next: Working set 1/{}", working)];
    if !ex.weight.trim().is_empty() {
        parts.push(format!("Weight {}", ex.weight.trim()));
    }
    if !ex.tempo.trim().is_empty() {
        parts.push(format!("Tempo {}", ex.tempo.trim()));
    }
    if ex.is_timed() {
        parts.push(measure_label(ex));
    } else {
        parts.push(format!("Reps {}", ex.reps.clamp(1, MAX_REPS)));
    }
    parts.join(" • ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExerciseMode, StepKind};

    fn reps_exercise(reps: u32, warmups: u32, working: u32) -> Exercise {
        let mut ex = Exercise::new("bench", "Bench Press");
        ex.reps = reps;
        ex.warmup_sets = warmups;
        ex.working_sets = working;
        ex.rest_seconds_between_sets = 10;
        ex.rest_seconds_between_sides = 15;
        ex
    }

    #[test]
    fn test_reference_reps_sequence() {
        let steps = build_workout_steps_for_exercise(&reps_exercise(8, 1, 2));

        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0].kind, StepKind::AwaitUserDone);
        assert_eq!(steps[0].label, "Warm-up • Set 1/1 • 8 reps");
        assert_eq!(steps[1].kind, StepKind::RestTimer);
        assert_eq!(steps[1].duration_seconds, Some(10));
        assert_eq!(steps[2].label, "Working • Set 1/2 • 8 reps");
        assert_eq!(steps[3].kind, StepKind::RestTimer);
        assert_eq!(steps[3].duration_seconds, Some(15));
        assert_eq!(steps[4].label, "Working • Set 2/2 • 8 reps");
        assert_eq!(steps[5].kind, StepKind::Completed);
    }

    #[test]
    fn test_active_count_matches_sets() {
        for (warmups, working) in [(0, 1), (2, 3), (4, 0), (1, 5)] {
            let steps = build_workout_steps_for_exercise(&reps_exercise(5, warmups, working));
            let active = steps.iter().filter(|s| s.kind.is_active()).count() as u32;
            assert_eq!(active, warmups + working);
            assert!(steps.last().unwrap().is_completed());
        }
    }

    #[test]
    fn test_warmup_to_working_rest_previews_next_set() {
        let mut ex = reps_exercise(5, 2, 3);
        ex.weight = "100kg".into();
        ex.tempo = "3-1-1".into();

        let steps = build_workout_steps_for_exercise(&ex);

        // W1, rest, W2, rest(preview), ...
        assert_eq!(steps[1].label, "Rest (warm-up)");
        assert_eq!(
            steps[3].label,
            "Rest (warm-up) • Up next: Working set 1/3 • Weight 100kg • Tempo 3-1-1 • Reps 5"
        );
        assert_eq!(
            steps[4].label,
            "Working • Set 1/3 • 5 reps • Weight 100kg • Tempo 3-1-1"
        );
    }

    #[test]
    fn test_time_mode_uses_warmup_rest_for_working_sets() {
        // Time-based sets share one rest value; the working-rest field is ignored.
        let mut ex = reps_exercise(0, 1, 2);
        ex.mode = ExerciseMode::Time;
        ex.duration_seconds = 40;

        let steps = build_workout_steps_for_exercise(&ex);

        assert_eq!(steps[0].kind, StepKind::TimedActive);
        assert_eq!(steps[0].duration_seconds, Some(40));
        let rests: Vec<u32> = steps
            .iter()
            .filter(|s| s.kind == StepKind::RestTimer)
            .filter_map(|s| s.duration_seconds)
            .collect();
        assert_eq!(rests, vec![10, 10]);
    }

    #[test]
    fn test_setup_step_first() {
        let mut ex = reps_exercise(5, 0, 1);
        ex.setup_seconds = Some(900);
        let steps = build_workout_steps_for_exercise(&ex);
        assert_eq!(steps[0].kind, StepKind::SetupTimer);
        assert_eq!(steps[0].duration_seconds, Some(600));
        assert_eq!(steps.len(), 3);
    }

    #[test]
    fn test_zero_rest_is_omitted() {
        let mut ex = reps_exercise(5, 0, 3);
        ex.rest_seconds_between_sides = 0;
        let steps = build_workout_steps_for_exercise(&ex);
        assert!(steps.iter().all(|s| s.kind != StepKind::RestTimer));
        assert_eq!(steps.len(), 4);
    }

    #[test]
    fn test_invalid_exercise_yields_error_sentinel() {
        let steps = build_workout_steps_for_exercise(&reps_exercise(0, 1, 1));
        assert_eq!(steps.len(), 1);
        assert!(steps[0].is_completed());
        assert_eq!(steps[0].label, "Reps must be at least 1.");
        assert_eq!(steps[0].exercise_name, "Bench Press");
    }
}
