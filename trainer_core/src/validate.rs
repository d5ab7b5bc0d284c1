//! Executability checks for exercise definitions.

use crate::{Error, Exercise, Result};

/// Which set convention an exercise is executed under
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetStyle {
    /// Warm-up + working sets (single-exercise workout sessions)
    Workout,
    /// Legacy flat set count (mobility circuits)
    Circuit,
}

/// Effective total sets under the given convention
pub fn effective_sets(ex: &Exercise, style: SetStyle) -> u32 {
    match style {
        SetStyle::Workout => ex.warmup_sets.saturating_add(ex.working_sets),
        SetStyle::Circuit => ex.sets,
    }
}

/// Check that an exercise can be run.
///
/// Only the measure relevant to the exercise mode is checked.
pub fn validate_exercise(ex: &Exercise, style: SetStyle) -> Result<()> {
    if ex.is_timed() {
        if ex.duration_seconds < 1 {
            return Err(Error::InvalidExercise(
                "Duration must be at least 1 second.".into(),
            ));
        }
    } else if ex.reps < 1 {
        return Err(Error::InvalidExercise("Reps must be at least 1.".into()));
    }

    if effective_sets(ex, style) < 1 {
        let message = match style {
            SetStyle::Workout => "Warm-up sets + working sets must be at least 1.",
            SetStyle::Circuit => "Sets must be at least 1.",
        };
        return Err(Error::InvalidExercise(message.into()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExerciseMode;

    fn workout_exercise() -> Exercise {
        let mut ex = Exercise::new("squat", "Back Squat");
        ex.reps = 5;
        ex.warmup_sets = 2;
        ex.working_sets = 3;
        ex
    }

    #[test]
    fn test_valid_exercise_passes() {
        assert!(validate_exercise(&workout_exercise(), SetStyle::Workout).is_ok());
    }

    #[test]
    fn test_zero_reps_rejected() {
        let mut ex = workout_exercise();
        ex.reps = 0;
        let err = validate_exercise(&ex, SetStyle::Workout).unwrap_err();
        assert_eq!(err.to_string(), "Reps must be at least 1.");
    }

    #[test]
    fn test_zero_duration_rejected_only_in_time_mode() {
        let mut ex = workout_exercise();
        ex.duration_seconds = 0;
        assert!(validate_exercise(&ex, SetStyle::Workout).is_ok());

        ex.mode = ExerciseMode::Time;
        ex.reps = 0;
        let err = validate_exercise(&ex, SetStyle::Workout).unwrap_err();
        assert_eq!(err.to_string(), "Duration must be at least 1 second.");

        ex.duration_seconds = 30;
        assert!(validate_exercise(&ex, SetStyle::Workout).is_ok());
    }

    #[test]
    fn test_no_sets_rejected() {
        let mut ex = workout_exercise();
        ex.warmup_sets = 0;
        ex.working_sets = 0;
        let err = validate_exercise(&ex, SetStyle::Workout).unwrap_err();
        assert!(matches!(err, Error::InvalidExercise(_)));
        assert!(err.to_string().contains("Warm-up sets + working sets"));
    }

    #[test]
    fn test_warmup_only_is_executable() {
        let mut ex = workout_exercise();
        ex.working_sets = 0;
        assert!(validate_exercise(&ex, SetStyle::Workout).is_ok());
    }

    #[test]
    fn test_circuit_style_uses_flat_sets() {
        let mut ex = Exercise::new("cars", "Hip CARs");
        ex.sets = 0;
        assert!(validate_exercise(&ex, SetStyle::Circuit).is_err());
        ex.sets = 2;
        assert!(validate_exercise(&ex, SetStyle::Circuit).is_ok());
    }
}
