//! Multi-day plan programming merged into base exercises.

use crate::{DayEntry, Exercise, Workout, WorkoutKind};
use serde::{Deserialize, Serialize};

pub const MAX_PLAN_DAYS: u32 = 4;

/// How a workout is being executed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionType {
    #[default]
    Individual,
    Plan,
}

impl ExecutionType {
    /// Plan execution only applies to plan-kind workouts
    pub fn for_workout(workout: &Workout, requested: ExecutionType) -> Self {
        match (requested, workout.kind) {
            (ExecutionType::Plan, WorkoutKind::Plan) => ExecutionType::Plan,
            _ => ExecutionType::Individual,
        }
    }
}

/// Clamp a day number into `1..=repeat_count` (at most four days)
pub fn clamp_day(day: u32, repeat_count: u32) -> u32 {
    let max_days = repeat_count.clamp(1, MAX_PLAN_DAYS);
    day.clamp(1, max_days)
}

/// The exercise as it should be executed today.
///
/// Individual execution, or a day with no entry for this exercise, returns
/// the base exercise unchanged.
pub fn effective_exercise(
    exercise: &Exercise,
    execution: ExecutionType,
    day_entries: Option<&[DayEntry]>,
) -> Exercise {
    if execution != ExecutionType::Plan {
        return exercise.clone();
    }

    let Some(entry) = day_entries
        .unwrap_or_default()
        .iter()
        .find(|e| e.exercise_id == exercise.id)
    else {
        return exercise.clone();
    };

    let name = if entry.exercise_name.trim().is_empty() {
        exercise.name.clone()
    } else {
        entry.exercise_name.clone()
    };

    Exercise {
        name,
        warmup_sets: entry.warmup_sets,
        working_sets: entry.sets,
        sets: entry.warmup_sets.saturating_add(entry.sets).max(1),
        reps: entry.reps,
        intensity: entry.intensity.clone(),
        weight: entry.weight.clone(),
        tempo: entry.tempo.clone(),
        rest_seconds_between_sets: entry.warmup_rest_seconds,
        rest_seconds_between_sides: entry.working_rest_seconds,
        ..exercise.clone()
    }
}

/// Resolve the effective exercise at `position` for a workout and day
pub fn effective_exercise_at(
    workout: &Workout,
    position: usize,
    execution: ExecutionType,
    day: u32,
) -> Option<Exercise> {
    let exercise = workout.exercises.get(position)?;
    let day = clamp_day(day, workout.repeat_count);
    let entries = workout.day_plan(day).map(|p| p.entries.as_slice());
    Some(effective_exercise(exercise, execution, entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Category, DayPlan};

    fn entry(exercise_id: &str) -> DayEntry {
        DayEntry {
            exercise_id: exercise_id.into(),
            exercise_name: String::new(),
            warmup_sets: 1,
            sets: 4,
            reps: 6,
            intensity: "RPE 8".into(),
            weight: "80kg".into(),
            tempo: "2-0-1".into(),
            warmup_rest_seconds: 60,
            working_rest_seconds: 120,
        }
    }

    fn plan_workout() -> Workout {
        let mut squat = Exercise::new("squat", "Squat");
        squat.warmup_sets = 2;
        squat.working_sets = 3;
        Workout {
            id: "plan".into(),
            name: "Strength".into(),
            category: Category::Workout,
            kind: WorkoutKind::Plan,
            repeat_count: 2,
            day_plans: vec![DayPlan {
                day: 2,
                entries: vec![entry("squat")],
            }],
            rest_between_exercises_seconds: 0,
            exercises: vec![squat],
        }
    }

    #[test]
    fn test_clamp_day() {
        assert_eq!(clamp_day(0, 3), 1);
        assert_eq!(clamp_day(2, 3), 2);
        assert_eq!(clamp_day(9, 3), 3);
        assert_eq!(clamp_day(3, 0), 1);
        assert_eq!(clamp_day(7, 10), 4);
    }

    #[test]
    fn test_plan_entry_overrides_programming() {
        let workout = plan_workout();
        let ex = effective_exercise_at(&workout, 0, ExecutionType::Plan, 2).unwrap();

        assert_eq!(ex.name, "Squat");
        assert_eq!(ex.warmup_sets, 1);
        assert_eq!(ex.working_sets, 4);
        assert_eq!(ex.sets, 5);
        assert_eq!(ex.reps, 6);
        assert_eq!(ex.weight, "80kg");
        assert_eq!(ex.rest_seconds_between_sets, 60);
        assert_eq!(ex.rest_seconds_between_sides, 120);
    }

    #[test]
    fn test_day_without_entry_keeps_base() {
        let workout = plan_workout();
        let ex = effective_exercise_at(&workout, 0, ExecutionType::Plan, 1).unwrap();
        assert_eq!(ex, workout.exercises[0]);
    }

    #[test]
    fn test_individual_execution_ignores_plan() {
        let workout = plan_workout();
        let ex = effective_exercise_at(&workout, 0, ExecutionType::Individual, 2).unwrap();
        assert_eq!(ex.working_sets, 3);
    }

    #[test]
    fn test_entry_name_overrides_when_present() {
        let workout = plan_workout();
        let mut e = entry("squat");
        e.exercise_name = "Paused Squat".into();
        let ex = effective_exercise(&workout.exercises[0], ExecutionType::Plan, Some(&[e]));
        assert_eq!(ex.name, "Paused Squat");
    }

    #[test]
    fn test_oversized_entry_sets_saturate() {
        let workout = plan_workout();
        let mut e = entry("squat");
        e.warmup_sets = u32::MAX;
        e.sets = 1;
        let ex = effective_exercise(&workout.exercises[0], ExecutionType::Plan, Some(&[e]));
        assert_eq!(ex.sets, u32::MAX);
        assert_eq!(ex.warmup_sets, u32::MAX);
    }

    #[test]
    fn test_execution_type_requires_plan_kind() {
        let mut workout = plan_workout();
        assert_eq!(
            ExecutionType::for_workout(&workout, ExecutionType::Plan),
            ExecutionType::Plan
        );
        workout.kind = WorkoutKind::Individual;
        assert_eq!(
            ExecutionType::for_workout(&workout, ExecutionType::Plan),
            ExecutionType::Individual
        );
    }
}
