//! Preset library: the workouts available to each category.
//!
//! Presets are read from a JSON file when one exists; otherwise the built-in
//! presets below are used. The library is read-only.

use crate::steps::{MAX_WARMUP_SETS, MAX_WORKING_SETS};
use crate::types::*;
use crate::{Error, Result};
use fs2::FileExt;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Cached built-in presets - built once and reused across all operations
static BUILTIN_PRESETS: Lazy<Vec<Workout>> = Lazy::new(build_builtin_presets);

/// Get a reference to the cached built-in presets
pub fn builtin_presets() -> &'static [Workout] {
    &BUILTIN_PRESETS
}

/// Read-only access to workouts by id and by category
pub trait WorkoutSource {
    fn workout(&self, id: &str) -> Option<&Workout>;
    fn workouts_in(&self, category: Category) -> Vec<&Workout>;

    /// Like `workout`, but a missing id is an error
    fn require(&self, id: &str) -> Result<&Workout> {
        self.workout(id)
            .ok_or_else(|| Error::NotFound(format!("preset '{}'", id)))
    }
}

/// On-disk preset file layout
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PresetFile {
    Versioned { version: u32, workouts: Vec<Workout> },
    Bare(Vec<Workout>),
}

#[derive(Clone, Debug, Default)]
pub struct PresetLibrary {
    workouts: Vec<Workout>,
}

impl PresetLibrary {
    pub fn new(workouts: Vec<Workout>) -> Self {
        Self { workouts }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_presets().to_vec())
    }

    /// Load presets from `path`.
    ///
    /// A missing file yields the built-in presets, as does a file that does
    /// not parse (with a warning). Other read failures are errors.
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No preset file at {:?}, using built-in presets", path);
                return Ok(Self::builtin());
            }
            Err(e) => return Err(e.into()),
        };

        file.lock_shared()?;
        let mut contents = String::new();
        let read = file.read_to_string(&mut contents);
        file.unlock()?;
        read?;

        match serde_json::from_str::<PresetFile>(&contents) {
            Ok(PresetFile::Versioned { version, workouts }) => {
                if version != 1 {
                    tracing::warn!("Preset file {:?} has unknown version {}", path, version);
                }
                tracing::info!("Loaded {} presets from {:?}", workouts.len(), path);
                Ok(Self::new(workouts))
            }
            Ok(PresetFile::Bare(workouts)) => {
                tracing::info!("Loaded {} presets from {:?}", workouts.len(), path);
                Ok(Self::new(workouts))
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse preset file {:?}: {}. Using built-in presets.",
                    path,
                    e
                );
                Ok(Self::builtin())
            }
        }
    }

    pub fn workouts(&self) -> &[Workout] {
        &self.workouts
    }

    /// Human-readable problems with the loaded presets; empty when sound
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for workout in &self.workouts {
            if workout.id.trim().is_empty() {
                problems.push(format!("Preset '{}' has an empty id", workout.name));
            } else if !seen.insert(workout.id.as_str()) {
                problems.push(format!("Duplicate preset id '{}'", workout.id));
            }
            if workout.name.trim().is_empty() {
                problems.push(format!("Preset '{}' has an empty name", workout.id));
            }

            let mut exercise_ids = HashSet::new();
            for ex in &workout.exercises {
                if ex.id.trim().is_empty() {
                    problems.push(format!(
                        "Preset '{}': exercise '{}' has an empty id",
                        workout.id, ex.name
                    ));
                } else if !exercise_ids.insert(ex.id.as_str()) {
                    problems.push(format!(
                        "Preset '{}': duplicate exercise id '{}'",
                        workout.id, ex.id
                    ));
                }
                if ex.name.trim().is_empty() {
                    problems.push(format!(
                        "Preset '{}': exercise '{}' has an empty name",
                        workout.id, ex.id
                    ));
                }
            }

            let max_day = workout.repeat_count.max(1);
            for plan in &workout.day_plans {
                if plan.day < 1 || plan.day > max_day {
                    problems.push(format!(
                        "Preset '{}': day {} is outside 1..={}",
                        workout.id, plan.day, max_day
                    ));
                }
                for entry in &plan.entries {
                    if workout.exercise(&entry.exercise_id).is_none() {
                        problems.push(format!(
                            "Preset '{}': day {} references unknown exercise '{}'",
                            workout.id, plan.day, entry.exercise_id
                        ));
                    }
                    if entry.warmup_sets > MAX_WARMUP_SETS || entry.sets > MAX_WORKING_SETS {
                        problems.push(format!(
                            "Preset '{}': day {} programs {} warm-up + {} working sets for '{}' (limit {} + {})",
                            workout.id,
                            plan.day,
                            entry.warmup_sets,
                            entry.sets,
                            entry.exercise_id,
                            MAX_WARMUP_SETS,
                            MAX_WORKING_SETS
                        ));
                    }
                }
            }
        }

        problems
    }
}

impl WorkoutSource for PresetLibrary {
    fn workout(&self, id: &str) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id == id)
    }

    fn workouts_in(&self, category: Category) -> Vec<&Workout> {
        self.workouts
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }
}

/// Builds the built-in presets, one per category
///
/// **Note**: For production use, prefer `builtin_presets()` which returns a
/// cached reference.
pub fn build_builtin_presets() -> Vec<Workout> {
    vec![
        // ====================================================================
        // Pre-workout mobility
        // ====================================================================
        Workout {
            id: "morning_mobility".into(),
            name: "Morning Mobility".into(),
            category: Category::PreMobility,
            kind: WorkoutKind::Individual,
            repeat_count: 1,
            day_plans: vec![],
            rest_between_exercises_seconds: 15,
            exercises: vec![
                Exercise {
                    mode: ExerciseMode::Time,
                    duration_seconds: 45,
                    sets: 2,
                    rest_seconds_between_sets: 10,
                    setup_seconds: Some(5),
                    ..Exercise::new("cat_cow", "Cat-Cow")
                },
                Exercise {
                    mode: ExerciseMode::Time,
                    duration_seconds: 40,
                    per_side: true,
                    rest_seconds_between_sides: 5,
                    ..Exercise::new("hip_90_90", "90/90 Hip Switch")
                },
                Exercise {
                    reps: 5,
                    per_side: true,
                    ..Exercise::new("worlds_greatest", "World's Greatest Stretch")
                },
            ],
        },
        // ====================================================================
        // Strength workout (two-day plan)
        // ====================================================================
        Workout {
            id: "strength_block".into(),
            name: "Strength Block".into(),
            category: Category::Workout,
            kind: WorkoutKind::Plan,
            repeat_count: 2,
            day_plans: vec![
                DayPlan {
                    day: 1,
                    entries: vec![DayEntry {
                        exercise_id: "back_squat".into(),
                        exercise_name: String::new(),
                        warmup_sets: 2,
                        sets: 3,
                        reps: 5,
                        intensity: "RPE 7".into(),
                        weight: "100kg".into(),
                        tempo: "3-1-1".into(),
                        warmup_rest_seconds: 60,
                        working_rest_seconds: 180,
                    }],
                },
                DayPlan {
                    day: 2,
                    entries: vec![DayEntry {
                        exercise_id: "back_squat".into(),
                        exercise_name: "Paused Squat".into(),
                        warmup_sets: 1,
                        sets: 4,
                        reps: 3,
                        intensity: "RPE 8".into(),
                        weight: "90kg".into(),
                        tempo: "2-2-1".into(),
                        warmup_rest_seconds: 60,
                        working_rest_seconds: 150,
                    }],
                },
            ],
            rest_between_exercises_seconds: 0,
            exercises: vec![
                Exercise {
                    reps: 5,
                    sets: 5,
                    warmup_sets: 2,
                    working_sets: 3,
                    rest_seconds_between_sets: 60,
                    rest_seconds_between_sides: 180,
                    weight: "100kg".into(),
                    ..Exercise::new("back_squat", "Back Squat")
                },
                Exercise {
                    reps: 8,
                    sets: 4,
                    warmup_sets: 1,
                    working_sets: 3,
                    rest_seconds_between_sets: 45,
                    rest_seconds_between_sides: 120,
                    weight: "60kg".into(),
                    setup_seconds: Some(15),
                    ..Exercise::new("bench_press", "Bench Press")
                },
                Exercise {
                    mode: ExerciseMode::Time,
                    duration_seconds: 45,
                    sets: 3,
                    working_sets: 3,
                    rest_seconds_between_sets: 30,
                    ..Exercise::new("plank", "Plank")
                },
            ],
        },
        // ====================================================================
        // Post-workout mobility
        // ====================================================================
        Workout {
            id: "cooldown".into(),
            name: "Cooldown".into(),
            category: Category::PostMobility,
            kind: WorkoutKind::Individual,
            repeat_count: 1,
            day_plans: vec![],
            rest_between_exercises_seconds: 10,
            exercises: vec![
                Exercise {
                    mode: ExerciseMode::Time,
                    duration_seconds: 30,
                    per_side: true,
                    ..Exercise::new("couch_stretch", "Couch Stretch")
                },
                Exercise {
                    mode: ExerciseMode::Time,
                    duration_seconds: 60,
                    ..Exercise::new("childs_pose", "Child's Pose")
                },
            ],
        },
    ]
}
