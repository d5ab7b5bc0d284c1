//! Core domain types for the trainer.
//!
//! This module defines the fundamental types used throughout the system:
//! - Categories, exercises and workouts (presets)
//! - Multi-day plan overrides
//! - Session steps and coarse engine states

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Preset Types
// ============================================================================

/// The category ("tab") a preset belongs to.
///
/// Each category owns exactly one session engine for the lifetime of the
/// application.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    PreMobility,
    Workout,
    PostMobility,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::PreMobility,
        Category::Workout,
        Category::PostMobility,
    ];

    /// Stable identifier used in storage keys and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::PreMobility => "preMobility",
            Category::Workout => "workout",
            Category::PostMobility => "postMobility",
        }
    }

    /// Parse a category name, accepting a few spellings
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "premobility" | "pre" => Some(Category::PreMobility),
            "workout" => Some(Category::Workout),
            "postmobility" | "post" => Some(Category::PostMobility),
            _ => None,
        }
    }

    /// Mobility categories run multi-exercise circuits
    pub fn is_circuit(&self) -> bool {
        !matches!(self, Category::Workout)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an exercise set is measured
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ExerciseMode {
    /// Duration-based: the set is a countdown
    Time,
    /// Count-based: the set waits for the user to confirm
    #[default]
    Reps,
}

/// A single exercise definition
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mode: ExerciseMode,
    #[serde(default)]
    pub duration_seconds: u32,
    #[serde(default)]
    pub reps: u32,
    /// Legacy flat set count, used by circuits
    #[serde(default = "default_sets")]
    pub sets: u32,
    #[serde(default)]
    pub per_side: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_seconds: Option<u32>,
    #[serde(default)]
    pub rest_seconds_between_sets: u32,
    #[serde(default)]
    pub rest_seconds_between_sides: u32,
    #[serde(default)]
    pub warmup_sets: u32,
    #[serde(default)]
    pub working_sets: u32,
    #[serde(default)]
    pub intensity: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub tempo: String,
}

fn default_sets() -> u32 {
    1
}

impl Exercise {
    /// A reps-mode exercise with every optional field at its neutral value
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mode: ExerciseMode::Reps,
            duration_seconds: 30,
            reps: 10,
            sets: 1,
            per_side: false,
            setup_seconds: None,
            rest_seconds_between_sets: 0,
            rest_seconds_between_sides: 0,
            warmup_sets: 0,
            working_sets: 0,
            intensity: String::new(),
            weight: String::new(),
            tempo: String::new(),
        }
    }

    pub fn is_timed(&self) -> bool {
        self.mode == ExerciseMode::Time
    }
}

/// Whether a workout is a single session or a multi-day plan
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum WorkoutKind {
    #[default]
    Individual,
    Plan,
}

/// Per-exercise programming override for one day of a plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    pub exercise_id: String,
    #[serde(default)]
    pub exercise_name: String,
    #[serde(default)]
    pub warmup_sets: u32,
    /// Working sets for the day
    #[serde(default)]
    pub sets: u32,
    #[serde(default)]
    pub reps: u32,
    #[serde(default)]
    pub intensity: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub tempo: String,
    #[serde(default)]
    pub warmup_rest_seconds: u32,
    #[serde(default)]
    pub working_rest_seconds: u32,
}

/// Programming for one day of a plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DayPlan {
    pub day: u32,
    #[serde(default)]
    pub entries: Vec<DayEntry>,
}

/// A preset: an ordered list of exercises for one category
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub kind: WorkoutKind,
    /// Number of plan days, 1..=4
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,
    #[serde(default)]
    pub day_plans: Vec<DayPlan>,
    /// Circuit categories only
    #[serde(default)]
    pub rest_between_exercises_seconds: u32,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

fn default_repeat_count() -> u32 {
    1
}

impl Workout {
    pub fn exercise(&self, exercise_id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == exercise_id)
    }

    pub fn exercise_position(&self, exercise_id: &str) -> Option<usize> {
        self.exercises.iter().position(|e| e.id == exercise_id)
    }

    pub fn day_plan(&self, day: u32) -> Option<&DayPlan> {
        self.day_plans.iter().find(|p| p.day == day)
    }
}

// ============================================================================
// Session Step Types
// ============================================================================

/// Kind of a session step
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    SetupTimer,
    TimedActive,
    AwaitUserDone,
    RestTimer,
    /// Terminal sentinel, always last
    Completed,
}

impl StepKind {
    /// Coarse engine state for a step of this kind; `None` for the sentinel
    pub fn session_state(&self) -> Option<SessionState> {
        match self {
            StepKind::SetupTimer => Some(SessionState::Setup),
            StepKind::TimedActive | StepKind::AwaitUserDone => Some(SessionState::ActiveSet),
            StepKind::RestTimer => Some(SessionState::Resting),
            StepKind::Completed => None,
        }
    }

    /// Whether steps of this kind carry a countdown
    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            StepKind::SetupTimer | StepKind::TimedActive | StepKind::RestTimer
        )
    }

    pub fn is_active(&self) -> bool {
        matches!(self, StepKind::TimedActive | StepKind::AwaitUserDone)
    }
}

/// Side annotation for per-side exercises
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// One atomic unit of a session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionStep {
    pub id: Uuid,
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<String>,
    #[serde(default)]
    pub exercise_name: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// Present only for setup, timed-active and rest steps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
}

impl SessionStep {
    /// The terminal sentinel
    pub fn completed(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: StepKind::Completed,
            exercise_id: None,
            exercise_name: String::new(),
            label: label.into(),
            set_index: None,
            set_count: None,
            side: None,
            duration_seconds: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.kind == StepKind::Completed
    }
}

// ============================================================================
// Engine State Types
// ============================================================================

/// Coarse state of a session engine
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Idle,
    Setup,
    ActiveSet,
    Resting,
    /// Step-entry scaffolding, resolved immediately
    Transition,
    Completed,
}

impl SessionState {
    /// Idle and completed freeze every clock and reject most controls
    pub fn is_dormant(&self) -> bool {
        matches!(self, SessionState::Idle | SessionState::Completed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Setup => "setup",
            SessionState::ActiveSet => "activeSet",
            SessionState::Resting => "resting",
            SessionState::Transition => "transition",
            SessionState::Completed => "completed",
        };
        f.write_str(s)
    }
}
