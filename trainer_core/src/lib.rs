#![forbid(unsafe_code)]

//! Core domain model and session timing for the trainer.
//!
//! This crate provides:
//! - Domain types (exercises, workouts, day plans, session steps)
//! - Step builders and the exercise validator
//! - The per-category session engine and the workout runner
//! - The global stopwatch
//! - Persistence (key-value storage), configuration and the preset library

pub mod types;
pub mod error;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod engine;
pub mod global_timer;
pub mod logging;
pub mod observer;
pub mod plan;
pub mod runner;
pub mod snapshot;
pub mod steps;
pub mod stopwatch;
pub mod storage;
pub mod validate;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{builtin_presets, PresetLibrary, WorkoutSource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::{SessionEngine, StartOptions};
pub use global_timer::{GlobalTimer, GlobalTimerSnapshot};
pub use observer::{Listeners, Subscription};
pub use plan::{clamp_day, effective_exercise, ExecutionType};
pub use runner::{session_belongs_to, WorkoutRunner};
pub use snapshot::EngineSnapshot;
pub use steps::{build_circuit_steps, build_steps, build_workout_steps_for_exercise};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use validate::{validate_exercise, SetStyle};
