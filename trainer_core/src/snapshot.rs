//! Read-only engine view for rendering, and the persisted engine record.

use crate::{SessionState, SessionStep};
use serde::{Deserialize, Serialize};

/// Point-in-time view of a session engine
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    pub state: SessionState,
    pub is_paused: bool,
    pub current_step: Option<SessionStep>,
    pub next_step: Option<SessionStep>,
    pub step_index: usize,
    pub step_count: usize,
    /// `None` when the current step has no countdown
    pub time_remaining_seconds: Option<u32>,
    pub total_elapsed_seconds: u64,
    pub step_elapsed_seconds: u64,
    pub exercise_elapsed_seconds: u64,
}

/// Durable form of an engine, one record per category.
///
/// Missing fields take their defaults so that older or partial records still
/// load; a record that fails to parse is treated as absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedEngine {
    pub state: SessionState,
    pub steps: Vec<SessionStep>,
    pub index: usize,
    pub is_paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_time_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds_when_paused: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<i64>,
    pub elapsed_before_pause_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_started_at_ms: Option<i64>,
    pub step_elapsed_before_pause_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise_started_at_ms: Option<i64>,
    pub exercise_elapsed_before_pause_ms: i64,
}
