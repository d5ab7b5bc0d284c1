//! Free-running global stopwatch, independent of any session.

use crate::clock::Clock;
use crate::observer::{Listeners, Subscription};
use crate::stopwatch::{Stopwatch, MAX_ELAPSED_MS};
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const GLOBAL_TIMER_KEY: &str = "globalTimer.v1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalTimerSnapshot {
    pub is_running: bool,
    pub elapsed_seconds: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PersistedTimer {
    is_running: bool,
    elapsed_before_ms: i64,
    started_at_ms: Option<i64>,
}

pub struct GlobalTimer {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    stopwatch: Stopwatch,
    listeners: Listeners<GlobalTimerSnapshot>,
}

impl GlobalTimer {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let mut timer = Self {
            store,
            clock,
            stopwatch: Stopwatch::default(),
            listeners: Listeners::default(),
        };
        timer.restore();
        timer
    }

    pub fn subscribe(
        &self,
        listener: impl Fn(&GlobalTimerSnapshot) + 'static,
    ) -> Subscription<GlobalTimerSnapshot> {
        self.listeners.subscribe(listener)
    }

    pub fn snapshot(&self) -> GlobalTimerSnapshot {
        GlobalTimerSnapshot {
            is_running: self.stopwatch.is_running(),
            elapsed_seconds: self.stopwatch.elapsed_seconds(self.clock.now_ms()),
        }
    }

    pub fn start(&mut self) {
        if self.stopwatch.is_running() {
            return;
        }
        self.stopwatch.resume(self.clock.now_ms());
        tracing::debug!("Global stopwatch started");
        self.persist();
        self.notify();
    }

    pub fn pause(&mut self) {
        if !self.stopwatch.is_running() {
            return;
        }
        self.stopwatch.freeze(self.clock.now_ms());
        tracing::debug!("Global stopwatch paused");
        self.persist();
        self.notify();
    }

    pub fn reset(&mut self) {
        self.stopwatch.clear();
        if let Err(e) = self.store.remove(GLOBAL_TIMER_KEY) {
            tracing::warn!("Failed to erase {}: {}", GLOBAL_TIMER_KEY, e);
        }
        tracing::info!("Global stopwatch reset");
        self.notify();
    }

    /// Periodic refresh; only notifies while running
    pub fn tick(&self) {
        if self.stopwatch.is_running() {
            self.notify();
        }
    }

    fn notify(&self) {
        if !self.listeners.is_empty() {
            self.listeners.emit(&self.snapshot());
        }
    }

    fn persist(&self) {
        let record = PersistedTimer {
            is_running: self.stopwatch.is_running(),
            elapsed_before_ms: self.stopwatch.accumulated_ms,
            started_at_ms: self.stopwatch.started_at_ms,
        };
        let result = serde_json::to_string(&record)
            .map_err(crate::Error::from)
            .and_then(|json| self.store.set(GLOBAL_TIMER_KEY, &json));
        if let Err(e) = result {
            tracing::warn!("Failed to persist {}: {}", GLOBAL_TIMER_KEY, e);
        }
    }

    fn restore(&mut self) {
        let raw = match self.store.get(GLOBAL_TIMER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!("Unable to read {}: {}", GLOBAL_TIMER_KEY, e);
                return;
            }
        };
        let record: PersistedTimer = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", GLOBAL_TIMER_KEY, e);
                return;
            }
        };

        let now = self.clock.now_ms();
        let start_ok = record.started_at_ms.map_or(true, |ms| ms >= 0);
        if !(0..=MAX_ELAPSED_MS).contains(&record.elapsed_before_ms) || !start_ok {
            tracing::warn!("Discarding {}: values out of range", GLOBAL_TIMER_KEY);
            return;
        }

        self.stopwatch.accumulated_ms = record.elapsed_before_ms;
        self.stopwatch.started_at_ms = record
            .is_running
            .then(|| record.started_at_ms.unwrap_or(now).min(now));
    }
}
