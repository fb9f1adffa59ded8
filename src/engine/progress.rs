// src/engine/progress.rs
//
// Monotonic progress tracking over a known job total. Counters only ever
// move forward; completed + errored never exceeds the total.

use crate::engine::planner::JobStatus;
use crate::engine::scheduler::{JobObserver, JobUpdate};
use parking_lot::Mutex;
use tracing::debug;

/// Point-in-time view of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub completed: usize,
    pub errored: usize,
    /// Human-readable note from the most recent transition.
    pub message: String,
}

impl ProgressSnapshot {
    /// Jobs that have reached a terminal state.
    pub fn finished(&self) -> usize {
        self.completed + self.errored
    }

    pub fn is_done(&self) -> bool {
        self.finished() >= self.total
    }
}

/// Thread-safe progress accumulator fed by scheduler status events.
pub struct ProgressReporter {
    state: Mutex<ProgressSnapshot>,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            state: Mutex::new(ProgressSnapshot {
                total,
                ..ProgressSnapshot::default()
            }),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.state.lock().clone()
    }
}

impl JobObserver for ProgressReporter {
    fn on_status(&self, update: &JobUpdate) {
        let mut state = self.state.lock();
        match update.status {
            JobStatus::Done if state.finished() < state.total => state.completed += 1,
            JobStatus::Error if state.finished() < state.total => state.errored += 1,
            _ => {}
        }
        state.message = update.message.clone();
        debug!(
            completed = state.completed,
            errored = state.errored,
            total = state.total,
            "progress"
        );
    }
}
