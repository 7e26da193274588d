// crates/server-jobs/src/counters.rs
//! Process-wide job counters for the status endpoint.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::bridge::JobOutcome;

/// Lock-free lifetime counters, updated by execution tasks.
#[derive(Debug, Default)]
pub struct JobCounters {
    started: AtomicU64,
    running: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

/// Point-in-time copy of [`JobCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub started: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

impl JobCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn job_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
        self.running.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn job_finished(&self, outcome: &JobOutcome) {
        self.running.fetch_sub(1, Ordering::Relaxed);
        let counter = match outcome {
            JobOutcome::Completed => &self.completed,
            JobOutcome::Failed(_) => &self.failed,
            JobOutcome::Cancelled => &self.cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            started: self.started.load(Ordering::Relaxed),
            running: self.running.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}
