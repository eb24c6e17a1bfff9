//! Shared health state for the /health endpoint.
//! Updated by the pipeline, read by the API.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// True while a pipeline run is in progress.
    pub run_in_progress: AtomicBool,
    /// Unix seconds of the last finished run (0 = none).
    pub last_run_at_secs: AtomicU64,
    pub runs_completed: AtomicU64,
    pub runs_failed: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_run_in_progress(&self, v: bool) {
        self.run_in_progress.store(v, Ordering::Relaxed);
    }

    pub fn record_success(&self, finished_at_secs: u64) {
        self.last_run_at_secs.store(finished_at_secs, Ordering::Relaxed);
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn run_in_progress(&self) -> bool {
        self.run_in_progress.load(Ordering::Relaxed)
    }

    pub fn last_run_at_secs(&self) -> u64 {
        self.last_run_at_secs.load(Ordering::Relaxed)
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }
}
