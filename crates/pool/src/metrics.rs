use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Pool operational counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolMetrics {
    pub tasks_scheduled: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    /// Units busy at the time of the snapshot.
    pub active_units: usize,
    /// Busy units / total units (0.0 - 1.0).
    pub unit_utilization: f64,
    /// Rolling average over finished tasks, failed ones included.
    pub avg_task_duration: Duration,
    pub last_finished: Option<DateTime<Utc>>,
}

impl PoolMetrics {
    pub fn record_scheduled(&mut self) {
        self.tasks_scheduled += 1;
    }

    /// Record a task that finished, successfully or not.
    pub fn record_finished(&mut self, duration: Duration, success: bool) {
        if success {
            self.tasks_completed += 1;
        } else {
            self.tasks_failed += 1;
        }
        self.last_finished = Some(Utc::now());

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let count = self.tasks_finished();
        self.avg_task_duration = if count == 1 {
            duration
        } else {
            let prev_nanos = self.avg_task_duration.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
    }

    pub fn tasks_finished(&self) -> u64 {
        self.tasks_completed + self.tasks_failed
    }

    /// Scheduled but not finished yet, queued or running.
    pub fn tasks_in_flight(&self) -> u64 {
        self.tasks_scheduled.saturating_sub(self.tasks_finished())
    }
}
