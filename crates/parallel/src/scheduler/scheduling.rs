use serde::{Deserialize, Serialize};

use crate::error::ParallelError;
use crate::options::DefaultParallelOptions;

/// How a job is split: `number_of_tasks` slices of at most `values_per_task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskScheduling {
    pub number_of_tasks: usize,
    pub values_per_task: usize,
}

/// The option subset that drives task sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingConstraints {
    pub max_concurrency_level: usize,
    pub min_values_per_worker: Option<usize>,
    pub max_values_per_worker: Option<usize>,
}

impl SchedulingConstraints {
    pub fn new(max_concurrency_level: usize) -> Self {
        Self {
            max_concurrency_level,
            min_values_per_worker: None,
            max_values_per_worker: None,
        }
    }
}

impl From<&DefaultParallelOptions> for SchedulingConstraints {
    fn from(options: &DefaultParallelOptions) -> Self {
        Self {
            max_concurrency_level: options.max_concurrency_level,
            min_values_per_worker: options.min_values_per_worker,
            max_values_per_worker: options.max_values_per_worker,
        }
    }
}

/// Split `total` values into tasks.
///
/// Spreads the values evenly over `max_concurrency_level` tasks, then clamps
/// the per-task count into `[min_values_per_worker, max_values_per_worker]`
/// and never above `total`. The last task may be short; the remainder is not
/// redistributed.
pub fn compute_scheduling(
    total: usize,
    constraints: &SchedulingConstraints,
) -> Result<TaskScheduling, ParallelError> {
    if total == 0 {
        return Ok(TaskScheduling {
            number_of_tasks: 0,
            values_per_task: 0,
        });
    }
    if constraints.max_concurrency_level == 0 {
        return Err(ParallelError::configuration(
            "max_concurrency_level must be at least 1",
        ));
    }

    let mut values_per_task = total.div_ceil(constraints.max_concurrency_level);
    if let Some(max) = constraints.max_values_per_worker {
        values_per_task = values_per_task.min(max);
    }
    if let Some(min) = constraints.min_values_per_worker {
        values_per_task = values_per_task.max(min);
    }
    values_per_task = values_per_task.min(total);

    if values_per_task == 0 {
        return Err(ParallelError::configuration(
            "max_values_per_worker must be at least 1",
        ));
    }

    Ok(TaskScheduling {
        number_of_tasks: total.div_ceil(values_per_task),
        values_per_task,
    })
}
