use thiserror::Error;

use fanout_core::FunctionError;
use fanout_pool::TaskError;

#[derive(Debug, Error)]
pub enum ParallelError {
    /// Invalid options. Raised before anything is scheduled.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Function(#[from] FunctionError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("task {task_index} returned {found}, expected an array")]
    UnexpectedTaskResult { task_index: usize, found: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ParallelError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
