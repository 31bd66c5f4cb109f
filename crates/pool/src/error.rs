use serde::{Deserialize, Serialize};
use thiserror::Error;

use fanout_core::{FunctionError, FunctionId};

/// Failure of a single task, as delivered through its [`TaskHandle`].
///
/// Crosses the unit boundary, so it is serializable and carries messages
/// rather than source errors.
///
/// [`TaskHandle`]: crate::TaskHandle
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum TaskError {
    /// The unit does not have a function the task depends on.
    #[error("task {task_index}: unresolved function reference {function_id}")]
    UnresolvedFunctionReference {
        task_index: usize,
        function_id: FunctionId,
    },

    /// Invoking `main` raised an error on the unit.
    #[error("task {task_index} failed: {message}")]
    Execution { task_index: usize, message: String },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    /// The unit went away without reporting an outcome.
    #[error("task {task_index}: unit terminated without a result")]
    UnitLost { task_index: usize },

    #[error("pool error: {0}")]
    Pool(String),
}

impl TaskError {
    /// Classify an error raised while running task `task_index`.
    pub fn from_function_error(task_index: usize, err: FunctionError) -> Self {
        match err {
            FunctionError::UnresolvedFunctionReference(function_id) => {
                Self::UnresolvedFunctionReference {
                    task_index,
                    function_id,
                }
            }
            other => Self::Execution {
                task_index,
                message: other.to_string(),
            },
        }
    }
}

impl From<rmp_serde::encode::Error> for TaskError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Encoding(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for TaskError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Decoding(err.to_string())
    }
}
