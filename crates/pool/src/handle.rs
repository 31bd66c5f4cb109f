use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use fanout_core::Value;
use tokio::sync::oneshot;

use crate::error::TaskError;

/// Sending half a unit uses to resolve a [`TaskHandle`].
pub type TaskSender = oneshot::Sender<Result<Value, TaskError>>;

enum HandleState {
    Pending(oneshot::Receiver<Result<Value, TaskError>>),
    Ready(Option<Result<Value, TaskError>>),
}

/// Pending result of one scheduled task.
///
/// Resolves once the unit finishes, with the value `main` returned or the
/// reason the task failed. Dropping the handle does not stop the unit.
pub struct TaskHandle {
    task_index: usize,
    state: HandleState,
}

impl TaskHandle {
    /// A handle plus the sender that resolves it.
    pub fn channel(task_index: usize) -> (TaskSender, Self) {
        let (tx, rx) = oneshot::channel();
        (
            tx,
            Self {
                task_index,
                state: HandleState::Pending(rx),
            },
        )
    }

    /// A handle that is already resolved with `value`.
    pub fn completed(task_index: usize, value: Value) -> Self {
        Self {
            task_index,
            state: HandleState::Ready(Some(Ok(value))),
        }
    }

    /// A handle that is already resolved with `error`.
    pub fn failed(task_index: usize, error: TaskError) -> Self {
        Self {
            task_index,
            state: HandleState::Ready(Some(Err(error))),
        }
    }

    pub fn task_index(&self) -> usize {
        self.task_index
    }
}

impl Future for TaskHandle {
    type Output = Result<Value, TaskError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let task_index = this.task_index;
        match &mut this.state {
            HandleState::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(TaskError::UnitLost { task_index }))),
            HandleState::Ready(outcome) => {
                Poll::Ready(outcome.take().unwrap_or(Err(TaskError::UnitLost { task_index })))
            }
        }
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            HandleState::Pending(_) => "pending",
            HandleState::Ready(_) => "ready",
        };
        f.debug_struct("TaskHandle")
            .field("task_index", &self.task_index)
            .field("state", &state)
            .finish()
    }
}
