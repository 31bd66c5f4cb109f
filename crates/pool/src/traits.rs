use std::sync::Arc;

use fanout_core::{FunctionCall, FunctionCallSerializer, FunctionError, TaskDefinition};

use crate::handle::TaskHandle;

/// Dispatches task definitions onto isolated units.
///
/// How many units exist, how tasks queue when all are busy and how crashed
/// units are recovered is up to the implementation. Callers rely only on
/// one definition producing exactly one handle.
pub trait ThreadPool: Send + Sync {
    /// Queue `definition` and return its pending handle immediately.
    fn schedule_task(&self, definition: TaskDefinition) -> TaskHandle;

    /// A fresh serializer bound to the functions this pool's units can
    /// resolve. Never share one between scheduling passes.
    fn create_function_serializer(&self) -> FunctionCallSerializer;

    /// Run a single function call as its own task.
    fn schedule(&self, call: &FunctionCall) -> Result<TaskHandle, FunctionError> {
        let mut serializer = self.create_function_serializer();
        let main = serializer.serialize_function_call(call)?;
        let definition = TaskDefinition {
            main,
            task_index: 0,
            values_per_task: 0,
            used_function_ids: serializer.serialized_function_ids().to_vec(),
        };
        Ok(self.schedule_task(definition))
    }
}

/// Blanket implementation so `Arc<dyn ThreadPool>` can be used directly.
impl<T: ThreadPool + ?Sized> ThreadPool for Arc<T> {
    fn schedule_task(&self, definition: TaskDefinition) -> TaskHandle {
        (**self).schedule_task(definition)
    }

    fn create_function_serializer(&self) -> FunctionCallSerializer {
        (**self).create_function_serializer()
    }

    fn schedule(&self, call: &FunctionCall) -> Result<TaskHandle, FunctionError> {
        (**self).schedule(call)
    }
}
