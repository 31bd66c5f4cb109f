//! The receiving side of a task: decode, check, invoke, reply.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use fanout_core::{FunctionRegistry, TaskDefinition, Value};

use crate::envelope::{TaskEnvelope, TASK_DEFINITION, TASK_OUTCOME};
use crate::error::TaskError;

/// What a unit reports back for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskOutcome {
    Completed(Value),
    Failed(TaskError),
}

impl TaskOutcome {
    pub fn into_result(self) -> Result<Value, TaskError> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Failed(err) => Err(err),
        }
    }

    /// Decode a unit's reply envelope and check it answers `correlation_id`.
    pub fn from_reply(bytes: &[u8], correlation_id: Uuid) -> Result<Value, TaskError> {
        let envelope = TaskEnvelope::from_bytes(bytes)?;
        if envelope.correlation_id != correlation_id {
            return Err(TaskError::Decoding(format!(
                "reply {} does not answer task {correlation_id}",
                envelope.correlation_id
            )));
        }
        envelope.decode::<TaskOutcome>(TASK_OUTCOME)?.into_result()
    }
}

impl From<Result<Value, TaskError>> for TaskOutcome {
    fn from(result: Result<Value, TaskError>) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(err) => Self::Failed(err),
        }
    }
}

/// An execution context that only knows its own registry and the bytes it
/// is handed.
pub struct IsolatedUnit<'a> {
    registry: &'a FunctionRegistry,
}

impl<'a> IsolatedUnit<'a> {
    pub fn new(registry: &'a FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Run a decoded definition.
    ///
    /// Every id in `used_function_ids` must resolve before `main` is invoked;
    /// a missing one fails the task without running any user code.
    pub fn run(&self, definition: &TaskDefinition) -> Result<Value, TaskError> {
        let task_index = definition.task_index;

        for function_id in &definition.used_function_ids {
            if let Err(err) = self.registry.resolve(function_id) {
                warn!(task_index, %function_id, error = %err, "unit cannot resolve function");
                return Err(TaskError::from_function_error(task_index, err));
            }
        }

        debug!(
            task_index,
            function_id = %definition.main.function_id,
            "invoking task entry point"
        );
        self.registry
            .invoke(&definition.main, &[])
            .map_err(|e| TaskError::from_function_error(task_index, e))
    }

    /// Handle a definition envelope and produce the outcome envelope.
    ///
    /// Task failures are part of the reply; only a reply that cannot be
    /// encoded is returned as an error.
    pub fn handle(&self, request: &[u8]) -> Result<Vec<u8>, TaskError> {
        let envelope = TaskEnvelope::from_bytes(request)?;
        let outcome: TaskOutcome = envelope
            .decode::<TaskDefinition>(TASK_DEFINITION)
            .and_then(|definition| self.run(&definition))
            .into();

        TaskEnvelope::with_correlation(TASK_OUTCOME, &outcome, envelope.correlation_id)?.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use fanout_core::{builtins, json, FunctionCall, FunctionCallSerializer, FunctionId};
    use std::sync::Arc;

    use super::*;

    fn registry() -> Arc<FunctionRegistry> {
        let registry = FunctionRegistry::with_builtins();
        registry
            .register(FunctionId::new("unit", 0), |args| {
                Ok(json!(args[0].as_i64().unwrap_or(0) + 1))
            })
            .unwrap();
        Arc::new(registry)
    }

    fn definition(registry: &Arc<FunctionRegistry>, func: &fanout_core::FunctionRef) -> TaskDefinition {
        let mut serializer = FunctionCallSerializer::new(Arc::clone(registry));
        let main = serializer
            .serialize_function_call(&FunctionCall::new(func).with(41))
            .unwrap();
        TaskDefinition {
            main,
            task_index: 0,
            values_per_task: 0,
            used_function_ids: serializer.serialized_function_ids().to_vec(),
        }
    }

    #[test]
    fn runs_main_against_the_registry() {
        let registry = registry();
        let func = registry.function_ref(&FunctionId::new("unit", 0)).unwrap();
        let unit = IsolatedUnit::new(&registry);
        assert_eq!(unit.run(&definition(&registry, &func)).unwrap(), json!(42));
    }

    #[test]
    fn missing_function_fails_before_invocation() {
        let caller = registry();
        let func = caller.function_ref(&FunctionId::new("unit", 0)).unwrap();
        let def = definition(&caller, &func);

        // A unit that only has the built-ins.
        let bare = FunctionRegistry::with_builtins();
        let err = IsolatedUnit::new(&bare).run(&def).unwrap_err();
        assert_eq!(
            err,
            TaskError::UnresolvedFunctionReference {
                task_index: 0,
                function_id: FunctionId::new("unit", 0),
            }
        );
    }

    #[test]
    fn lock_failures_are_not_reported_as_missing_functions() {
        let err = TaskError::from_function_error(
            3,
            fanout_core::FunctionError::LockPoisoned("function registry read lock".into()),
        );
        match err {
            TaskError::Execution { task_index, message } => {
                assert_eq!(task_index, 3);
                assert!(message.contains("lock poisoned"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn envelope_round_trip_through_a_unit() {
        let registry = registry();
        let func = registry.function_ref(&FunctionId::new("unit", 0)).unwrap();
        let request = TaskEnvelope::new(TASK_DEFINITION, &definition(&registry, &func)).unwrap();

        let reply = IsolatedUnit::new(&registry)
            .handle(&request.to_bytes().unwrap())
            .unwrap();
        assert_eq!(TaskOutcome::from_reply(&reply, request.correlation_id).unwrap(), json!(42));
    }

    #[test]
    fn reply_for_another_task_is_rejected() {
        let registry = registry();
        let def = TaskDefinition {
            main: fanout_core::SerializedFunctionCall::new(builtins::IDENTITY, vec![]),
            task_index: 0,
            values_per_task: 0,
            used_function_ids: vec![builtins::IDENTITY],
        };
        let request = TaskEnvelope::new(TASK_DEFINITION, &def).unwrap();
        let reply = IsolatedUnit::new(&registry).handle(&request.to_bytes().unwrap()).unwrap();

        let err = TaskOutcome::from_reply(&reply, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, TaskError::Decoding(_)));
    }
}
