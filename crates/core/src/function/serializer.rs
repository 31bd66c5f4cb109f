use std::collections::HashSet;
use std::sync::Arc;

use super::call::{CallParam, FunctionCall};
use super::descriptor::{Parameter, SerializedFunctionCall};
use super::id::FunctionId;
use super::registry::FunctionRegistry;
use crate::error::FunctionError;

/// Turns deferred calls into descriptors and remembers every id it produced.
///
/// Create one per scheduling pass: `serialized_function_ids` accumulates
/// across all calls made on the same instance.
pub struct FunctionCallSerializer {
    registry: Arc<FunctionRegistry>,
    serialized_function_ids: Vec<FunctionId>,
    seen: HashSet<FunctionId>,
}

impl FunctionCallSerializer {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            serialized_function_ids: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Serialize `call`, recursing into nested calls among its parameters.
    ///
    /// Parameters are serialized afresh on every call, nothing is cached by
    /// value, so two calls with the same reference share only the id.
    pub fn serialize_function_call(
        &mut self,
        call: &FunctionCall,
    ) -> Result<SerializedFunctionCall, FunctionError> {
        let function_id = self.registry.identify(&call.callee)?;
        self.record(&function_id);

        let mut parameters = Vec::with_capacity(call.params.len());
        for param in &call.params {
            let parameter = match param {
                CallParam::Value(value) => Parameter::Value(value.clone()),
                CallParam::Call(nested) => Parameter::Call(self.serialize_function_call(nested)?),
            };
            parameters.push(parameter);
        }

        Ok(SerializedFunctionCall::new(function_id, parameters))
    }

    /// Every id produced so far, in first-seen order, without duplicates.
    pub fn serialized_function_ids(&self) -> &[FunctionId] {
        &self.serialized_function_ids
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    fn record(&mut self, id: &FunctionId) {
        if self.seen.insert(id.clone()) {
            self.serialized_function_ids.push(id.clone());
        }
    }
}
