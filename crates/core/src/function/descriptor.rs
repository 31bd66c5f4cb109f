use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::FunctionId;
use crate::error::FunctionError;

/// Transportable form of a deferred call: `{ functionId, parameters }`.
///
/// Two descriptors are equal iff their ids and parameters are deep-equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedFunctionCall {
    pub function_id: FunctionId,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// A descriptor parameter. Nested calls stay tagged so a receiver can never
/// mistake a plain object for a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Parameter {
    Value(Value),
    Call(SerializedFunctionCall),
}

impl SerializedFunctionCall {
    pub fn new(function_id: FunctionId, parameters: Vec<Parameter>) -> Self {
        Self {
            function_id,
            parameters,
        }
    }

    /// Decode a descriptor that was handed to a function as an argument.
    pub fn from_value(value: &Value) -> Result<Self, FunctionError> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_value(&self) -> Result<Value, FunctionError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl Parameter {
    /// The argument a function body receives for this parameter: the value
    /// itself, or the nested descriptor in its serialized form.
    pub fn to_argument(&self) -> Result<Value, FunctionError> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::Call(call) => call.to_value(),
        }
    }
}
