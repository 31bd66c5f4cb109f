use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::function::{FunctionId, SerializedFunctionCall};

/// Everything an isolated unit needs to run one task.
///
/// Wire shape: `{ main: {functionId, parameters}, taskIndex, valuesPerTask,
/// usedFunctionIds: [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    /// Entry point the unit invokes.
    pub main: SerializedFunctionCall,
    pub task_index: usize,
    pub values_per_task: usize,
    /// Every id the unit must be able to resolve before running `main`.
    pub used_function_ids: Vec<FunctionId>,
}

/// Single parameter of the `process` entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessParams {
    #[serde(default)]
    pub environment: Option<SerializedEnvironment>,
    pub generator: SerializedFunctionCall,
    #[serde(default)]
    pub operations: Vec<SerializedOperation>,
    pub task_index: usize,
    pub values_per_task: usize,
}

/// Task-local environment as it travels to the unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SerializedEnvironment {
    /// Copied verbatim into every task.
    Value(Value),
    /// Invoked once per task on the unit, never shared between tasks.
    Initializer(SerializedFunctionCall),
}

/// An operation after serialization: the user iteratee and the combinator
/// that applies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedOperation {
    pub iteratee: SerializedFunctionCall,
    pub iterator: SerializedFunctionCall,
}
