use std::sync::Arc;

use fanout_core::builtins;
use fanout_core::{FunctionCall, Value};

use crate::generator::ParallelGenerator;
use crate::options::DefaultParallelOptions;

/// Which combinator applies an operation's iteratee.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    Map,
    Filter,
    /// Folds each slice starting from `default`.
    Reduce { default: Value },
}

/// One step of a chain. Immutable once appended.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    pub iteratee: FunctionCall,
}

impl Operation {
    pub fn map(iteratee: impl Into<FunctionCall>) -> Self {
        Self {
            kind: OperationKind::Map,
            iteratee: iteratee.into(),
        }
    }

    pub fn filter(predicate: impl Into<FunctionCall>) -> Self {
        Self {
            kind: OperationKind::Filter,
            iteratee: predicate.into(),
        }
    }

    pub fn reduce(default: impl Into<Value>, accumulator: impl Into<FunctionCall>) -> Self {
        Self {
            kind: OperationKind::Reduce {
                default: default.into(),
            },
            iteratee: accumulator.into(),
        }
    }

    /// The built-in combinator call, with its own bound parameters.
    pub fn iterator(&self) -> FunctionCall {
        match &self.kind {
            OperationKind::Map => FunctionCall::by_id(builtins::MAP),
            OperationKind::Filter => FunctionCall::by_id(builtins::FILTER),
            OperationKind::Reduce { default } => {
                FunctionCall::by_id(builtins::REDUCE).with(default.clone())
            }
        }
    }
}

/// Task-local state handed to every iteratee as its last argument.
#[derive(Debug, Clone)]
pub enum ParallelEnvironment {
    /// Copied into every task.
    Value(Value),
    /// Called once per task on the unit; its result is the environment.
    Initializer(FunctionCall),
}

/// Everything the scheduler needs to turn a chain into task definitions.
#[derive(Clone)]
pub struct ParallelJob {
    pub generator: Arc<dyn ParallelGenerator>,
    pub operations: Vec<Operation>,
    pub environment: Option<ParallelEnvironment>,
    pub options: DefaultParallelOptions,
}
