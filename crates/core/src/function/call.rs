use serde_json::Value;

use super::id::FunctionId;
use super::registry::FunctionRef;

/// What a deferred call invokes: a registered reference, or a bare id for
/// functions the caller only knows by name (the built-ins).
#[derive(Debug, Clone)]
pub enum Callee {
    Ref(FunctionRef),
    Id(FunctionId),
}

/// A bound parameter of a deferred call.
#[derive(Debug, Clone)]
pub enum CallParam {
    Value(Value),
    /// Serialized recursively, so composed calls survive the boundary.
    Call(FunctionCall),
}

/// A function plus the parameters it is bound to, not yet serialized.
///
/// Bound parameters are passed first when the call is finally invoked, any
/// arguments supplied by the invoker (the current value, the environment)
/// follow them. This is how captured state travels: explicitly, as data.
#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub callee: Callee,
    pub params: Vec<CallParam>,
}

impl FunctionCall {
    pub fn new(func: &FunctionRef) -> Self {
        Self {
            callee: Callee::Ref(func.clone()),
            params: Vec::new(),
        }
    }

    pub fn by_id(id: FunctionId) -> Self {
        Self {
            callee: Callee::Id(id),
            params: Vec::new(),
        }
    }

    /// Bind a plain value parameter.
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.params.push(CallParam::Value(value.into()));
        self
    }

    /// Bind a nested deferred call as a parameter.
    pub fn with_call(mut self, call: FunctionCall) -> Self {
        self.params.push(CallParam::Call(call));
        self
    }
}

impl From<&FunctionRef> for FunctionCall {
    fn from(func: &FunctionRef) -> Self {
        Self::new(func)
    }
}

impl From<FunctionRef> for FunctionCall {
    fn from(func: FunctionRef) -> Self {
        Self {
            callee: Callee::Ref(func),
            params: Vec::new(),
        }
    }
}

impl From<FunctionId> for FunctionCall {
    fn from(id: FunctionId) -> Self {
        Self::by_id(id)
    }
}

impl From<Value> for CallParam {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<FunctionCall> for CallParam {
    fn from(call: FunctionCall) -> Self {
        Self::Call(call)
    }
}
