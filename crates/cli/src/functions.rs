//! Functions the demo pipelines ship to the units.

use std::sync::Arc;

use anyhow::Result;
use fanout_core::{json, FunctionError, FunctionId, FunctionRef, FunctionRegistry, Value};

pub const SQUARE: FunctionId = FunctionId::from_static("cli-0");
pub const IS_EVEN: FunctionId = FunctionId::from_static("cli-1");
pub const ADD: FunctionId = FunctionId::from_static("cli-2");

/// Handles to the registered demo functions.
pub struct Functions {
    pub square: FunctionRef,
    pub is_even: FunctionRef,
    pub add: FunctionRef,
}

fn int(args: &[Value], index: usize, function: &str) -> Result<i64, FunctionError> {
    args.get(index)
        .and_then(Value::as_i64)
        .ok_or_else(|| FunctionError::invalid_arguments(function, format!("argument {index} must be an integer")))
}

/// Built-ins plus the demo functions.
pub fn registry() -> Result<(Arc<FunctionRegistry>, Functions)> {
    let registry = FunctionRegistry::with_builtins();

    let square = registry.register(SQUARE, |args| {
        let n = int(args, 0, "square")?;
        n.checked_mul(n)
            .map(|sq| json!(sq))
            .ok_or_else(|| FunctionError::failed(format!("square of {n} overflows")))
    })?;
    let is_even = registry.register(IS_EVEN, |args| Ok(json!(int(args, 0, "is_even")? % 2 == 0)))?;
    let add = registry.register(ADD, |args| {
        let (a, b) = (int(args, 0, "add")?, int(args, 1, "add")?);
        a.checked_add(b)
            .map(|sum| json!(sum))
            .ok_or_else(|| FunctionError::failed(format!("{a} + {b} overflows")))
    })?;

    Ok((Arc::new(registry), Functions { square, is_even, add }))
}
