//! Worker functions shipped with every registry.
//!
//! These are the only functions a task is guaranteed to find on a unit. The
//! entry point of every parallel task is [`PROCESS`]; the combinators and
//! slice sources are referenced from the descriptors it receives.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::FunctionError;
use crate::function::{FunctionBody, FunctionId, Invocation, SerializedFunctionCall};
use crate::task::{ProcessParams, SerializedEnvironment};

pub const NAMESPACE: &str = "fanout";

pub const PROCESS: FunctionId = FunctionId::from_static("fanout-0");
pub const MAP: FunctionId = FunctionId::from_static("fanout-1");
pub const FILTER: FunctionId = FunctionId::from_static("fanout-2");
pub const REDUCE: FunctionId = FunctionId::from_static("fanout-3");
pub const TO_ITERATOR: FunctionId = FunctionId::from_static("fanout-4");
pub const RANGE: FunctionId = FunctionId::from_static("fanout-5");
pub const TIMES: FunctionId = FunctionId::from_static("fanout-6");
pub const IDENTITY: FunctionId = FunctionId::from_static("fanout-7");

pub(crate) fn builtin_bodies() -> Vec<(FunctionId, Arc<FunctionBody>)> {
    vec![
        (PROCESS, body(process)),
        (MAP, body(map)),
        (FILTER, body(filter)),
        (REDUCE, body(reduce)),
        (TO_ITERATOR, body(to_iterator)),
        (RANGE, body(range)),
        (TIMES, body(times)),
        (IDENTITY, body(identity)),
    ]
}

fn body<F>(func: F) -> Arc<FunctionBody>
where
    F: Fn(&Invocation<'_>, &[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
{
    Arc::new(func)
}

/// JavaScript-style truthiness, used by `filter`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ── Entry point ──────────────────────────────────────────────────────

/// Runs one task: environment, slice, then every operation in order.
fn process(inv: &Invocation<'_>, args: &[Value]) -> Result<Value, FunctionError> {
    let params: ProcessParams = serde_json::from_value(arg(args, 0, "process")?.clone())?;
    let environment = task_environment(inv, &params)?;

    let generated = inv.call(&params.generator, &[environment.clone()])?;
    let mut values = into_array(generated, "process")?;

    for operation in &params.operations {
        let iteratee = operation.iteratee.to_value()?;
        let output = inv.call(
            &operation.iterator,
            &[Value::Array(values), iteratee, environment.clone()],
        )?;
        values = into_array(output, operation.iterator.function_id.as_str())?;
    }

    Ok(Value::Array(values))
}

/// Resolve the environment for this task and stamp the task coordinates on it.
fn task_environment(inv: &Invocation<'_>, params: &ProcessParams) -> Result<Value, FunctionError> {
    let environment = match &params.environment {
        None => Value::Null,
        Some(SerializedEnvironment::Value(value)) => value.clone(),
        Some(SerializedEnvironment::Initializer(initializer)) => inv.call(initializer, &[])?,
    };

    Ok(match environment {
        Value::Null => json!({
            "taskIndex": params.task_index,
            "valuesPerTask": params.values_per_task,
        }),
        Value::Object(mut map) => {
            map.insert("taskIndex".into(), json!(params.task_index));
            map.insert("valuesPerTask".into(), json!(params.values_per_task));
            Value::Object(map)
        }
        other => other,
    })
}

// ── Combinators ──────────────────────────────────────────────────────
// Invoked as `combinator(bound..., values, iteratee, env)`.

fn map(inv: &Invocation<'_>, args: &[Value]) -> Result<Value, FunctionError> {
    let (values, iteratee, env) = combinator_args(args, "map")?;
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(inv.call(&iteratee, &[value.clone(), env.clone()])?);
    }
    Ok(Value::Array(out))
}

fn filter(inv: &Invocation<'_>, args: &[Value]) -> Result<Value, FunctionError> {
    let (values, predicate, env) = combinator_args(args, "filter")?;
    let mut out = Vec::new();
    for value in values {
        if is_truthy(&inv.call(&predicate, &[value.clone(), env.clone()])?) {
            out.push(value.clone());
        }
    }
    Ok(Value::Array(out))
}

/// Folds the slice into a single-element array so partial results still
/// concatenate like any other operation output.
fn reduce(inv: &Invocation<'_>, args: &[Value]) -> Result<Value, FunctionError> {
    if args.len() < 4 {
        return Err(FunctionError::invalid_arguments(
            "reduce",
            format!("expected default, values, iteratee and env, got {} arguments", args.len()),
        ));
    }
    let (values, accumulator, env) = combinator_args(args, "reduce")?;
    let mut acc = args[0].clone();
    for value in values {
        acc = inv.call(&accumulator, &[acc, value.clone(), env.clone()])?;
    }
    Ok(Value::Array(vec![acc]))
}

fn combinator_args<'v>(
    args: &'v [Value],
    function: &str,
) -> Result<(&'v [Value], SerializedFunctionCall, &'v Value), FunctionError> {
    let n = args.len();
    if n < 3 {
        return Err(FunctionError::invalid_arguments(
            function,
            format!("expected values, iteratee and env, got {n} arguments"),
        ));
    }
    let values = args[n - 3].as_array().ok_or_else(|| {
        FunctionError::invalid_arguments(function, "values must be an array")
    })?;
    let iteratee = SerializedFunctionCall::from_value(&args[n - 2])?;
    Ok((values.as_slice(), iteratee, &args[n - 1]))
}

// ── Slice sources ────────────────────────────────────────────────────
// Invoked as `source(bound..., env)`; only `times` looks at the env.

fn to_iterator(_: &Invocation<'_>, args: &[Value]) -> Result<Value, FunctionError> {
    match arg(args, 0, "to_iterator")? {
        Value::Array(items) => Ok(Value::Array(items.clone())),
        _ => Err(FunctionError::invalid_arguments("to_iterator", "expected an array")),
    }
}

fn range(_: &Invocation<'_>, args: &[Value]) -> Result<Value, FunctionError> {
    let start = int_arg(args, 0, "range")?;
    let end = int_arg(args, 1, "range")?;
    let step = int_arg(args, 2, "range")?;
    if step == 0 {
        return Err(FunctionError::invalid_arguments("range", "step must not be zero"));
    }

    let mut out = Vec::new();
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        out.push(json!(current));
        match current.checked_add(step) {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(Value::Array(out))
}

fn times(inv: &Invocation<'_>, args: &[Value]) -> Result<Value, FunctionError> {
    let start = int_arg(args, 0, "times")?;
    let end = int_arg(args, 1, "times")?;
    let iteratee = SerializedFunctionCall::from_value(arg(args, 2, "times")?)?;
    let env = args.get(3).cloned().unwrap_or(Value::Null);

    let mut out = Vec::new();
    for i in start..end {
        out.push(inv.call(&iteratee, &[json!(i), env.clone()])?);
    }
    Ok(Value::Array(out))
}

fn identity(_: &Invocation<'_>, args: &[Value]) -> Result<Value, FunctionError> {
    Ok(args.first().cloned().unwrap_or(Value::Null))
}

// ── Argument helpers ─────────────────────────────────────────────────

fn arg<'v>(args: &'v [Value], index: usize, function: &str) -> Result<&'v Value, FunctionError> {
    args.get(index).ok_or_else(|| {
        FunctionError::invalid_arguments(function, format!("missing argument {index}"))
    })
}

fn int_arg(args: &[Value], index: usize, function: &str) -> Result<i64, FunctionError> {
    arg(args, index, function)?.as_i64().ok_or_else(|| {
        FunctionError::invalid_arguments(function, format!("argument {index} must be an integer"))
    })
}

fn into_array(value: Value, function: &str) -> Result<Vec<Value>, FunctionError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(FunctionError::invalid_arguments(
            function,
            format!("expected an array result, got {other}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::function::{FunctionCall, FunctionCallSerializer, FunctionRegistry};
    use crate::task::SerializedOperation;

    fn registry() -> Arc<FunctionRegistry> {
        let registry = FunctionRegistry::with_builtins();
        registry
            .register(FunctionId::new("test", 0), |args| {
                let n = args[0].as_i64().unwrap_or(0);
                Ok(json!(n * n))
            })
            .unwrap();
        registry
            .register(FunctionId::new("test", 1), |args| {
                Ok(json!(args[0].as_i64().unwrap_or(1) % 2 == 0))
            })
            .unwrap();
        registry
            .register(FunctionId::new("test", 2), |args| {
                Ok(json!(args[0].as_i64().unwrap_or(0) + args[1].as_i64().unwrap_or(0)))
            })
            .unwrap();
        registry
            .register(FunctionId::new("test", 3), |args| Ok(args[1].clone()))
            .unwrap();
        Arc::new(registry)
    }

    fn call(id: FunctionId) -> SerializedFunctionCall {
        SerializedFunctionCall::new(id, vec![])
    }

    fn run(registry: &FunctionRegistry, params: &ProcessParams) -> Result<Value, FunctionError> {
        let mut serializer = FunctionCallSerializer::new(Arc::new(FunctionRegistry::with_builtins()));
        let main = serializer
            .serialize_function_call(&FunctionCall::by_id(PROCESS).with(serde_json::to_value(params).unwrap()))
            .unwrap();
        registry.invoke(&main, &[])
    }

    fn slice(items: Value) -> SerializedFunctionCall {
        SerializedFunctionCall::new(TO_ITERATOR, vec![crate::function::Parameter::Value(items)])
    }

    #[test]
    fn process_applies_operations_in_order() {
        let registry = registry();
        let params = ProcessParams {
            environment: None,
            generator: slice(json!([1, 2, 3])),
            operations: vec![
                SerializedOperation { iteratee: call(FunctionId::new("test", 0)), iterator: call(MAP) },
                SerializedOperation { iteratee: call(FunctionId::new("test", 1)), iterator: call(FILTER) },
            ],
            task_index: 0,
            values_per_task: 3,
        };

        assert_eq!(run(&registry, &params).unwrap(), json!([4]));
    }

    #[test]
    fn reduce_folds_from_the_bound_default() {
        let registry = registry();
        let params = ProcessParams {
            environment: None,
            generator: slice(json!([1, 2, 3, 4])),
            operations: vec![SerializedOperation {
                iteratee: call(FunctionId::new("test", 2)),
                iterator: SerializedFunctionCall::new(REDUCE, vec![crate::function::Parameter::Value(json!(10))]),
            }],
            task_index: 0,
            values_per_task: 4,
        };

        assert_eq!(run(&registry, &params).unwrap(), json!([20]));
    }

    #[test]
    fn environment_carries_task_coordinates() {
        let registry = registry();
        let params = ProcessParams {
            environment: Some(SerializedEnvironment::Value(json!({ "factor": 3 }))),
            generator: slice(json!([7])),
            // test-3 returns its second argument: the environment.
            operations: vec![SerializedOperation { iteratee: call(FunctionId::new("test", 3)), iterator: call(MAP) }],
            task_index: 4,
            values_per_task: 1,
        };

        assert_eq!(
            run(&registry, &params).unwrap(),
            json!([{ "factor": 3, "taskIndex": 4, "valuesPerTask": 1 }])
        );
    }

    #[test]
    fn range_counts_up_and_down() {
        let registry = registry();
        let up = SerializedFunctionCall::new(
            RANGE,
            [0, 6, 2].iter().map(|n| crate::function::Parameter::Value(json!(n))).collect(),
        );
        let down = SerializedFunctionCall::new(
            RANGE,
            [3, 0, -1].iter().map(|n| crate::function::Parameter::Value(json!(n))).collect(),
        );
        assert_eq!(registry.invoke(&up, &[Value::Null]).unwrap(), json!([0, 2, 4]));
        assert_eq!(registry.invoke(&down, &[Value::Null]).unwrap(), json!([3, 2, 1]));
    }

    #[test]
    fn times_invokes_the_iteratee_per_index() {
        let registry = registry();
        let generator = SerializedFunctionCall::new(
            TIMES,
            vec![
                crate::function::Parameter::Value(json!(2)),
                crate::function::Parameter::Value(json!(5)),
                crate::function::Parameter::Call(call(FunctionId::new("test", 0))),
            ],
        );
        assert_eq!(registry.invoke(&generator, &[Value::Null]).unwrap(), json!([4, 9, 16]));
    }

    #[test]
    fn failing_iteratee_fails_the_task() {
        let registry = registry();
        registry
            .register(FunctionId::new("test", 9), |_| Err(FunctionError::failed("boom")))
            .unwrap();
        let params = ProcessParams {
            environment: None,
            generator: slice(json!([1])),
            operations: vec![SerializedOperation { iteratee: call(FunctionId::new("test", 9)), iterator: call(MAP) }],
            task_index: 0,
            values_per_task: 1,
        };

        let err = run(&registry, &params).unwrap_err();
        assert!(matches!(err, FunctionError::Failed(msg) if msg == "boom"));
    }

    #[test]
    fn truthiness() {
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(2)));
        assert!(is_truthy(&json!([])));
    }
}
