//! Pools and functions shared by the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fanout::{DefaultParallelOptions, Parallel};
use fanout_core::{json, FunctionCallSerializer, FunctionError, FunctionId, FunctionRegistry, TaskDefinition};
use fanout_pool::{IsolatedUnit, TaskEnvelope, TaskHandle, TaskOutcome, ThreadPool};
use fanout_pool::envelope::TASK_DEFINITION;
use fanout_pool::handle::TaskSender;

pub const SQUARE: FunctionId = FunctionId::from_static("app-0");
pub const IS_EVEN: FunctionId = FunctionId::from_static("app-1");
pub const ADD: FunctionId = FunctionId::from_static("app-2");
pub const FAIL_ON_THREE: FunctionId = FunctionId::from_static("app-3");
pub const SCALE: FunctionId = FunctionId::from_static("app-4");
pub const MAKE_ENV: FunctionId = FunctionId::from_static("app-5");
pub const TASK_OF: FunctionId = FunctionId::from_static("app-6");

fn int(value: &fanout_core::Value) -> i64 {
    value.as_i64().unwrap_or(0)
}

/// Built-ins plus the application functions used across the tests.
pub fn registry() -> Arc<FunctionRegistry> {
    let registry = FunctionRegistry::with_builtins();
    registry.register(SQUARE, |args| Ok(json!(int(&args[0]) * int(&args[0])))).unwrap();
    registry.register(IS_EVEN, |args| Ok(json!(int(&args[0]) % 2 == 0))).unwrap();
    registry.register(ADD, |args| Ok(json!(int(&args[0]) + int(&args[1])))).unwrap();
    registry
        .register(FAIL_ON_THREE, |args| match int(&args[0]) {
            3 => Err(FunctionError::failed("three is not allowed")),
            n => Ok(json!(n)),
        })
        .unwrap();
    // scale(value, env) multiplies by env.factor.
    registry
        .register(SCALE, |args| Ok(json!(int(&args[0]) * int(&args[1]["factor"]))))
        .unwrap();
    registry.register(MAKE_ENV, |args| Ok(json!({ "factor": args[0].clone() }))).unwrap();
    // task_of(value, env) reports which task saw the value.
    registry.register(TASK_OF, |args| Ok(args[1]["taskIndex"].clone())).unwrap();
    Arc::new(registry)
}

/// Runs every task synchronously on an [`IsolatedUnit`], through the same
/// envelope bytes a real unit receives.
pub struct SimulatedPool {
    registry: Arc<FunctionRegistry>,
}

impl SimulatedPool {
    pub fn new(registry: Arc<FunctionRegistry>) -> Arc<Self> {
        Arc::new(Self { registry })
    }
}

impl ThreadPool for SimulatedPool {
    fn schedule_task(&self, definition: TaskDefinition) -> TaskHandle {
        let task_index = definition.task_index;
        let result = TaskEnvelope::new(TASK_DEFINITION, &definition).and_then(|request| {
            let reply = IsolatedUnit::new(&self.registry).handle(&request.to_bytes()?)?;
            TaskOutcome::from_reply(&reply, request.correlation_id)
        });
        match result {
            Ok(value) => TaskHandle::completed(task_index, value),
            Err(err) => TaskHandle::failed(task_index, err),
        }
    }

    fn create_function_serializer(&self) -> FunctionCallSerializer {
        FunctionCallSerializer::new(Arc::clone(&self.registry))
    }
}

/// Hands out pending handles and lets the test resolve them in any order.
pub struct ManualPool {
    registry: Arc<FunctionRegistry>,
    senders: Mutex<Vec<(usize, TaskSender)>>,
}

impl ManualPool {
    pub fn new(registry: Arc<FunctionRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            senders: Mutex::new(Vec::new()),
        })
    }

    pub fn take_sender(&self, task_index: usize) -> TaskSender {
        let mut senders = self.senders.lock().unwrap();
        let position = senders.iter().position(|(i, _)| *i == task_index).unwrap();
        senders.remove(position).1
    }

    pub fn pending(&self) -> usize {
        self.senders.lock().unwrap().len()
    }
}

impl ThreadPool for ManualPool {
    fn schedule_task(&self, definition: TaskDefinition) -> TaskHandle {
        let (tx, handle) = TaskHandle::channel(definition.task_index);
        self.senders.lock().unwrap().push((definition.task_index, tx));
        handle
    }

    fn create_function_serializer(&self) -> FunctionCallSerializer {
        FunctionCallSerializer::new(Arc::clone(&self.registry))
    }
}

pub fn parallel(pool: Arc<dyn ThreadPool>, max_concurrency_level: usize) -> Parallel {
    Parallel::new(DefaultParallelOptions {
        max_concurrency_level,
        ..DefaultParallelOptions::new(pool)
    })
}
