use std::sync::{Arc, Mutex};

use fanout_core::builtins;
use fanout_core::{
    json, FunctionCall, FunctionCallSerializer, FunctionError, FunctionId, FunctionRegistry,
    Parameter, ProcessParams, SerializedEnvironment, SerializedFunctionCall, TaskDefinition, Value,
};
use fanout_pool::{TaskHandle, ThreadPool};

use super::*;
use crate::generator::{CollectionGenerator, ParallelGenerator};
use crate::job::{Operation, ParallelEnvironment, ParallelJob};
use crate::options::DefaultParallelOptions;

/// Pool that records definitions instead of running them.
struct RecordingPool {
    registry: Arc<FunctionRegistry>,
    scheduled: Mutex<Vec<TaskDefinition>>,
}

impl RecordingPool {
    fn new(registry: Arc<FunctionRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            scheduled: Mutex::new(Vec::new()),
        })
    }

    fn scheduled(&self) -> Vec<TaskDefinition> {
        self.scheduled.lock().unwrap().clone()
    }
}

impl ThreadPool for RecordingPool {
    fn schedule_task(&self, definition: TaskDefinition) -> TaskHandle {
        let task_index = definition.task_index;
        self.scheduled.lock().unwrap().push(definition);
        TaskHandle::completed(task_index, json!([]))
    }

    fn create_function_serializer(&self) -> FunctionCallSerializer {
        FunctionCallSerializer::new(Arc::clone(&self.registry))
    }
}

/// Scheduler with a fixed answer, so definition building is tested alone.
struct FixedScheduler(TaskScheduling);

impl ParallelScheduler for FixedScheduler {
    fn get_scheduling(
        &self,
        _total: usize,
        _options: &DefaultParallelOptions,
    ) -> Result<TaskScheduling, ParallelError> {
        Ok(self.0)
    }
}

/// Collection generator that remembers which slices were requested.
struct SpyGenerator {
    inner: CollectionGenerator,
    calls: Mutex<Vec<(usize, usize)>>,
}

impl ParallelGenerator for SpyGenerator {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn serialize_slice(
        &self,
        task_index: usize,
        values_per_task: usize,
        serializer: &mut FunctionCallSerializer,
    ) -> Result<SerializedFunctionCall, FunctionError> {
        self.calls.lock().unwrap().push((task_index, values_per_task));
        self.inner.serialize_slice(task_index, values_per_task, serializer)
    }
}

const SQUARE: FunctionId = FunctionId::from_static("test-0");
const INIT: FunctionId = FunctionId::from_static("test-1");

fn registry() -> Arc<FunctionRegistry> {
    let registry = FunctionRegistry::with_builtins();
    registry
        .register(SQUARE, |args| {
            let n = args[0].as_i64().unwrap_or(0);
            Ok(json!(n * n))
        })
        .unwrap();
    registry
        .register(INIT, |args| Ok(json!({ "test": args[0].clone() })))
        .unwrap();
    Arc::new(registry)
}

fn job(pool: Arc<RecordingPool>, generator: Arc<dyn ParallelGenerator>) -> ParallelJob {
    let options = DefaultParallelOptions {
        max_concurrency_level: 2,
        ..DefaultParallelOptions::new(pool)
    };
    ParallelJob {
        generator,
        operations: Vec::new(),
        environment: None,
        options,
    }
}

fn process_params(definition: &TaskDefinition) -> ProcessParams {
    assert_eq!(definition.main.function_id, builtins::PROCESS);
    match definition.main.parameters.as_slice() {
        [Parameter::Value(params)] => serde_json::from_value(params.clone()).unwrap(),
        other => panic!("unexpected process parameters: {other:?}"),
    }
}

#[test]
fn schedules_one_task_per_slice() {
    let pool = RecordingPool::new(registry());
    let job = job(Arc::clone(&pool), Arc::new(CollectionGenerator::new([1, 2, 3, 4, 5])));

    let scheduler = FixedScheduler(TaskScheduling {
        number_of_tasks: 2,
        values_per_task: 3,
    });
    let handles = scheduler.schedule(&job).unwrap();

    assert_eq!(handles.len(), 2);
    assert_eq!(handles.iter().map(TaskHandle::task_index).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(pool.scheduled().len(), 2);
}

#[test]
fn requests_each_slice_with_the_task_size() {
    let pool = RecordingPool::new(registry());
    let generator = Arc::new(SpyGenerator {
        inner: CollectionGenerator::new([1, 2, 3, 4, 5]),
        calls: Mutex::new(Vec::new()),
    });
    let job = job(pool, Arc::clone(&generator) as Arc<dyn ParallelGenerator>);

    FixedScheduler(TaskScheduling {
        number_of_tasks: 2,
        values_per_task: 3,
    })
    .schedule(&job)
    .unwrap();

    assert_eq!(*generator.calls.lock().unwrap(), vec![(0, 3), (1, 3)]);
}

#[test]
fn plain_environment_is_passed_through() {
    let pool = RecordingPool::new(registry());
    let mut job = job(Arc::clone(&pool), Arc::new(CollectionGenerator::new([1, 2, 3])));
    job.environment = Some(ParallelEnvironment::Value(json!({ "test": 10 })));

    DefaultParallelScheduler.schedule(&job).unwrap();

    let definitions = pool.scheduled();
    assert_eq!(definitions.len(), 2);
    for definition in &definitions {
        assert_eq!(
            process_params(definition).environment,
            Some(SerializedEnvironment::Value(json!({ "test": 10 })))
        );
    }
}

#[test]
fn initializer_is_serialized_as_a_function_call() {
    let registry = registry();
    let pool = RecordingPool::new(Arc::clone(&registry));
    let init = registry.function_ref(&INIT).unwrap();

    let mut job = job(Arc::clone(&pool), Arc::new(CollectionGenerator::new([1])));
    job.environment = Some(ParallelEnvironment::Initializer(FunctionCall::new(&init).with(10)));

    DefaultParallelScheduler.schedule(&job).unwrap();

    let definition = &pool.scheduled()[0];
    assert_eq!(
        process_params(definition).environment,
        Some(SerializedEnvironment::Initializer(SerializedFunctionCall::new(
            INIT,
            vec![Parameter::Value(json!(10))]
        )))
    );
    assert!(definition.used_function_ids.contains(&INIT));
}

#[test]
fn definitions_embed_slice_operations_and_used_ids() {
    let registry = registry();
    let pool = RecordingPool::new(Arc::clone(&registry));
    let square = registry.function_ref(&SQUARE).unwrap();

    let mut job = job(Arc::clone(&pool), Arc::new(CollectionGenerator::new([1, 2, 3, 4, 5])));
    job.operations = vec![Operation::map(&square)];

    DefaultParallelScheduler.schedule(&job).unwrap();
    let definitions = pool.scheduled();
    assert_eq!(definitions.len(), 2);

    let slices: Vec<Value> = definitions
        .iter()
        .map(|d| match process_params(d).generator.parameters.as_slice() {
            [Parameter::Value(values)] => values.clone(),
            other => panic!("unexpected slice parameters: {other:?}"),
        })
        .collect();
    assert_eq!(slices, vec![json!([1, 2, 3]), json!([4, 5])]);

    for (task_index, definition) in definitions.iter().enumerate() {
        let params = process_params(definition);
        assert_eq!(definition.task_index, task_index);
        assert_eq!(params.task_index, task_index);
        assert_eq!(definition.values_per_task, 3);
        assert_eq!(params.operations.len(), 1);
        assert_eq!(params.operations[0].iteratee, SerializedFunctionCall::new(SQUARE, vec![]));
        assert_eq!(params.operations[0].iterator, SerializedFunctionCall::new(builtins::MAP, vec![]));

        for id in [builtins::PROCESS, builtins::MAP, SQUARE, builtins::TO_ITERATOR] {
            assert!(definition.used_function_ids.contains(&id), "missing {id}");
        }
    }

    // Operations are serialized before the first slice.
    assert_eq!(
        definitions[0].used_function_ids,
        vec![SQUARE, builtins::MAP, builtins::TO_ITERATOR, builtins::PROCESS]
    );
}

#[test]
fn unknown_function_fails_before_anything_is_dispatched() {
    let pool = RecordingPool::new(registry());
    let mut job = job(Arc::clone(&pool), Arc::new(CollectionGenerator::new([1, 2])));
    job.operations = vec![Operation::map(FunctionId::new("missing", 0))];

    let err = DefaultParallelScheduler.schedule(&job).unwrap_err();
    assert!(matches!(
        err,
        ParallelError::Function(FunctionError::UnresolvedFunctionReference(_))
    ));
    assert!(pool.scheduled().is_empty());
}

#[test]
fn empty_generator_schedules_nothing() {
    let pool = RecordingPool::new(registry());
    let job = job(Arc::clone(&pool), Arc::new(CollectionGenerator::new(Vec::<Value>::new())));

    assert!(DefaultParallelScheduler.schedule(&job).unwrap().is_empty());
    assert!(pool.scheduled().is_empty());
}
