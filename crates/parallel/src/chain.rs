use std::future::IntoFuture;
use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use tracing::debug;

use fanout_core::{FunctionCall, FunctionRegistry, SerializedFunctionCall, Value};
use fanout_pool::TaskHandle;

use crate::error::ParallelError;
use crate::generator::ParallelGenerator;
use crate::job::{Operation, ParallelEnvironment, ParallelJob};
use crate::options::{DefaultParallelOptions, ParallelOptions};

/// A pipeline of operations over a generator, run on the pool by
/// [`ParallelChain::result`].
///
/// # Example
/// ```ignore
/// let squares = parallel
///     .from([1, 2, 3])
///     .map(&square)
///     .filter(&is_even)
///     .result()?
///     .await?;
/// ```
#[derive(Clone)]
pub struct ParallelChain {
    generator: Arc<dyn ParallelGenerator>,
    options: DefaultParallelOptions,
    environment: Option<ParallelEnvironment>,
    operations: Vec<Operation>,
}

impl ParallelChain {
    pub fn new(generator: Arc<dyn ParallelGenerator>, options: DefaultParallelOptions) -> Self {
        Self {
            generator,
            options,
            environment: None,
            operations: Vec::new(),
        }
    }

    /// Override options for this chain only.
    pub fn with_options(mut self, options: &ParallelOptions) -> Result<Self, ParallelError> {
        self.options = self.options.merge(options)?;
        Ok(self)
    }

    /// Value passed to every iteratee, extended with `taskIndex` and
    /// `valuesPerTask` when it is an object.
    pub fn environment(mut self, environment: impl Into<Value>) -> Self {
        self.environment = Some(ParallelEnvironment::Value(environment.into()));
        self
    }

    /// Function called once per task on the unit to create the environment.
    pub fn initializer(mut self, initializer: impl Into<FunctionCall>) -> Self {
        self.environment = Some(ParallelEnvironment::Initializer(initializer.into()));
        self
    }

    /// `iteratee(bound..., value, env)` for every value.
    pub fn map(mut self, iteratee: impl Into<FunctionCall>) -> Self {
        self.operations.push(Operation::map(iteratee));
        self
    }

    /// Keep the values for which `predicate(bound..., value, env)` is truthy.
    pub fn filter(mut self, predicate: impl Into<FunctionCall>) -> Self {
        self.operations.push(Operation::filter(predicate));
        self
    }

    /// Fold everything into one value with `accumulator(bound..., acc, value, env)`.
    ///
    /// Each task folds its own slice from `default`; the partial results are
    /// folded again on the caller with the same accumulator, also from
    /// `default`.
    pub fn reduce(
        mut self,
        default: impl Into<Value>,
        accumulator: impl Into<FunctionCall>,
    ) -> Result<ReduceHandle, ParallelError> {
        let default = default.into();
        let accumulator = accumulator.into();

        let mut serializer = self.options.thread_pool.create_function_serializer();
        let local = serializer.serialize_function_call(&accumulator)?;
        let registry = Arc::clone(serializer.registry());

        self.operations.push(Operation::reduce(default.clone(), accumulator));
        Ok(ReduceHandle {
            partials: self.result()?,
            default,
            accumulator: local,
            registry,
        })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn options(&self) -> &DefaultParallelOptions {
        &self.options
    }

    /// Schedule the chain. Every task is built and queued before this
    /// returns; the handle only waits for results.
    pub fn result(self) -> Result<ChainHandle, ParallelError> {
        let scheduler = Arc::clone(&self.options.scheduler);
        let job = ParallelJob {
            generator: self.generator,
            operations: self.operations,
            environment: self.environment,
            options: self.options,
        };
        let handles = scheduler.schedule(&job)?;
        Ok(ChainHandle { handles })
    }
}

/// Pending result of a whole chain.
#[derive(Debug)]
pub struct ChainHandle {
    handles: Vec<TaskHandle>,
}

impl ChainHandle {
    pub fn number_of_tasks(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every task and concatenate their arrays in task order.
    ///
    /// Fails with the first task error observed. The remaining tasks still
    /// run to completion; their results are dropped.
    pub async fn join(self) -> Result<Vec<Value>, ParallelError> {
        let task_indices: Vec<usize> = self.handles.iter().map(TaskHandle::task_index).collect();
        let results = try_join_all(self.handles).await?;

        let mut values = Vec::new();
        for (task_index, result) in task_indices.into_iter().zip(results) {
            match result {
                Value::Array(items) => values.extend(items),
                other => {
                    return Err(ParallelError::UnexpectedTaskResult {
                        task_index,
                        found: other.to_string(),
                    })
                }
            }
        }
        debug!(values = values.len(), "parallel job joined");
        Ok(values)
    }

    /// [`ChainHandle::join`], deserializing every value into `T`.
    pub async fn join_as<T: DeserializeOwned>(self) -> Result<Vec<T>, ParallelError> {
        self.join()
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(ParallelError::from))
            .collect()
    }
}

impl IntoFuture for ChainHandle {
    type Output = Result<Vec<Value>, ParallelError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.join().boxed()
    }
}

/// Pending result of [`ParallelChain::reduce`].
pub struct ReduceHandle {
    partials: ChainHandle,
    default: Value,
    accumulator: SerializedFunctionCall,
    registry: Arc<FunctionRegistry>,
}

impl ReduceHandle {
    /// Wait for the per-task partials and fold them into the final value.
    ///
    /// An empty generator yields `default`.
    pub async fn join(self) -> Result<Value, ParallelError> {
        let partials = self.partials.join().await?;
        let mut acc = self.default;
        for partial in partials {
            acc = self
                .registry
                .invoke(&self.accumulator, &[acc, partial, Value::Null])?;
        }
        Ok(acc)
    }

    pub async fn join_as<T: DeserializeOwned>(self) -> Result<T, ParallelError> {
        Ok(serde_json::from_value(self.join().await?)?)
    }
}

impl IntoFuture for ReduceHandle {
    type Output = Result<Value, ParallelError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.join().boxed()
    }
}
