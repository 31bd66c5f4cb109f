//! Turns a [`ParallelJob`] into task definitions and dispatches them.
//!
//! Sizing is pluggable through [`ParallelScheduler::get_scheduling`]; building
//! the definitions and handing them to the pool is shared by every
//! implementation.

mod scheduling;

#[cfg(test)]
mod tests;

pub use scheduling::{compute_scheduling, SchedulingConstraints, TaskScheduling};

use fanout_core::builtins;
use fanout_core::{
    FunctionCall, FunctionCallSerializer, ProcessParams, SerializedEnvironment,
    SerializedOperation, TaskDefinition,
};
use fanout_pool::TaskHandle;
use tracing::{debug, info};

use crate::error::ParallelError;
use crate::job::{Operation, ParallelEnvironment, ParallelJob};
use crate::options::DefaultParallelOptions;

/// Decides how many tasks a job is split into.
pub trait ParallelScheduler: Send + Sync {
    fn get_scheduling(
        &self,
        total: usize,
        options: &DefaultParallelOptions,
    ) -> Result<TaskScheduling, ParallelError>;

    /// Build every task definition for `job` and queue them on its pool.
    ///
    /// All serialization happens before the first task is queued, so a
    /// failure here dispatches nothing.
    fn schedule(&self, job: &ParallelJob) -> Result<Vec<TaskHandle>, ParallelError> {
        let definitions = build_task_definitions(self, job)?;
        let pool = &job.options.thread_pool;
        Ok(definitions
            .into_iter()
            .map(|definition| pool.schedule_task(definition))
            .collect())
    }
}

/// Splits evenly over the concurrency level within the per-worker limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParallelScheduler;

impl ParallelScheduler for DefaultParallelScheduler {
    fn get_scheduling(
        &self,
        total: usize,
        options: &DefaultParallelOptions,
    ) -> Result<TaskScheduling, ParallelError> {
        compute_scheduling(total, &SchedulingConstraints::from(options))
    }
}

/// One definition per task, all from a single serializer.
///
/// The environment and the operations are serialized once and embedded in
/// every task. Each task's `used_function_ids` is the serializer's id list
/// right after that task's `main` was produced.
pub fn build_task_definitions<S>(
    scheduler: &S,
    job: &ParallelJob,
) -> Result<Vec<TaskDefinition>, ParallelError>
where
    S: ParallelScheduler + ?Sized,
{
    let scheduling = scheduler.get_scheduling(job.generator.len(), &job.options)?;
    let mut serializer = job.options.thread_pool.create_function_serializer();

    let environment = serialize_environment(job.environment.as_ref(), &mut serializer)?;
    let operations = serialize_operations(&job.operations, &mut serializer)?;

    info!(
        values = job.generator.len(),
        tasks = scheduling.number_of_tasks,
        values_per_task = scheduling.values_per_task,
        operations = operations.len(),
        "scheduling parallel job"
    );

    let mut definitions = Vec::with_capacity(scheduling.number_of_tasks);
    for task_index in 0..scheduling.number_of_tasks {
        let generator =
            job.generator
                .serialize_slice(task_index, scheduling.values_per_task, &mut serializer)?;

        let params = ProcessParams {
            environment: environment.clone(),
            generator,
            operations: operations.clone(),
            task_index,
            values_per_task: scheduling.values_per_task,
        };
        let main = serializer.serialize_function_call(
            &FunctionCall::by_id(builtins::PROCESS).with(serde_json::to_value(&params)?),
        )?;

        let used_function_ids = serializer.serialized_function_ids().to_vec();
        debug!(task_index, functions = used_function_ids.len(), "built task definition");
        definitions.push(TaskDefinition {
            main,
            task_index,
            values_per_task: scheduling.values_per_task,
            used_function_ids,
        });
    }

    Ok(definitions)
}

fn serialize_environment(
    environment: Option<&ParallelEnvironment>,
    serializer: &mut FunctionCallSerializer,
) -> Result<Option<SerializedEnvironment>, ParallelError> {
    Ok(match environment {
        None => None,
        Some(ParallelEnvironment::Value(value)) => Some(SerializedEnvironment::Value(value.clone())),
        Some(ParallelEnvironment::Initializer(call)) => Some(SerializedEnvironment::Initializer(
            serializer.serialize_function_call(call)?,
        )),
    })
}

fn serialize_operations(
    operations: &[Operation],
    serializer: &mut FunctionCallSerializer,
) -> Result<Vec<SerializedOperation>, ParallelError> {
    operations
        .iter()
        .map(|operation| {
            Ok(SerializedOperation {
                iteratee: serializer.serialize_function_call(&operation.iteratee)?,
                iterator: serializer.serialize_function_call(&operation.iterator())?,
            })
        })
        .collect()
}
