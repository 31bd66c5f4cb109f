//! Sources a chain can be split over.
//!
//! A generator never ships its values as a whole: each task receives a
//! descriptor that reproduces only its own slice on the unit.

use fanout_core::builtins;
use fanout_core::{FunctionCall, FunctionCallSerializer, FunctionError, SerializedFunctionCall, Value};

use crate::error::ParallelError;

/// A finite source that can describe any of its slices as a function call.
pub trait ParallelGenerator: Send + Sync {
    /// Total number of values.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Descriptor producing the values in
    /// `[task_index * values_per_task, min((task_index + 1) * values_per_task, len))`.
    fn serialize_slice(
        &self,
        task_index: usize,
        values_per_task: usize,
        serializer: &mut FunctionCallSerializer,
    ) -> Result<SerializedFunctionCall, FunctionError>;
}

/// Index bounds of slice `task_index`, clamped to `len`.
pub fn slice_bounds(len: usize, task_index: usize, values_per_task: usize) -> (usize, usize) {
    let start = task_index.saturating_mul(values_per_task).min(len);
    let end = start.saturating_add(values_per_task).min(len);
    (start, end)
}

// ── Collection ───────────────────────────────────────────────────────

/// Slices of an in-memory collection, shipped by value.
#[derive(Debug, Clone)]
pub struct CollectionGenerator {
    values: Vec<Value>,
}

impl CollectionGenerator {
    pub fn new<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl ParallelGenerator for CollectionGenerator {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn serialize_slice(
        &self,
        task_index: usize,
        values_per_task: usize,
        serializer: &mut FunctionCallSerializer,
    ) -> Result<SerializedFunctionCall, FunctionError> {
        let (start, end) = slice_bounds(self.values.len(), task_index, values_per_task);
        let slice = Value::Array(self.values[start..end].to_vec());
        serializer.serialize_function_call(&FunctionCall::by_id(builtins::TO_ITERATOR).with(slice))
    }
}

// ── Range ────────────────────────────────────────────────────────────

/// Arithmetic progression `start, start + step, ...` up to but excluding `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeGenerator {
    start: i64,
    end: i64,
    step: i64,
    len: usize,
}

impl RangeGenerator {
    /// `step` defaults to 1, or -1 when `end < start`.
    pub fn new(start: i64, end: i64, step: Option<i64>) -> Result<Self, ParallelError> {
        let step = step.unwrap_or(if end < start { -1 } else { 1 });
        if step == 0 {
            return Err(ParallelError::configuration("range step must not be zero"));
        }

        let span = end as i128 - start as i128;
        let len = if span != 0 && (span > 0) == (step > 0) {
            let step = step as i128;
            let count = (span + step - step.signum()) / step;
            usize::try_from(count).map_err(|_| {
                ParallelError::configuration(format!("range of {count} values is too large"))
            })?
        } else {
            0
        };

        Ok(Self { start, end, step, len })
    }

    pub fn step(&self) -> i64 {
        self.step
    }

    fn value_at(&self, index: usize) -> i128 {
        self.start as i128 + index as i128 * self.step as i128
    }
}

impl ParallelGenerator for RangeGenerator {
    fn len(&self) -> usize {
        self.len
    }

    fn serialize_slice(
        &self,
        task_index: usize,
        values_per_task: usize,
        serializer: &mut FunctionCallSerializer,
    ) -> Result<SerializedFunctionCall, FunctionError> {
        let (first, last) = slice_bounds(self.len, task_index, values_per_task);
        // Both bounds lie between start and end, so they fit in an i64.
        let slice_start = self.value_at(first) as i64;
        let slice_end = if last == self.len {
            self.end
        } else {
            self.value_at(last) as i64
        };

        serializer.serialize_function_call(
            &FunctionCall::by_id(builtins::RANGE)
                .with(slice_start)
                .with(slice_end)
                .with(self.step),
        )
    }
}

// ── Times ────────────────────────────────────────────────────────────

/// Values `f(0, env) .. f(n - 1, env)`, computed on the units.
#[derive(Debug, Clone)]
pub struct TimesGenerator {
    n: usize,
    iteratee: FunctionCall,
}

impl TimesGenerator {
    pub fn new(n: usize, iteratee: impl Into<FunctionCall>) -> Self {
        Self {
            n,
            iteratee: iteratee.into(),
        }
    }

    /// `n` copies of `value`.
    pub fn constant(n: usize, value: impl Into<Value>) -> Self {
        Self::new(n, FunctionCall::by_id(builtins::IDENTITY).with(value))
    }
}

impl ParallelGenerator for TimesGenerator {
    fn len(&self) -> usize {
        self.n
    }

    fn serialize_slice(
        &self,
        task_index: usize,
        values_per_task: usize,
        serializer: &mut FunctionCallSerializer,
    ) -> Result<SerializedFunctionCall, FunctionError> {
        let (start, end) = slice_bounds(self.n, task_index, values_per_task);
        serializer.serialize_function_call(
            &FunctionCall::by_id(builtins::TIMES)
                .with(start)
                .with(end)
                .with_call(self.iteratee.clone()),
        )
    }
}
