//! Data-parallel map/filter/reduce chains over a pool of isolated units.
//!
//! Functions cross into a unit only as registered ids plus data, so every
//! callable used in a chain must be registered in the pool's
//! [`FunctionRegistry`](fanout_core::FunctionRegistry) first.

pub mod chain;
pub mod error;
pub mod generator;
pub mod job;
pub mod options;
pub mod scheduler;

use std::sync::{Arc, RwLock};

use fanout_core::{FunctionCall, Value};
use fanout_pool::{TaskHandle, ThreadPool};

pub use chain::{ChainHandle, ParallelChain, ReduceHandle};
pub use error::ParallelError;
pub use generator::{CollectionGenerator, ParallelGenerator, RangeGenerator, TimesGenerator};
pub use job::{Operation, OperationKind, ParallelEnvironment, ParallelJob};
pub use options::{DefaultParallelOptions, ParallelOptions, Setting};
pub use scheduler::{
    compute_scheduling, DefaultParallelScheduler, ParallelScheduler, SchedulingConstraints,
    TaskScheduling,
};

/// Entry point for building chains against a set of default options.
pub struct Parallel {
    defaults: RwLock<DefaultParallelOptions>,
}

impl Parallel {
    pub fn new(defaults: DefaultParallelOptions) -> Self {
        Self {
            defaults: RwLock::new(defaults),
        }
    }

    /// Defaults for `pool`: one task per available core.
    pub fn with_pool(pool: Arc<dyn ThreadPool>) -> Self {
        Self::new(DefaultParallelOptions::new(pool))
    }

    pub fn default_options(&self) -> DefaultParallelOptions {
        self.defaults
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Merge `options` into the defaults used by every later chain.
    pub fn set_default_options(&self, options: &ParallelOptions) -> Result<(), ParallelError> {
        let mut defaults = self
            .defaults
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *defaults = defaults.merge(options)?;
        Ok(())
    }

    /// Chain over an in-memory collection.
    pub fn from<I, T>(&self, values: I) -> ParallelChain
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        self.chain(CollectionGenerator::new(values))
    }

    /// Chain over `start..end` by `step` (default 1, or -1 when `end < start`).
    pub fn range(
        &self,
        start: i64,
        end: i64,
        step: Option<i64>,
    ) -> Result<ParallelChain, ParallelError> {
        Ok(self.chain(RangeGenerator::new(start, end, step)?))
    }

    /// Chain over `iteratee(i, env)` for `i in 0..n`.
    pub fn times(&self, n: usize, iteratee: impl Into<FunctionCall>) -> ParallelChain {
        self.chain(TimesGenerator::new(n, iteratee))
    }

    /// Run a single call as its own task.
    pub fn schedule(&self, call: &FunctionCall) -> Result<TaskHandle, ParallelError> {
        Ok(self.default_options().thread_pool.schedule(call)?)
    }

    /// Chain over any generator.
    pub fn chain(&self, generator: impl ParallelGenerator + 'static) -> ParallelChain {
        ParallelChain::new(Arc::new(generator), self.default_options())
    }
}
