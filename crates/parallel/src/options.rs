use std::fmt;
use std::sync::Arc;

use fanout_core::config::{available_units, PoolConfig};
use fanout_pool::ThreadPool;

use crate::error::ParallelError;
use crate::scheduler::{DefaultParallelScheduler, ParallelScheduler};

/// A user option that can also clear the default it overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting<T> {
    /// Keep the default.
    Inherit,
    Set(T),
    /// Explicitly remove the default.
    Unset,
}

impl<T> Default for Setting<T> {
    fn default() -> Self {
        Self::Inherit
    }
}

impl<T: Clone> Setting<T> {
    fn resolve(&self, default: Option<T>) -> Option<T> {
        match self {
            Self::Inherit => default,
            Self::Set(value) => Some(value.clone()),
            Self::Unset => None,
        }
    }
}

/// Per-call overrides, merged over [`DefaultParallelOptions`].
///
/// # Example
/// ```ignore
/// let options = ParallelOptions::default()
///     .max_concurrency_level(8)
///     .max_values_per_worker(1_000);
/// ```
#[derive(Clone, Default)]
pub struct ParallelOptions {
    pub thread_pool: Setting<Arc<dyn ThreadPool>>,
    pub scheduler: Option<Arc<dyn ParallelScheduler>>,
    pub max_concurrency_level: Option<usize>,
    pub min_values_per_worker: Setting<usize>,
    pub max_values_per_worker: Setting<usize>,
}

impl ParallelOptions {
    pub fn thread_pool(mut self, pool: Arc<dyn ThreadPool>) -> Self {
        self.thread_pool = Setting::Set(pool);
        self
    }

    /// Remove the pool. Merging these options always fails; the pool is
    /// mandatory.
    pub fn unset_thread_pool(mut self) -> Self {
        self.thread_pool = Setting::Unset;
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn ParallelScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn max_concurrency_level(mut self, level: usize) -> Self {
        self.max_concurrency_level = Some(level);
        self
    }

    pub fn min_values_per_worker(mut self, values: usize) -> Self {
        self.min_values_per_worker = Setting::Set(values);
        self
    }

    pub fn max_values_per_worker(mut self, values: usize) -> Self {
        self.max_values_per_worker = Setting::Set(values);
        self
    }

    pub fn unset_min_values_per_worker(mut self) -> Self {
        self.min_values_per_worker = Setting::Unset;
        self
    }

    pub fn unset_max_values_per_worker(mut self) -> Self {
        self.max_values_per_worker = Setting::Unset;
        self
    }
}

impl fmt::Debug for ParallelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pool = match &self.thread_pool {
            Setting::Inherit => "inherit",
            Setting::Set(_) => "set",
            Setting::Unset => "unset",
        };
        f.debug_struct("ParallelOptions")
            .field("thread_pool", &pool)
            .field("scheduler", &self.scheduler.as_ref().map(|_| "custom"))
            .field("max_concurrency_level", &self.max_concurrency_level)
            .field("min_values_per_worker", &self.min_values_per_worker)
            .field("max_values_per_worker", &self.max_values_per_worker)
            .finish()
    }
}

/// Fully resolved options: every mandatory field is present.
#[derive(Clone)]
pub struct DefaultParallelOptions {
    pub thread_pool: Arc<dyn ThreadPool>,
    pub scheduler: Arc<dyn ParallelScheduler>,
    pub max_concurrency_level: usize,
    pub min_values_per_worker: Option<usize>,
    pub max_values_per_worker: Option<usize>,
}

impl DefaultParallelOptions {
    /// One task per available core, no per-worker value limits.
    pub fn new(thread_pool: Arc<dyn ThreadPool>) -> Self {
        Self {
            thread_pool,
            scheduler: Arc::new(DefaultParallelScheduler),
            max_concurrency_level: available_units(),
            min_values_per_worker: None,
            max_values_per_worker: None,
        }
    }

    /// Scheduling limits taken from `FANOUT_*` configuration.
    pub fn from_config(
        thread_pool: Arc<dyn ThreadPool>,
        config: &PoolConfig,
    ) -> Result<Self, ParallelError> {
        let options = Self {
            max_concurrency_level: config.resolved_max_concurrency_level(),
            min_values_per_worker: config.min_values_per_worker,
            max_values_per_worker: config.max_values_per_worker,
            ..Self::new(thread_pool)
        };
        options.validate()?;
        Ok(options)
    }

    /// Merge `options` over these defaults and validate the result.
    pub fn merge(&self, options: &ParallelOptions) -> Result<Self, ParallelError> {
        let thread_pool = match &options.thread_pool {
            Setting::Inherit => Arc::clone(&self.thread_pool),
            Setting::Set(pool) => Arc::clone(pool),
            Setting::Unset => {
                return Err(ParallelError::configuration(
                    "the thread pool is mandatory and cannot be unset",
                ))
            }
        };

        let merged = Self {
            thread_pool,
            scheduler: options
                .scheduler
                .clone()
                .unwrap_or_else(|| Arc::clone(&self.scheduler)),
            max_concurrency_level: options
                .max_concurrency_level
                .unwrap_or(self.max_concurrency_level),
            min_values_per_worker: options
                .min_values_per_worker
                .resolve(self.min_values_per_worker),
            max_values_per_worker: options
                .max_values_per_worker
                .resolve(self.max_values_per_worker),
        };
        merged.validate()?;
        Ok(merged)
    }

    pub fn validate(&self) -> Result<(), ParallelError> {
        if self.max_concurrency_level == 0 {
            return Err(ParallelError::configuration(
                "max_concurrency_level must be at least 1",
            ));
        }
        if self.max_values_per_worker == Some(0) {
            return Err(ParallelError::configuration(
                "max_values_per_worker must be at least 1",
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for DefaultParallelOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultParallelOptions")
            .field("max_concurrency_level", &self.max_concurrency_level)
            .field("min_values_per_worker", &self.min_values_per_worker)
            .field("max_values_per_worker", &self.max_values_per_worker)
            .finish_non_exhaustive()
    }
}
