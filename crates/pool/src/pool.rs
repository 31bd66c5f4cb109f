//! In-process worker pool whose units share nothing but the registry.
//!
//! Each unit is a thread of a dedicated rayon pool. A task reaches a unit
//! only as MessagePack bytes and its result comes back the same way, so no
//! caller object is ever visible to a unit. Tasks beyond the unit count wait
//! in the rayon queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use fanout_core::{FunctionCallSerializer, FunctionRegistry, PoolConfig, TaskDefinition};

use crate::envelope::{TaskEnvelope, TASK_DEFINITION};
use crate::error::TaskError;
use crate::handle::TaskHandle;
use crate::metrics::PoolMetrics;
use crate::traits::ThreadPool;
use crate::unit::{IsolatedUnit, TaskOutcome};

// ── Builder ──────────────────────────────────────────────────────────

/// Fluent builder for an [`IsolatedThreadPool`].
///
/// # Example
/// ```ignore
/// let pool = IsolatedThreadPool::builder(registry)
///     .units(4)
///     .thread_name_prefix("fanout-unit")
///     .build()?;
/// ```
pub struct IsolatedThreadPoolBuilder {
    registry: Arc<FunctionRegistry>,
    units: usize,
    thread_name_prefix: String,
}

impl IsolatedThreadPoolBuilder {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            units: 0,
            thread_name_prefix: "fanout-unit".to_string(),
        }
    }

    /// Number of units (default: available parallelism).
    pub fn units(mut self, units: usize) -> Self {
        self.units = units;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Result<IsolatedThreadPool, TaskError> {
        let units = if self.units == 0 {
            fanout_core::config::available_units()
        } else {
            self.units
        };

        let prefix = self.thread_name_prefix;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(units)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()
            .map_err(|e| TaskError::Pool(format!("failed to build unit pool: {e}")))?;

        info!(units, functions = self.registry.len(), "worker pool started");

        Ok(IsolatedThreadPool {
            registry: self.registry,
            pool,
            units,
            metrics: Arc::new(RwLock::new(PoolMetrics::default())),
            active_units: Arc::new(AtomicUsize::new(0)),
        })
    }
}

// ── Pool ─────────────────────────────────────────────────────────────

/// Fixed set of isolated units backed by a rayon thread pool.
pub struct IsolatedThreadPool {
    registry: Arc<FunctionRegistry>,
    pool: rayon::ThreadPool,
    units: usize,
    metrics: Arc<RwLock<PoolMetrics>>,
    active_units: Arc<AtomicUsize>,
}

impl IsolatedThreadPool {
    pub fn builder(registry: Arc<FunctionRegistry>) -> IsolatedThreadPoolBuilder {
        IsolatedThreadPoolBuilder::new(registry)
    }

    /// Build a pool sized from `FANOUT_UNITS` style configuration.
    pub fn from_config(
        registry: Arc<FunctionRegistry>,
        config: &PoolConfig,
    ) -> Result<Self, TaskError> {
        Self::builder(registry).units(config.resolved_units()).build()
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn active_units(&self) -> usize {
        self.active_units.load(Ordering::Relaxed)
    }

    /// Get a snapshot of the current pool metrics.
    pub fn metrics(&self) -> PoolMetrics {
        let mut snapshot = self
            .metrics
            .read()
            .map(|m| m.clone())
            .unwrap_or_default();
        snapshot.active_units = self.active_units();
        snapshot.unit_utilization = snapshot.active_units as f64 / self.units as f64;
        snapshot
    }
}

impl ThreadPool for IsolatedThreadPool {
    fn schedule_task(&self, definition: TaskDefinition) -> TaskHandle {
        let task_index = definition.task_index;

        let envelope = match TaskEnvelope::new(TASK_DEFINITION, &definition) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(task_index, error = %e, "failed to encode task definition");
                return TaskHandle::failed(task_index, e);
            }
        };
        let request = match envelope.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(task_index, error = %e, "failed to encode task envelope");
                return TaskHandle::failed(task_index, e);
            }
        };
        let correlation_id = envelope.correlation_id;

        if let Ok(mut m) = self.metrics.write() {
            m.record_scheduled();
        }

        let (tx, handle) = TaskHandle::channel(task_index);
        let registry = Arc::clone(&self.registry);
        let metrics = Arc::clone(&self.metrics);
        let active_units = Arc::clone(&self.active_units);

        debug!(task_index, bytes = request.len(), %correlation_id, "dispatching task");
        self.pool.spawn(move || {
            active_units.fetch_add(1, Ordering::Relaxed);
            let started = Instant::now();

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                IsolatedUnit::new(&registry).handle(&request)
            }))
            .unwrap_or_else(|_| {
                Err(TaskError::Execution {
                    task_index,
                    message: "unit panicked".to_string(),
                })
            })
            .and_then(|reply| TaskOutcome::from_reply(&reply, correlation_id));

            let elapsed = started.elapsed();
            if let Ok(mut m) = metrics.write() {
                m.record_finished(elapsed, result.is_ok());
            }
            match &result {
                Ok(_) => debug!(task_index, ?elapsed, "task completed"),
                Err(e) => warn!(task_index, error = %e, "task failed"),
            }

            if tx.send(result).is_err() {
                debug!(task_index, "task handle dropped before completion");
            }
            active_units.fetch_sub(1, Ordering::Relaxed);
        });

        handle
    }

    fn create_function_serializer(&self) -> FunctionCallSerializer {
        FunctionCallSerializer::new(Arc::clone(&self.registry))
    }
}
