pub mod envelope;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod pool;
pub mod traits;
pub mod unit;

pub use envelope::TaskEnvelope;
pub use error::TaskError;
pub use handle::TaskHandle;
pub use metrics::PoolMetrics;
pub use pool::{IsolatedThreadPool, IsolatedThreadPoolBuilder};
pub use traits::ThreadPool;
pub use unit::{IsolatedUnit, TaskOutcome};
