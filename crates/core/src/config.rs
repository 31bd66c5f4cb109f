use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_usize(profile: &str, key: &str) -> Option<usize> {
    profiled_env_opt(profile, key).and_then(|v| v.parse().ok())
}

/// Number of units to use when nothing is configured.
pub fn available_units() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

// ── Pool config ───────────────────────────────────────────────

/// Worker pool and scheduling limits, read from `FANOUT_*` env vars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Number of isolated units. 0 = available parallelism.
    pub units: usize,
    /// Upper bound on tasks per job. 0 = same as the resolved unit count.
    pub max_concurrency_level: usize,
    pub min_values_per_worker: Option<usize>,
    pub max_values_per_worker: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            units: 0,
            max_concurrency_level: 0,
            min_values_per_worker: None,
            max_values_per_worker: None,
        }
    }
}

impl PoolConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `FANOUT_PROFILE`. When set (e.g. `BATCH`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("FANOUT_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            units: profiled_env_usize(p, "FANOUT_UNITS").unwrap_or(0),
            max_concurrency_level: profiled_env_usize(p, "FANOUT_MAX_CONCURRENCY").unwrap_or(0),
            min_values_per_worker: profiled_env_usize(p, "FANOUT_MIN_VALUES_PER_WORKER"),
            max_values_per_worker: profiled_env_usize(p, "FANOUT_MAX_VALUES_PER_WORKER"),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Resolve unit count (0 means use available parallelism).
    pub fn resolved_units(&self) -> usize {
        if self.units == 0 {
            available_units()
        } else {
            self.units
        }
    }

    /// Resolve the concurrency level (0 means one task per unit).
    pub fn resolved_max_concurrency_level(&self) -> usize {
        if self.max_concurrency_level == 0 {
            self.resolved_units()
        } else {
            self.max_concurrency_level
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Pool config loaded (profile: {}):", self.profile_label());
        tracing::info!("  units:           {}", self.resolved_units());
        tracing::info!("  max concurrency: {}", self.resolved_max_concurrency_level());
        tracing::info!(
            "  values/worker:   min={:?}, max={:?}",
            self.min_values_per_worker,
            self.max_values_per_worker
        );
    }
}
