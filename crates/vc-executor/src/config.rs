//! Executor configuration.

use serde::Deserialize;

/// Runtime configuration for the parallel executor.
#[derive(Clone, Debug, Deserialize)]
pub struct ExecutorConfig {
    /// Fixed worker-pool size.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Maximum transactions dispatched per level sub-batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Cap on snapshot-plus-deltas memory, in bytes. Levels whose
    /// projected footprint exceeds it are split into sequential
    /// sub-batches. `None` disables the bound.
    #[serde(default)]
    pub memory_limit: Option<usize>,
}

fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}

fn default_batch_size() -> usize {
    100
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            batch_size: default_batch_size(),
            memory_limit: None,
        }
    }
}
