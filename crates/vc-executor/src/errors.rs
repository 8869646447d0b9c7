//! Executor error types.
//!
//! Engine failures never appear here; they are absorbed into failed
//! receipts. These errors are infrastructure-level: a disconnected worker
//! pool or a corrupt snapshot, both fatal to the core.

use thiserror::Error;

/// Fatal executor errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// A worker channel closed unexpectedly.
    #[error("Worker pool disconnected")]
    WorkerPoolDisconnected,

    /// The snapshot violated an internal invariant.
    #[error("Snapshot corruption: {0}")]
    SnapshotCorruption(String),
}
