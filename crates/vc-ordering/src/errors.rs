//! Ordering error types.

use shared_types::Hash;
use thiserror::Error;

/// Errors surfaced by the ordering layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderingError {
    /// The graph contains a cycle. Admission-ordered edge insertion makes
    /// this unreachable; it is checked anyway because a cyclic schedule
    /// would deadlock the executor.
    #[error("Dependency cycle detected")]
    CycleDetected,

    /// A referenced node is not in the graph.
    #[error("Unknown graph node: {0:?}")]
    UnknownNode(Hash),
}
