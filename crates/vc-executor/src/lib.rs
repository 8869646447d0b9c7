//! # Parallel Executor
//!
//! Executes a level decomposition against an immutable state snapshot.
//!
//! One level at a time: the level's transactions are partitioned into
//! contiguous shards, dispatched to a fixed pool of worker threads, and
//! each worker executes its shard sequentially against a worker-local view
//! of the current snapshot, accumulating one [`delta::StateDelta`] per
//! transaction. When every shard has returned, a single-threaded merge
//! folds the deltas into the successor snapshot.
//!
//! Static leveling guarantees disjoint write sets within a level; the
//! merge still cross-checks every written resource and arbitrates any
//! overlap the static analysis missed (higher priority wins, losers are
//! aborted at intrinsic gas and recorded by the [`conflict::ConflictTracker`]).
//!
//! The executor does not know virtual-machine semantics. Execution of a
//! single transaction is delegated to an [`engine::ExecutionEngine`]; an
//! engine error or a worker panic fails that transaction only.

pub mod cancel;
pub mod config;
pub mod conflict;
pub mod delta;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod native;
pub mod snapshot;
pub mod view;
mod workers;

pub use cancel::CancelToken;
pub use config::ExecutorConfig;
pub use conflict::{ConflictRecord, ConflictResolution, ConflictTracker, RuntimeConflictKind};
pub use delta::{AccountChange, StateDelta, StorageChange, WriteKey};
pub use engine::{BlockContext, EngineError, Execution, ExecutionEngine};
pub use errors::ExecutionError;
pub use executor::{ExecutionResult, ExecutionStatus, ParallelExecutor};
pub use native::NativeTransferEngine;
pub use snapshot::StateSnapshot;
pub use view::WorkerView;
