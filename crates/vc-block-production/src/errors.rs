//! Block-production error types.

use crate::ports::LedgerError;
use thiserror::Error;
use vc_executor::ExecutionError;

/// Errors surfaced by the block loop.
///
/// Only [`BlockProductionError::LedgerAppend`] is fatal; everything else
/// skips the tick and the loop continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockProductionError {
    /// The active validator set is empty; no proposer can be selected.
    #[error("No active validators")]
    NoActiveValidators,

    /// Executor infrastructure failure.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// The execution task itself died.
    #[error("Executor task panicked")]
    ExecutorPanicked,

    /// Ledger append failed. Fatal: the loop stops and signals shutdown.
    #[error(transparent)]
    LedgerAppend(#[from] LedgerError),
}

impl BlockProductionError {
    /// True for errors that must stop the loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BlockProductionError::LedgerAppend(_))
    }
}
