//! Execution-engine contract.
//!
//! The executor knows nothing about virtual-machine semantics; it hands a
//! transaction, a worker view, and the block context to an engine and
//! composes the outcomes. Interpreters, JITs, and test mocks all implement
//! the same capability.

use crate::view::WorkerView;
use shared_types::{Address, LogEntry, SignedTransaction, Timestamp, U256};
use thiserror::Error;

/// Block-level inputs visible to every transaction of a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContext {
    /// Height of the block under construction.
    pub height: u64,
    /// Block timestamp (ms).
    pub timestamp: Timestamp,
    /// Proposing validator.
    pub proposer: Address,
}

/// Per-transaction engine failures.
///
/// Never fatal: the executor rewrites the transaction's receipt to failed
/// with gas-used equal to the declared limit and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Transaction nonce does not match the account nonce.
    #[error("Nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch {
        /// Account's next nonce.
        expected: u64,
        /// Nonce the transaction carried.
        got: u64,
    },

    /// Sender cannot cover value plus fees.
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Value plus maximum fee.
        required: U256,
        /// Sender's balance.
        available: U256,
    },

    /// Declared gas limit below the intrinsic cost.
    #[error("Gas limit {limit} below intrinsic cost {required}")]
    GasLimitTooLow {
        /// Intrinsic gas of this payload.
        required: u64,
        /// Declared limit.
        limit: u64,
    },

    /// Engine-internal failure.
    #[error("Engine internal error: {0}")]
    Internal(String),
}

/// Successful execution outcome; the delta accumulates in the view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Execution {
    /// Gas consumed.
    pub gas_used: u64,
    /// Logs emitted.
    pub logs: Vec<LogEntry>,
}

/// Capability to execute a single transaction against a worker view.
pub trait ExecutionEngine: Send + Sync {
    /// Execute `tx` against `view` under `ctx`.
    ///
    /// On success the view holds the transaction's delta; on error the
    /// executor restores the view and fails only this transaction.
    fn run(
        &self,
        tx: &SignedTransaction,
        view: &mut WorkerView,
        ctx: &BlockContext,
    ) -> Result<Execution, EngineError>;
}
