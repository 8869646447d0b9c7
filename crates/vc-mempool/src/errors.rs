//! Mempool error types.
//!
//! Rejections (bad input, do not retry unchanged): `BadSignature`,
//! `NonceTooLow`, `Underpriced`, `InvalidFormat`, `AlreadyKnown`.
//! Transient (retry later): `PoolFull`, `QueueFull`.

use shared_types::{Hash, U256};
use thiserror::Error;

/// Errors returned by transaction admission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MempoolError {
    /// Signature does not verify against the embedded public key.
    #[error("Bad signature")]
    BadSignature,

    /// The transaction is already pending or queued.
    #[error("Already known: {0:?}")]
    AlreadyKnown(Hash),

    /// Nonce is below the sender's next admissible nonce.
    #[error("Nonce too low: got {got}, expected at least {expected}")]
    NonceTooLow {
        /// Nonce carried by the transaction.
        got: u64,
        /// Lowest admissible nonce for the sender.
        expected: u64,
    },

    /// Insufficient gas-price bump to replace the pending transaction
    /// occupying the same (sender, nonce).
    #[error("Underpriced: gas price {gas_price} below required {required}")]
    Underpriced {
        /// Offered gas price.
        gas_price: U256,
        /// Minimum acceptable gas price for the replacement.
        required: U256,
    },

    /// Pool at capacity and the arrival does not outbid the cheapest
    /// resident.
    #[error("Pool full: capacity {capacity}")]
    PoolFull {
        /// Configured `global_slots`.
        capacity: usize,
    },

    /// The sender's nonce-gap side-table is at capacity.
    #[error("Queue full for sender: capacity {capacity}")]
    QueueFull {
        /// Configured per-sender queue capacity.
        capacity: usize,
    },

    /// The submitted bytes do not decode into a transaction.
    #[error("Invalid transaction format")]
    InvalidFormat,
}
