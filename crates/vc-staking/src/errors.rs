//! Staking error types.

use shared_types::Address;
use thiserror::Error;

/// Errors surfaced by the validator registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StakingError {
    /// Self-stake below the registration minimum.
    #[error("Stake {got} below minimum {min}")]
    StakeBelowMinimum {
        /// Offered self-stake.
        got: u128,
        /// Configured minimum.
        min: u128,
    },

    /// Validator set full and the arriving stake does not strictly exceed
    /// the lowest resident stake.
    #[error("Validator set full: lowest resident stake {lowest}")]
    CapacityFull {
        /// Stake of the cheapest active validator.
        lowest: u128,
    },

    /// No such validator.
    #[error("Unknown validator: {0:?}")]
    UnknownValidator(Address),

    /// No such delegation.
    #[error("Unknown delegation: validator {validator:?}, delegator {delegator:?}")]
    UnknownDelegation {
        /// Delegated-to validator.
        validator: Address,
        /// Delegating account.
        delegator: Address,
    },

    /// Operation not allowed while jailed.
    #[error("Validator jailed: {0:?}")]
    Jailed(Address),

    /// Undelegating more than is delegated.
    #[error("Insufficient delegation: have {have}, requested {requested}")]
    InsufficientDelegation {
        /// Currently delegated amount.
        have: u128,
        /// Requested withdrawal.
        requested: u128,
    },
}
