//! # Block Production
//!
//! The single coordinator loop of the core. Every `BlockInterval` it
//! advances the height, selects a proposer from the stake-ordered active
//! set, snapshots the mempool's level decomposition, runs the parallel
//! executor, appends the assembled block to the ledger, reports inclusion
//! back to the mempool, and pays rewards.
//!
//! Failure discipline: any step failing other than ledger append skips the
//! tick (the mempool is not drained) and the loop continues; a ledger
//! append failure is fatal and stops the loop.

pub mod config;
pub mod errors;
pub mod ports;
pub mod rewards;
pub mod service;

pub use config::BlockProductionConfig;
pub use errors::BlockProductionError;
pub use ports::{InMemoryLedger, Ledger, LedgerError, ProposerSelector, StakeOrderedSelector};
pub use rewards::{block_subsidy, split_reward, RewardSplit, SupplyLedger};
pub use service::BlockLoop;
