//! # Validator Staking
//!
//! The validator registry: stake table, delegations, unbonding timers,
//! slashing, performance scoring, and reward distribution.
//!
//! Proposer rotation is stake-ordered; the performance score only weights
//! reward distribution. A slow validator whose stake warrants inclusion is
//! never starved of proposer slots.
//!
//! Delegator rewards use an accumulator-per-share scheme: distribution
//! bumps `acc_rewards_per_share`, a delegator's pending reward is
//! `amount × acc − reward_debt`, and claims reset the debt. O(1) per
//! distribution regardless of delegator count.

pub mod config;
pub mod errors;
pub mod registry;
pub mod slashing;

pub use config::StakingConfig;
pub use errors::StakingError;
pub use registry::{
    PerformanceMetrics, ValidatorRecord, ValidatorRegistry, ValidatorStatus, JAILED_FOREVER,
};
pub use slashing::{rule_for, SlashRule, SlashingEvent, ViolationKind};
