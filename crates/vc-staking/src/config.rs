//! Staking configuration.

use serde::Deserialize;

/// Fourteen days in milliseconds.
const DEFAULT_UNBONDING_MS: u64 = 14 * 24 * 60 * 60 * 1000;

/// Runtime configuration for the validator registry.
#[derive(Clone, Debug, Deserialize)]
pub struct StakingConfig {
    /// Minimum self-stake to register as a validator, in chain units.
    pub min_validator_stake: u128,

    /// Maximum simultaneously active validators.
    pub max_validators: usize,

    /// Delay between undelegation and fund release, in milliseconds.
    pub unbonding_period_ms: u64,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            min_validator_stake: 1_000,
            max_validators: 21,
            unbonding_period_ms: DEFAULT_UNBONDING_MS,
        }
    }
}
