//! Block-production configuration.

use serde::Deserialize;

/// Runtime configuration for the block loop.
#[derive(Clone, Debug, Deserialize)]
pub struct BlockProductionConfig {
    /// Tick interval in milliseconds.
    pub block_interval_ms: u64,

    /// Per-tick execution budget; exceeding it interrupts the tick.
    pub max_execution_time_ms: u64,

    /// Blocks between subsidy halvings.
    pub halving_interval: u64,

    /// Blocks per epoch; each epoch boundary rolls up performance metrics
    /// and pays out the treasury pool.
    pub epoch_blocks: u64,

    /// Subsidy of the first halving era, in chain units.
    pub initial_subsidy: u128,

    /// Proposer share of block rewards, in basis points.
    pub proposer_share_bps: u64,

    /// Burned share of block rewards, in basis points.
    pub burn_share_bps: u64,

    /// Treasury share of block rewards, in basis points.
    pub treasury_share_bps: u64,
}

impl Default for BlockProductionConfig {
    fn default() -> Self {
        Self {
            block_interval_ms: 2_000,
            max_execution_time_ms: 5_000,
            halving_interval: 2_100_000,
            epoch_blocks: 100,
            initial_subsidy: 5_000_000_000,
            proposer_share_bps: 6_000,
            burn_share_bps: 2_000,
            treasury_share_bps: 2_000,
        }
    }
}
