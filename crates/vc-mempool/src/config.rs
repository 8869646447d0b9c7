//! Mempool configuration.

use serde::Deserialize;

/// Runtime configuration for the mempool.
#[derive(Clone, Debug, Deserialize)]
pub struct MempoolConfig {
    /// Capacity of the pending pool across all senders.
    pub global_slots: usize,

    /// Minimum gas-price bump, in percent, required to replace a pending
    /// transaction with the same (sender, nonce).
    pub price_bump_percent: u64,

    /// Capacity of the nonce-gapped side-table per sender.
    pub max_queued_per_sender: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            global_slots: 100_000,
            price_bump_percent: 10,
            max_queued_per_sender: 64,
        }
    }
}
