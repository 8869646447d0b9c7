//! Subsidy schedule and reward split.

use crate::config::BlockProductionConfig;

/// Basis-point denominator.
const BPS: u128 = 10_000;

/// Per-block subsidy at `height`.
///
/// Halves every `halving_interval` blocks: heights `1..=interval` pay the
/// initial subsidy, the next era half of it, and so on. Zero after 64
/// halvings, where the shift would underflow anyway.
pub fn block_subsidy(height: u64, initial_subsidy: u128, halving_interval: u64) -> u128 {
    if height == 0 || halving_interval == 0 {
        return 0;
    }
    let halvings = (height - 1) / halving_interval;
    if halvings >= 64 {
        return 0;
    }
    initial_subsidy >> halvings
}

/// Outcome of splitting one block's reward pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardSplit {
    /// Share paid to the proposer's validator record.
    pub proposer: u128,
    /// Share removed from supply.
    pub burn: u128,
    /// Share accumulated for the epoch treasury payout.
    pub treasury: u128,
}

/// Split `total` by the configured basis points. Integer remainders land
/// in the treasury so the three shares always sum to `total`.
pub fn split_reward(total: u128, config: &BlockProductionConfig) -> RewardSplit {
    let proposer = total * config.proposer_share_bps as u128 / BPS;
    let burn = total * config.burn_share_bps as u128 / BPS;
    RewardSplit {
        proposer,
        burn,
        treasury: total - proposer - burn,
    }
}

/// Supply accounting across blocks.
///
/// Token conservation is checked against this ledger:
/// `supply_after = supply_before + subsidy − burn`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SupplyLedger {
    /// Total subsidy minted so far.
    pub minted: u128,
    /// Total burned so far.
    pub burned: u128,
    /// Cumulative treasury share routed to the stake-weighted validator
    /// pool.
    pub treasury: u128,
}

impl SupplyLedger {
    /// Account one block's mint and split.
    pub fn on_block(&mut self, subsidy: u128, split: &RewardSplit) {
        self.minted += subsidy;
        self.burned += split.burn;
        self.treasury += split.treasury;
    }

    /// Circulating supply given the chain's initial allocation.
    pub fn supply(&self, initial_supply: u128) -> u128 {
        initial_supply + self.minted - self.burned
    }
}
