//! Node configuration.
//!
//! Aggregates the per-subsystem configurations into one deserializable
//! document. Every field has a default, so an empty config file (or none
//! at all) boots a working node.

use serde::Deserialize;
use std::path::Path;
use vc_block_production::BlockProductionConfig;
use vc_executor::ExecutorConfig;
use vc_mempool::MempoolConfig;
use vc_staking::StakingConfig;

/// Full node configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Mempool admission and capacity settings.
    pub mempool: MempoolConfig,
    /// Executor worker pool and memory bounds.
    pub executor: ExecutorConfig,
    /// Validator registry settings.
    pub staking: StakingConfig,
    /// Block loop settings.
    pub block_production: BlockProductionConfig,
}

impl NodeConfig {
    /// Load from a JSON file; missing fields fall back to defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
