//! Node assembly.
//!
//! Wires the transaction core together in the mandated order (registry,
//! mempool, executor, block loop) and exposes the handles the front end
//! (or tests) drive. Every component is passed explicitly; nothing lives
//! in module-level state.

use crate::config::NodeConfig;
use crate::genesis::GenesisSpec;
use std::sync::{Arc, RwLock};
use tracing::info;
use vc_block_production::{BlockLoop, InMemoryLedger};
use vc_executor::{NativeTransferEngine, ParallelExecutor};
use vc_mempool::Mempool;
use vc_staking::ValidatorRegistry;

/// A fully wired chain instance.
pub struct Node {
    /// Pending-transaction store.
    pub mempool: Arc<Mempool>,
    /// Validator registry.
    pub registry: Arc<RwLock<ValidatorRegistry>>,
    /// Parallel executor.
    pub executor: Arc<ParallelExecutor>,
    /// Block production loop.
    pub block_loop: Arc<BlockLoop>,
}

impl Node {
    /// Build a node from configuration and genesis.
    pub fn build(config: NodeConfig, genesis: &GenesisSpec) -> anyhow::Result<Self> {
        info!("initialising chain core");

        let registry = Arc::new(RwLock::new(genesis.build_registry(config.staking)?));
        info!(
            validators = registry.read().expect("registry lock poisoned").active_validators().len(),
            "validator registry ready"
        );

        let mempool = Arc::new(Mempool::new(config.mempool));
        let snapshot = Arc::new(genesis.build_snapshot());
        info!(accounts = snapshot.account_count(), "genesis state loaded");

        let executor = Arc::new(ParallelExecutor::new(
            config.executor,
            Arc::new(NativeTransferEngine),
        ));

        let block_loop = Arc::new(BlockLoop::new(
            config.block_production,
            mempool.clone(),
            executor.clone(),
            registry.clone(),
            Box::new(InMemoryLedger::new()),
            snapshot,
        ));

        Ok(Self {
            mempool,
            registry,
            executor,
            block_loop,
        })
    }

    /// Run the block loop until cancellation or a fatal error.
    pub async fn run(&self) -> anyhow::Result<()> {
        self.block_loop.run().await?;
        Ok(())
    }

    /// Signal cooperative shutdown.
    pub fn shutdown(&self) {
        info!("shutdown requested");
        self.block_loop.cancel_token().cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vc_staking::StakingConfig;

    fn dev_config() -> NodeConfig {
        NodeConfig {
            staking: StakingConfig {
                min_validator_stake: 1_000,
                ..StakingConfig::default()
            },
            ..NodeConfig::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_and_tick() {
        let node = Node::build(dev_config(), &GenesisSpec::dev()).unwrap();
        let block = node.block_loop.tick().await.unwrap().unwrap();

        assert_eq!(block.header.height, 1);
        assert_eq!(node.block_loop.height(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_submitted_transfer_lands_in_block() {
        let node = Node::build(dev_config(), &GenesisSpec::dev()).unwrap();

        let keypair = shared_crypto::Ed25519KeyPair::from_seed([1; 32]);
        let mut tx = shared_types::SignedTransaction {
            from: *keypair.public_key().as_bytes(),
            to: Some(shared_types::Address::from_low_u64_be(0xBEEF)),
            value: shared_types::U256::from(1_234u64),
            nonce: 0,
            gas_price: shared_types::U256::from(1_000_000_000u64),
            gas_limit: 21_000,
            data: vec![],
            signature: [0u8; 64],
        };
        tx.signature = *keypair.sign(&tx.signing_bytes()).as_bytes();

        let hash = node.mempool.submit_tx(tx).unwrap();
        let block = node.block_loop.tick().await.unwrap().unwrap();

        assert!(block.included_hashes().contains(&hash));
        assert!(!node.mempool.contains(&hash));
        let state = node.block_loop.state();
        assert_eq!(
            state
                .account(&shared_types::Address::from_low_u64_be(0xBEEF))
                .unwrap()
                .balance,
            shared_types::U256::from(1_234u64)
        );
    }
}
