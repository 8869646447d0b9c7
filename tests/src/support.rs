//! Shared fixtures for the integration suite.

use shared_types::{Address, SignedTransaction, U256};
use std::sync::{Arc, Mutex, RwLock};
use vc_block_production::{
    BlockLoop, BlockProductionConfig, InMemoryLedger, Ledger, LedgerError,
};
use vc_executor::{ExecutionEngine, ExecutorConfig, ParallelExecutor, StateSnapshot};
use vc_mempool::{Mempool, MempoolConfig};
use vc_staking::{StakingConfig, ValidatorRegistry};

/// One gwei, the gas price unit used throughout the fixtures.
pub const GWEI: u64 = 1_000_000_000;

/// Deterministic keypair for a seed byte.
pub fn keypair(seed: u8) -> shared_crypto::Ed25519KeyPair {
    shared_crypto::Ed25519KeyPair::from_seed([seed; 32])
}

/// Address of the seed's keypair.
pub fn sender(seed: u8) -> Address {
    Address::from(shared_crypto::derive_address(
        keypair(seed).public_key().as_bytes(),
    ))
}

/// A fully signed transaction from the seed's keypair.
pub fn signed_tx(
    seed: u8,
    nonce: u64,
    gas_price: u64,
    value: u64,
    to: Option<Address>,
    data: Vec<u8>,
) -> SignedTransaction {
    let kp = keypair(seed);
    let mut tx = SignedTransaction {
        from: *kp.public_key().as_bytes(),
        to,
        value: U256::from(value),
        nonce,
        gas_price: U256::from(gas_price),
        gas_limit: 100_000,
        data,
        signature: [0u8; 64],
    };
    tx.signature = *kp.sign(&tx.signing_bytes()).as_bytes();
    tx
}

/// Ledger that mirrors every appended block into a shared sink.
pub struct RecordingLedger {
    inner: InMemoryLedger,
    sink: Arc<Mutex<Vec<shared_types::Block>>>,
}

impl Ledger for RecordingLedger {
    fn append(&mut self, block: shared_types::Block) -> Result<(), LedgerError> {
        self.inner.append(block.clone())?;
        self.sink.lock().unwrap().push(block);
        Ok(())
    }
}

/// A wired chain instance with handles the tests can drive and inspect.
pub struct TestChain {
    pub mempool: Arc<Mempool>,
    pub registry: Arc<RwLock<ValidatorRegistry>>,
    pub executor: Arc<ParallelExecutor>,
    pub block_loop: Arc<BlockLoop>,
    pub blocks: Arc<Mutex<Vec<shared_types::Block>>>,
}

/// Tunable pieces of a [`TestChain`].
pub struct ChainSetup {
    pub stakes: Vec<(u8, u128)>,
    pub funded: Vec<u8>,
    pub block_config: BlockProductionConfig,
    pub worker_count: usize,
    pub engine: Arc<dyn ExecutionEngine>,
}

impl Default for ChainSetup {
    fn default() -> Self {
        Self {
            stakes: vec![(1, 1_000)],
            funded: vec![1, 2, 3, 4],
            block_config: BlockProductionConfig {
                initial_subsidy: 10_000,
                ..BlockProductionConfig::default()
            },
            worker_count: 4,
            engine: Arc::new(vc_executor::NativeTransferEngine),
        }
    }
}

/// Build a chain: registry, then mempool, then executor, then loop.
pub fn chain(setup: ChainSetup) -> TestChain {
    let mut registry = ValidatorRegistry::new(StakingConfig {
        min_validator_stake: 10,
        ..StakingConfig::default()
    });
    for (seed, stake) in &setup.stakes {
        registry.register(sender(*seed), *stake, 0).unwrap();
    }
    let registry = Arc::new(RwLock::new(registry));

    let mempool = Arc::new(Mempool::new(MempoolConfig::default()));

    let genesis = Arc::new(StateSnapshot::genesis(
        setup
            .funded
            .iter()
            .map(|seed| (sender(*seed), U256::from(10u64).pow(U256::from(21u64)))),
    ));

    let executor = Arc::new(ParallelExecutor::new(
        ExecutorConfig {
            worker_count: setup.worker_count,
            ..ExecutorConfig::default()
        },
        setup.engine.clone(),
    ));

    let blocks = Arc::new(Mutex::new(Vec::new()));
    let ledger = RecordingLedger {
        inner: InMemoryLedger::new(),
        sink: blocks.clone(),
    };

    let block_loop = Arc::new(BlockLoop::new(
        setup.block_config,
        mempool.clone(),
        executor.clone(),
        registry.clone(),
        Box::new(ledger),
        genesis,
    ));

    TestChain {
        mempool,
        registry,
        executor,
        block_loop,
        blocks,
    }
}
