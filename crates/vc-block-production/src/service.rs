//! The block loop.
//!
//! A single coordinator: one tokio task firing on a fixed interval. Each
//! tick is one attempt at a block; executor work runs on the blocking pool
//! so worker threads never stall the runtime, and a watchdog cancels the
//! execution token when the tick budget runs out.

use crate::config::BlockProductionConfig;
use crate::errors::BlockProductionError;
use crate::ports::{Ledger, ProposerSelector, StakeOrderedSelector};
use crate::rewards::{block_subsidy, split_reward, SupplyLedger};
use shared_types::{Block, BlockHeader, Hash, Timestamp, U256};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use vc_executor::{
    BlockContext, CancelToken, ExecutionStatus, ParallelExecutor, StateSnapshot,
};
use vc_mempool::Mempool;
use vc_staking::ValidatorRegistry;

/// Committed chain tip.
#[derive(Clone, Copy, Debug)]
struct ChainTip {
    height: u64,
    parent_hash: Hash,
}

/// Fixed-interval block producer.
pub struct BlockLoop {
    config: BlockProductionConfig,
    mempool: Arc<Mempool>,
    executor: Arc<ParallelExecutor>,
    registry: Arc<RwLock<ValidatorRegistry>>,
    ledger: Mutex<Box<dyn Ledger>>,
    selector: Box<dyn ProposerSelector>,
    state: RwLock<Arc<StateSnapshot>>,
    tip: Mutex<ChainTip>,
    supply: Mutex<SupplyLedger>,
    cancel: CancelToken,
}

impl BlockLoop {
    /// Assemble the loop over already-initialised collaborators.
    /// Initialisation order is registry → mempool → executor → loop.
    pub fn new(
        config: BlockProductionConfig,
        mempool: Arc<Mempool>,
        executor: Arc<ParallelExecutor>,
        registry: Arc<RwLock<ValidatorRegistry>>,
        ledger: Box<dyn Ledger>,
        genesis: Arc<StateSnapshot>,
    ) -> Self {
        let tip = ChainTip {
            height: genesis.height(),
            parent_hash: Hash::zero(),
        };
        Self {
            config,
            mempool,
            executor,
            registry,
            ledger: Mutex::new(ledger),
            selector: Box::new(StakeOrderedSelector),
            state: RwLock::new(genesis),
            tip: Mutex::new(tip),
            supply: Mutex::new(SupplyLedger::default()),
            cancel: CancelToken::new(),
        }
    }

    /// Swap in a custom proposer-selection hook.
    pub fn with_selector(mut self, selector: Box<dyn ProposerSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Token that stops the loop when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Currently committed snapshot.
    pub fn state(&self) -> Arc<StateSnapshot> {
        self.state.read().expect("state lock poisoned").clone()
    }

    /// Committed height.
    pub fn height(&self) -> u64 {
        self.tip.lock().expect("tip lock poisoned").height
    }

    /// Supply accounting so far.
    pub fn supply(&self) -> SupplyLedger {
        *self.supply.lock().expect("supply lock poisoned")
    }

    /// Run until cancelled or a fatal error.
    pub async fn run(&self) -> Result<(), BlockProductionError> {
        info!(
            interval_ms = self.config.block_interval_ms,
            "block loop started"
        );
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.block_interval_ms.max(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            if self.cancel.is_cancelled() {
                info!("block loop cancelled, shutting down");
                return Ok(());
            }

            match self.tick().await {
                Ok(Some(block)) => {
                    debug!(
                        height = block.header.height,
                        txs = block.receipts.len(),
                        "block finalised"
                    );
                }
                Ok(None) => {
                    debug!("tick skipped");
                }
                Err(err) if err.is_fatal() => {
                    error!("fatal block loop error: {err}");
                    self.cancel.cancel();
                    return Err(err);
                }
                Err(err) => {
                    warn!("tick failed, block skipped: {err}");
                }
            }
        }
    }

    /// One block attempt. `Ok(None)` means the tick was skipped
    /// (interrupted or cancelled) and the mempool was left undrained.
    pub async fn tick(&self) -> Result<Option<Block>, BlockProductionError> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }
        let now = now_millis();

        // 1. Advance height, fetch the active set.
        let (height, parent_hash) = {
            let tip = self.tip.lock().expect("tip lock poisoned");
            (tip.height + 1, tip.parent_hash)
        };
        let validators = {
            let mut registry = self.registry.write().expect("registry lock poisoned");
            registry.unjail_expired(now);
            registry.active_validators()
        };
        if validators.is_empty() {
            return Err(BlockProductionError::NoActiveValidators);
        }

        // 2. Proposer selection (hook point).
        let proposer = self
            .selector
            .select(height, &validators)
            .ok_or(BlockProductionError::NoActiveValidators)?;

        // 3. Level snapshot.
        let levels = self.mempool.levels();

        // 4. Execute under the tick budget.
        let base = self.state();
        let ctx = BlockContext {
            height,
            timestamp: now,
            proposer,
        };
        let tick_cancel = CancelToken::new();
        let watchdog = tokio::spawn({
            let budget = Duration::from_millis(self.config.max_execution_time_ms);
            let token = tick_cancel.clone();
            async move {
                tokio::time::sleep(budget).await;
                token.cancel();
            }
        });
        let executor = self.executor.clone();
        let exec_ctx = ctx.clone();
        let result = tokio::task::spawn_blocking(move || {
            executor.execute(&levels, base, &exec_ctx, &tick_cancel)
        })
        .await
        .map_err(|_| BlockProductionError::ExecutorPanicked)??;
        watchdog.abort();

        if result.status == ExecutionStatus::Interrupted {
            warn!(height, "tick exceeded budget or was cancelled, discarding");
            return Ok(None);
        }

        // 5. Assemble the block.
        let block = Block {
            header: BlockHeader {
                height,
                parent_hash,
                state_root: result.successor.root(),
                proposer,
                timestamp: ctx.timestamp,
                gas_used: result.gas_used,
            },
            receipts: result.receipts,
        };

        // 6. Append. Fatal on failure.
        self.ledger
            .lock()
            .expect("ledger lock poisoned")
            .append(block.clone())?;

        // Commit the successor state and tip.
        *self.state.write().expect("state lock poisoned") = result.successor;
        {
            let mut tip = self.tip.lock().expect("tip lock poisoned");
            tip.height = height;
            tip.parent_hash = block.hash();
        }

        // 7. Report inclusion.
        let included = block.included_hashes();
        if !included.is_empty() {
            self.mempool.remove_included(&included);
        }

        // 8. Rewards: subsidy plus fees, split by policy.
        let subsidy = block_subsidy(height, self.config.initial_subsidy, self.config.halving_interval);
        let fees: u128 = block
            .receipts
            .iter()
            .map(|r| u256_to_u128_saturating(r.fee()))
            .sum();
        let split = split_reward(subsidy + fees, &self.config);
        self.supply
            .lock()
            .expect("supply lock poisoned")
            .on_block(subsidy, &split);
        {
            let mut registry = self.registry.write().expect("registry lock poisoned");
            if let Err(err) = registry.distribute(split.proposer, proposer) {
                // The block is already final; reward loss is logged, never
                // unwound.
                warn!(height, "proposer reward distribution failed: {err}");
            }
            registry.distribute_weighted(split.treasury);
        }

        // 9. Epoch rollup: counter plus performance-metric rollup.
        if height % self.config.epoch_blocks.max(1) == 0 {
            let mut registry = self.registry.write().expect("registry lock poisoned");
            let epoch = registry.epoch_rollup();
            info!(height, epoch, "epoch boundary processed");
        }

        Ok(Some(block))
    }
}

fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

fn u256_to_u128_saturating(value: U256) -> u128 {
    if value > U256::from(u128::MAX) {
        u128::MAX
    } else {
        value.as_u128()
    }
}
