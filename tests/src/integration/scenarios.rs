//! End-to-end scenarios across mempool, executor, staking, and the block
//! loop.

use crate::support::{chain, sender, signed_tx, ChainSetup, GWEI};
use shared_types::{Address, Hash, ReceiptStatus, INTRINSIC_GAS, U256};
use std::sync::Arc;
use vc_block_production::BlockProductionConfig;
use vc_executor::{
    BlockContext, ConflictResolution, EngineError, Execution, ExecutionEngine,
    RuntimeConflictKind, WorkerView,
};
use vc_ordering::analyzer::heuristic_slot;

/// Four transactions from distinct senders, each touching only its sender:
/// one level, receipts in priority order, balances debited by fee.
#[tokio::test(flavor = "multi_thread")]
async fn scenario_independent_parallelism() {
    let chain = chain(ChainSetup::default());

    let mut hashes = Vec::new();
    for seed in 1..=4u8 {
        let tx = signed_tx(seed, 0, GWEI * seed as u64, 0, None, vec![]);
        hashes.push(chain.mempool.submit_tx(tx).unwrap());
    }

    let levels = chain.mempool.levels();
    assert_eq!(levels.len(), 1);
    assert_eq!(levels[0].len(), 4);

    let balances_before: Vec<U256> = (1..=4u8)
        .map(|seed| {
            chain
                .block_loop
                .state()
                .account(&sender(seed))
                .unwrap()
                .balance
        })
        .collect();

    let block = chain.block_loop.tick().await.unwrap().unwrap();

    assert_eq!(block.receipts.len(), 4);
    // Priority descending: seed 4 paid the highest gas price.
    for (idx, receipt) in block.receipts.iter().enumerate() {
        assert_eq!(receipt.status, ReceiptStatus::Success);
        assert_eq!(receipt.level, 0);
        assert_eq!(receipt.tx_hash, hashes[3 - idx]);
    }

    let state = chain.block_loop.state();
    for seed in 1..=4u8 {
        let after = state.account(&sender(seed)).unwrap().balance;
        let fee = U256::from(GWEI * seed as u64) * U256::from(INTRINSIC_GAS);
        assert_eq!(balances_before[seed as usize - 1] - after, fee);
    }
}

/// A three-transaction nonce chain from one sender spans three levels and
/// leaves the account nonce advanced past the last transaction.
#[tokio::test(flavor = "multi_thread")]
async fn scenario_nonce_chain() {
    let chain = chain(ChainSetup::default());

    for nonce in 0..3u64 {
        chain
            .mempool
            .submit_tx(signed_tx(1, nonce, GWEI, 10, Some(Address::from_low_u64_be(0xAA)), vec![]))
            .unwrap();
    }

    let levels = chain.mempool.levels();
    assert_eq!(levels.len(), 3);
    for (idx, level) in levels.iter().enumerate() {
        assert_eq!(level.len(), 1);
        assert_eq!(level[0].tx.nonce, idx as u64);
    }

    let block = chain.block_loop.tick().await.unwrap().unwrap();
    assert_eq!(block.receipts.len(), 3);
    assert!(block
        .receipts
        .iter()
        .all(|r| r.status == ReceiptStatus::Success));

    let state = chain.block_loop.state();
    assert_eq!(state.account(&sender(1)).unwrap().nonce, 3);
    assert_eq!(
        state.account(&Address::from_low_u64_be(0xAA)).unwrap().balance,
        U256::from(30u64)
    );
}

/// Two transactions writing the same storage slot of one account: an edge
/// from the earlier admission, two levels, and the later write wins the
/// final state.
#[tokio::test(flavor = "multi_thread")]
async fn scenario_write_write_conflict_sequentialises() {
    let chain = chain(ChainSetup::default());
    let contested = Address::from_low_u64_be(0xC0FFEE);

    // Same 32-byte slot prefix, different payload tails.
    let mut data_a = vec![0x01; 32];
    data_a.push(0xAA);
    let mut data_b = vec![0x01; 32];
    data_b.push(0xBB);

    let a = chain
        .mempool
        .submit_tx(signed_tx(1, 0, GWEI, 0, Some(contested), data_a))
        .unwrap();
    let b = chain
        .mempool
        .submit_tx(signed_tx(2, 0, GWEI * 5, 0, Some(contested), data_b.clone()))
        .unwrap();

    let levels = chain.mempool.levels();
    assert_eq!(levels.len(), 2);
    // Admission order wins the earlier level despite lower priority.
    assert_eq!(levels[0][0].hash, a);
    assert_eq!(levels[1][0].hash, b);

    let block = chain.block_loop.tick().await.unwrap().unwrap();
    assert_eq!(block.receipts.len(), 2);
    assert!(block
        .receipts
        .iter()
        .all(|r| r.status == ReceiptStatus::Success));

    // The later (level 1) transaction's write is the final value.
    let slot = heuristic_slot(&data_b);
    assert_eq!(
        chain.block_loop.state().storage(&contested, &slot),
        shared_types::keccak256(&data_b)
    );
}

/// Engine that writes a slot the static analyser knows nothing about.
struct HiddenSlotEngine {
    address: Address,
    slot: Hash,
}

impl ExecutionEngine for HiddenSlotEngine {
    fn run(
        &self,
        tx: &shared_types::SignedTransaction,
        view: &mut WorkerView,
        _ctx: &BlockContext,
    ) -> Result<Execution, EngineError> {
        view.set_storage(self.address, self.slot, tx.hash());
        Ok(Execution {
            gas_used: INTRINSIC_GAS,
            logs: vec![],
        })
    }
}

/// Two statically-disjoint transactions whose execution touches the same
/// slot: the merge arbitrates, the lower-priority one aborts at intrinsic
/// gas, and a write-write/abort-loser record is appended.
#[tokio::test(flavor = "multi_thread")]
async fn scenario_runtime_conflict_abort() {
    let contested = Address::from_low_u64_be(0xD00D);
    let slot = Hash::from_low_u64_be(0x51);
    let chain = chain(ChainSetup {
        engine: Arc::new(HiddenSlotEngine {
            address: contested,
            slot,
        }),
        ..ChainSetup::default()
    });

    let high = chain
        .mempool
        .submit_tx(signed_tx(1, 0, GWEI * 9, 0, None, vec![]))
        .unwrap();
    let low = chain
        .mempool
        .submit_tx(signed_tx(2, 0, GWEI, 0, None, vec![]))
        .unwrap();

    // Both parallelizable at level 0: the conflict is invisible statically.
    let levels = chain.mempool.levels();
    assert_eq!(levels.len(), 1);
    assert!(levels[0].iter().all(|e| e.parallelizable));

    let block = chain.block_loop.tick().await.unwrap().unwrap();

    let winner = &block.receipts[0];
    let loser = &block.receipts[1];
    assert_eq!(winner.tx_hash, high);
    assert_eq!(winner.status, ReceiptStatus::Success);
    assert_eq!(loser.tx_hash, low);
    assert_eq!(loser.status, ReceiptStatus::Failed);
    assert_eq!(loser.gas_used, INTRINSIC_GAS);

    let records = chain.executor.conflict_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, RuntimeConflictKind::WriteWrite);
    assert_eq!(records[0].resolution, ConflictResolution::AbortLoser);
    assert_eq!(records[0].winner, high);
    assert_eq!(records[0].loser, low);

    // The winner's write survived the merge.
    assert_eq!(chain.block_loop.state().storage(&contested, &slot), high);
}

/// Three validators with stakes {100, 80, 50}: nine blocks rotate the
/// proposer three times each, and every validator holds 3 × 60% of the
/// subsidy in proposer reward plus nine stake-weighted slices of the
/// per-block treasury share.
#[tokio::test(flavor = "multi_thread")]
async fn scenario_proposer_rotation_and_rewards() {
    let subsidy = 10_000u128;
    let stakes: [(u8, u128); 3] = [(1, 100), (2, 80), (3, 50)];
    let chain = chain(ChainSetup {
        stakes: stakes.to_vec(),
        block_config: BlockProductionConfig {
            initial_subsidy: subsidy,
            ..BlockProductionConfig::default()
        },
        ..ChainSetup::default()
    });

    let mut counts = std::collections::HashMap::new();
    for _ in 0..9 {
        let block = chain.block_loop.tick().await.unwrap().unwrap();
        *counts.entry(block.header.proposer).or_insert(0u32) += 1;
    }

    assert_eq!(counts.len(), 3);
    assert!(counts.values().all(|c| *c == 3));

    let proposer_share = subsidy * 6_000 / 10_000;
    let treasury_share = subsidy * 2_000 / 10_000;
    let total_stake: u128 = stakes.iter().map(|(_, s)| s).sum();

    let registry = chain.registry.read().unwrap();
    for (seed, stake) in stakes {
        // Zero commission, sole self-delegation: three full proposer
        // shares plus nine per-block slices of the stake-weighted pool
        // (all performance scores are 1.0).
        let pool_slice =
            (treasury_share as f64 * stake as f64 / total_stake as f64) as u128;
        assert_eq!(
            registry.pending_rewards(&sender(seed), &sender(seed)),
            3 * proposer_share + 9 * pool_slice
        );
    }
    assert_eq!(chain.block_loop.supply().treasury, 9 * treasury_share);
}

/// Halving every four blocks: subsidies S, S/2, S/4 per era, and the
/// supply ledger obeys `post = pre + subsidy − burn` at every height.
#[tokio::test(flavor = "multi_thread")]
async fn scenario_halving_supply_accumulation() {
    let initial_subsidy = 8_000u128;
    let chain = chain(ChainSetup {
        block_config: BlockProductionConfig {
            initial_subsidy,
            halving_interval: 4,
            epoch_blocks: 1_000,
            ..BlockProductionConfig::default()
        },
        ..ChainSetup::default()
    });

    for height in 1..=12u64 {
        let expected_subsidy = initial_subsidy >> ((height - 1) / 4);
        let before = chain.block_loop.supply();

        chain.block_loop.tick().await.unwrap().unwrap();

        let after = chain.block_loop.supply();
        assert_eq!(after.minted - before.minted, expected_subsidy);
        // Conservation: supply moves by subsidy − burn exactly.
        let burn = after.burned - before.burned;
        assert_eq!(after.supply(0), before.supply(0) + expected_subsidy - burn);
        assert_eq!(burn, expected_subsidy * 2_000 / 10_000);
    }

    let total_minted = 4 * (initial_subsidy + initial_subsidy / 2 + initial_subsidy / 4);
    assert_eq!(chain.block_loop.supply().minted, total_minted);
}
