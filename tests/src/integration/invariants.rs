//! Properties that must hold in every reachable state.

use crate::support::{chain, sender, signed_tx, ChainSetup, GWEI};
use shared_types::Hash;
use std::collections::{HashMap, HashSet};
use vc_staking::{PerformanceMetrics, ViolationKind};

/// Levels cover every pending entry exactly once, and a same-sender nonce
/// chain ascends strictly through levels.
#[tokio::test(flavor = "multi_thread")]
async fn levels_partition_pending_and_respect_order() {
    let chain = chain(ChainSetup::default());

    // Two chains and two loose transactions.
    for nonce in 0..4u64 {
        chain
            .mempool
            .submit_tx(signed_tx(1, nonce, GWEI, 0, None, vec![]))
            .unwrap();
    }
    for nonce in 0..2u64 {
        chain
            .mempool
            .submit_tx(signed_tx(2, nonce, GWEI * 2, 0, None, vec![]))
            .unwrap();
    }
    chain
        .mempool
        .submit_tx(signed_tx(3, 0, GWEI * 3, 0, None, vec![]))
        .unwrap();

    let levels = chain.mempool.levels();
    let stats = chain.mempool.stats();

    let flattened: Vec<Hash> = levels.iter().flatten().map(|e| e.hash).collect();
    let unique: HashSet<&Hash> = flattened.iter().collect();
    assert_eq!(flattened.len(), stats.pending);
    assert_eq!(unique.len(), flattened.len());

    // Per-sender: level strictly ascends with nonce.
    let mut level_of: HashMap<Hash, usize> = HashMap::new();
    for (idx, level) in levels.iter().enumerate() {
        for entry in level {
            level_of.insert(entry.hash, idx);
        }
    }
    for seed in [1u8, 2] {
        let mut entries: Vec<_> = levels
            .iter()
            .flatten()
            .filter(|e| e.sender == sender(seed))
            .collect();
        entries.sort_by_key(|e| e.tx.nonce);
        for pair in entries.windows(2) {
            assert!(level_of[&pair[1].hash] > level_of[&pair[0].hash]);
        }
    }
}

/// Within one level, any two entries either have disjoint write sets or at
/// least one of them is flagged non-parallelizable.
#[tokio::test(flavor = "multi_thread")]
async fn same_level_entries_are_write_disjoint_or_flagged() {
    let chain = chain(ChainSetup::default());

    // A mix of transfers, some sharing recipients and payload slots.
    let recipients = [0xA1u64, 0xA2, 0xA3];
    for (i, seed) in (1..=4u8).enumerate() {
        for nonce in 0..3u64 {
            let to = shared_types::Address::from_low_u64_be(
                recipients[(i + nonce as usize) % recipients.len()],
            );
            let data = if nonce == 1 { vec![0x77; 33] } else { vec![] };
            chain
                .mempool
                .submit_tx(signed_tx(seed, nonce, GWEI * (seed as u64 + nonce), 5, Some(to), data))
                .unwrap();
        }
    }

    for level in chain.mempool.levels() {
        for (i, a) in level.iter().enumerate() {
            for b in level.iter().skip(i + 1) {
                let disjoint = a.writes.intersects(&b.writes).is_none();
                assert!(
                    disjoint || !a.parallelizable || !b.parallelizable,
                    "level entries overlap without a conservatism flag"
                );
            }
        }
    }
}

/// A ten-ancestor chain lands its tail at level ten.
#[tokio::test(flavor = "multi_thread")]
async fn ten_ancestor_chain_reaches_level_ten() {
    let chain = chain(ChainSetup::default());

    let mut last = Hash::zero();
    for nonce in 0..=10u64 {
        last = chain
            .mempool
            .submit_tx(signed_tx(1, nonce, GWEI, 0, None, vec![]))
            .unwrap();
    }

    let levels = chain.mempool.levels();
    assert_eq!(levels.len(), 11);
    assert_eq!(levels[10][0].hash, last);
}

/// Registry stake totals equal delegation totals through bonding,
/// unbonding, slashing and reward distribution.
#[tokio::test(flavor = "multi_thread")]
async fn registry_stake_equals_delegations() {
    let chain = chain(ChainSetup {
        stakes: vec![(1, 1_000), (2, 2_000)],
        ..ChainSetup::default()
    });

    {
        let mut registry = chain.registry.write().unwrap();
        registry.bond(sender(1), sender(9), 500).unwrap();
        registry.bond(sender(2), sender(9), 700).unwrap();
        registry.unbond(sender(2), sender(9), 200, 1_000).unwrap();
        registry
            .slash(sender(1), ViolationKind::Downtime, vec![], 5, 1_000)
            .unwrap();
        registry.distribute(10_000, sender(2)).unwrap();
        registry
            .performance(
                sender(2),
                PerformanceMetrics {
                    uptime: 0.9,
                    response_score: 0.8,
                    downtime_events: 0,
                },
            )
            .unwrap();
    }

    let registry = chain.registry.read().unwrap();
    assert_eq!(registry.total_stake(), registry.delegation_total());
}

/// Heights are strictly monotonic, parent hashes chain unambiguously, and
/// every submitted transaction is included in exactly one block.
#[tokio::test(flavor = "multi_thread")]
async fn blocks_chain_and_include_each_tx_once() {
    let chain = chain(ChainSetup::default());

    let mut submitted = HashSet::new();
    for seed in 1..=3u8 {
        for nonce in 0..2u64 {
            submitted.insert(
                chain
                    .mempool
                    .submit_tx(signed_tx(seed, nonce, GWEI, 1, None, vec![]))
                    .unwrap(),
            );
        }
    }

    for _ in 0..4 {
        chain.block_loop.tick().await.unwrap().unwrap();
        if chain.mempool.pending_count() == 0 {
            break;
        }
    }
    assert_eq!(chain.mempool.pending_count(), 0);

    let blocks = chain.blocks.lock().unwrap();
    let mut included: HashMap<Hash, usize> = HashMap::new();
    for pair in blocks.windows(2) {
        assert_eq!(pair[1].header.height, pair[0].header.height + 1);
        assert_eq!(pair[1].header.parent_hash, pair[0].hash());
    }
    for block in blocks.iter() {
        for hash in block.included_hashes() {
            *included.entry(hash).or_insert(0) += 1;
        }
    }

    for hash in &submitted {
        assert_eq!(included.get(hash), Some(&1), "transaction not in exactly one block");
    }
    assert_eq!(included.len(), submitted.len());
}

/// Duplicate admission is rejected and leaves the pool unchanged; a
/// re-queried snapshot is equivalent.
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_admission_is_idempotent() {
    let chain = chain(ChainSetup::default());
    let tx = signed_tx(1, 0, GWEI, 0, None, vec![]);

    chain.mempool.submit_tx(tx.clone()).unwrap();
    let stats_before = chain.mempool.stats();
    let levels_before = chain.mempool.levels();

    assert!(matches!(
        chain.mempool.submit_tx(tx),
        Err(vc_mempool::MempoolError::AlreadyKnown(_))
    ));

    let stats_after = chain.mempool.stats();
    assert_eq!(stats_before.total, stats_after.total);
    assert_eq!(stats_before.pending, stats_after.pending);

    let levels_after = chain.mempool.levels();
    let before: Vec<Vec<Hash>> = levels_before
        .iter()
        .map(|l| l.iter().map(|e| e.hash).collect())
        .collect();
    let after: Vec<Vec<Hash>> = levels_after
        .iter()
        .map(|l| l.iter().map(|e| e.hash).collect())
        .collect();
    assert_eq!(before, after);
}
