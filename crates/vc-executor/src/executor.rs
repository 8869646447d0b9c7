//! Level-parallel execution coordinator.
//!
//! `execute` walks the level decomposition in ascending order. Every level
//! (or memory-bounded sub-batch of one) is partitioned into contiguous
//! shards, dispatched to the worker pool, and merged single-threaded into
//! the successor snapshot. Contiguous partitioning preserves the
//! intra-level priority order, so concatenating shard outcomes restores
//! the level's receipt order without a sort.

use crate::cancel::CancelToken;
use crate::config::ExecutorConfig;
use crate::conflict::{
    ConflictRecord, ConflictResolution, ConflictTracker, RuntimeConflictKind,
};
use crate::delta::{StateDelta, WriteKey};
use crate::engine::{BlockContext, ExecutionEngine};
use crate::errors::ExecutionError;
use crate::snapshot::StateSnapshot;
use crate::workers::{ShardJob, TxOutcome, WorkerPool};
use shared_types::{Hash, Receipt, ReceiptStatus, Timestamp, INTRINSIC_GAS};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use vc_mempool::PoolEntry;

/// Whether an execution ran to completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// All levels executed and merged.
    Ok,
    /// Cancellation or timeout hit; partial results must be discarded.
    Interrupted,
}

/// Output of one `execute` call.
#[derive(Clone, Debug)]
pub struct ExecutionResult {
    /// Receipts in (level ascending, intra-level priority descending) order.
    pub receipts: Vec<Receipt>,
    /// Snapshot after applying every winning delta.
    pub successor: Arc<StateSnapshot>,
    /// Total gas consumed, failed and aborted transactions included.
    pub gas_used: u64,
    /// Runtime conflicts arbitrated during the merge.
    pub conflicts: Vec<ConflictRecord>,
    /// Completion status.
    pub status: ExecutionStatus,
}

/// Owns the worker pool and composes engine invocations.
pub struct ParallelExecutor {
    config: ExecutorConfig,
    engine: Arc<dyn ExecutionEngine>,
    pool: WorkerPool,
    tracker: Mutex<ConflictTracker>,
}

impl ParallelExecutor {
    /// Executor with a fixed worker pool and the given engine.
    pub fn new(config: ExecutorConfig, engine: Arc<dyn ExecutionEngine>) -> Self {
        let pool = WorkerPool::new(config.worker_count);
        info!(workers = pool.worker_count(), "parallel executor started");
        Self {
            config,
            engine,
            pool,
            tracker: Mutex::new(ConflictTracker::new()),
        }
    }

    /// Runtime conflicts recorded over the executor's lifetime.
    pub fn conflict_records(&self) -> Vec<ConflictRecord> {
        self.tracker
            .lock()
            .expect("conflict tracker lock poisoned")
            .records()
            .to_vec()
    }

    /// Execute a level decomposition against `base`.
    ///
    /// Levels run in ascending order; within a level, transactions run in
    /// parallel. On cancellation the result is marked
    /// [`ExecutionStatus::Interrupted`] and the caller discards it.
    pub fn execute(
        &self,
        levels: &[Vec<PoolEntry>],
        base: Arc<StateSnapshot>,
        ctx: &BlockContext,
        cancel: &CancelToken,
    ) -> Result<ExecutionResult, ExecutionError> {
        let mut snapshot = base;
        let mut receipts: Vec<Receipt> = Vec::new();
        let mut conflicts: Vec<ConflictRecord> = Vec::new();
        let mut total_gas = 0u64;
        let mut status = ExecutionStatus::Ok;

        'levels: for (level_idx, level) in levels.iter().enumerate() {
            if level.is_empty() {
                continue;
            }
            if cancel.is_cancelled() {
                status = ExecutionStatus::Interrupted;
                break;
            }

            let mut index_in_level = 0usize;
            for batch in self.sub_batches(level, &snapshot) {
                let outcomes = match self.run_batch(level_idx, batch, &snapshot, ctx, cancel)? {
                    Some(outcomes) => outcomes,
                    None => {
                        status = ExecutionStatus::Interrupted;
                        break 'levels;
                    }
                };

                let (batch_receipts, kept, batch_conflicts) =
                    arbitrate(outcomes, level_idx, index_in_level, ctx.timestamp);

                index_in_level += batch_receipts.len();
                total_gas += batch_receipts.iter().map(|r| r.gas_used).sum::<u64>();
                receipts.extend(batch_receipts);
                conflicts.extend(batch_conflicts);

                let refs: Vec<&StateDelta> = kept.iter().collect();
                snapshot = Arc::new(snapshot.apply(&refs, ctx.height));
            }
            debug!(level = level_idx, txs = index_in_level, "level merged");
        }

        if !conflicts.is_empty() {
            let mut tracker = self.tracker.lock().expect("conflict tracker lock poisoned");
            for record in &conflicts {
                tracker.append(record.clone());
            }
        }

        Ok(ExecutionResult {
            receipts,
            successor: snapshot,
            gas_used: total_gas,
            conflicts,
            status,
        })
    }

    /// Dispatch one batch as contiguous shards and collect the outcomes in
    /// level order. `None` signals an interrupted batch.
    fn run_batch(
        &self,
        level_idx: usize,
        entries: &[PoolEntry],
        snapshot: &Arc<StateSnapshot>,
        ctx: &BlockContext,
        cancel: &CancelToken,
    ) -> Result<Option<Vec<TxOutcome>>, ExecutionError> {
        let shard_count = entries.len().min(self.pool.worker_count()).max(1);
        let chunk_size = entries.len().div_ceil(shard_count);

        let mut sent = 0usize;
        for (shard_idx, chunk) in entries.chunks(chunk_size).enumerate() {
            self.pool.dispatch(
                shard_idx,
                ShardJob {
                    level: level_idx,
                    shard: shard_idx,
                    entries: chunk.to_vec(),
                    base: snapshot.clone(),
                    ctx: ctx.clone(),
                    engine: self.engine.clone(),
                    cancel: cancel.clone(),
                },
            )?;
            sent += 1;
        }

        let mut results = Vec::with_capacity(sent);
        for _ in 0..sent {
            results.push(self.pool.collect()?);
        }
        results.sort_by_key(|r| r.shard);

        if results.iter().any(|r| r.interrupted) {
            return Ok(None);
        }
        Ok(Some(results.into_iter().flat_map(|r| r.outcomes).collect()))
    }

    /// Split a level into sub-batches bounded by `batch_size` and, when a
    /// memory limit is configured, by projected snapshot-plus-delta bytes.
    fn sub_batches<'a>(
        &self,
        level: &'a [PoolEntry],
        snapshot: &StateSnapshot,
    ) -> Vec<&'a [PoolEntry]> {
        let max_batch = self.config.batch_size.max(1);

        let Some(limit) = self.config.memory_limit else {
            return level.chunks(max_batch).collect();
        };

        let budget = limit.saturating_sub(snapshot.estimate_bytes()).max(1);
        let mut batches = Vec::new();
        let mut start = 0usize;
        let mut used = 0usize;
        for (idx, entry) in level.iter().enumerate() {
            let cost = projected_delta_bytes(entry);
            let count = idx - start;
            if count > 0 && (count >= max_batch || used + cost > budget) {
                batches.push(&level[start..idx]);
                start = idx;
                used = 0;
            }
            used += cost;
        }
        if start < level.len() {
            batches.push(&level[start..]);
        }
        batches
    }
}

/// Projected per-transaction delta footprint.
fn projected_delta_bytes(entry: &PoolEntry) -> usize {
    512 + entry.tx.data.len() * 2
}

/// Cross-check written resources of one merged batch and abort losers.
///
/// Outcomes arrive priority-descending; the first writer of a resource
/// keeps it, later writers of the same resource become losers: their
/// receipts are rewritten to failed at intrinsic gas, their deltas are
/// discarded, and a conflict record is appended.
fn arbitrate(
    outcomes: Vec<TxOutcome>,
    level: usize,
    index_offset: usize,
    detected_at: Timestamp,
) -> (Vec<Receipt>, Vec<StateDelta>, Vec<ConflictRecord>) {
    let mut claimed: HashMap<WriteKey, Hash> = HashMap::new();
    let mut losers: HashSet<Hash> = HashSet::new();
    let mut records: Vec<ConflictRecord> = Vec::new();

    for outcome in &outcomes {
        if !outcome.success {
            continue;
        }
        let keys = outcome.delta.written_keys();
        let clash = keys
            .iter()
            .find_map(|key| claimed.get(key).map(|winner| (*key, *winner)));

        match clash {
            Some((key, winner)) => {
                let (kind, address, slot) = match key {
                    WriteKey::Balance(address) => (RuntimeConflictKind::Balance, address, None),
                    WriteKey::Slot(address, slot) => {
                        (RuntimeConflictKind::WriteWrite, address, Some(slot))
                    }
                };
                warn!(
                    winner = ?winner,
                    loser = ?outcome.hash,
                    ?address,
                    "runtime conflict, aborting lower-priority transaction"
                );
                records.push(ConflictRecord {
                    kind,
                    winner,
                    loser: outcome.hash,
                    address,
                    slot,
                    detected_at,
                    resolution: ConflictResolution::AbortLoser,
                });
                losers.insert(outcome.hash);
            }
            None => {
                for key in keys {
                    claimed.insert(key, outcome.hash);
                }
            }
        }
    }

    let mut receipts = Vec::with_capacity(outcomes.len());
    let mut kept: Vec<StateDelta> = Vec::new();
    for (offset, outcome) in outcomes.into_iter().enumerate() {
        let (status, gas_used, logs) = if !outcome.success {
            (ReceiptStatus::Failed, outcome.gas_used, Vec::new())
        } else if losers.contains(&outcome.hash) {
            (ReceiptStatus::Failed, INTRINSIC_GAS, Vec::new())
        } else {
            kept.push(outcome.delta);
            (ReceiptStatus::Success, outcome.gas_used, outcome.logs)
        };
        receipts.push(Receipt {
            tx_hash: outcome.hash,
            status,
            gas_used,
            gas_price: outcome.gas_price,
            logs,
            level,
            index: index_offset + offset,
        });
    }

    (receipts, kept, records)
}
