//! # Transaction Pool: admission, indices, level decomposition
//!
//! ## Data Structures
//!
//! - `by_hash`: O(1) lookup by transaction hash
//! - `by_price`: priority queue (BTreeSet, highest first)
//! - `by_sender`: nonce-ordered pending transactions per account
//! - `queued`: per-sender side-table for nonce-gapped arrivals
//! - `graph`: dependency DAG over pending entries
//!
//! ## Invariants Enforced
//!
//! - No duplicate hashes across pending and queued.
//! - A sender's pending nonces are contiguous from its account nonce;
//!   gapped arrivals wait in `queued` until the gap closes.
//! - Every graph edge corresponds to a live admission-time conflict or a
//!   same-sender nonce ordering.
//! - Eviction only ever removes entries with strictly lower priority than
//!   the arrival that triggered it.

use crate::config::MempoolConfig;
use crate::entry::{priority_of, PoolEntry, PricedEntry};
use crate::errors::MempoolError;
use shared_types::{Address, Hash, SignedTransaction, Timestamp, U256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};
use vc_ordering::{analyze, conflict_between, DependencyGraph, FootprintRef};

/// Sliding window for the throughput statistic.
const TPS_WINDOW_MS: u64 = 60_000;

/// A nonce-gapped transaction parked until its gap closes.
#[derive(Clone, Debug)]
struct QueuedTx {
    hash: Hash,
    tx: SignedTransaction,
}

/// Aggregate pool statistics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MempoolStats {
    /// Pending plus queued transactions.
    pub total: usize,
    /// Transactions eligible for the next level snapshot.
    pub pending: usize,
    /// Nonce-gapped transactions waiting in side-tables.
    pub queued: usize,
    /// Number of execution levels in the current decomposition.
    pub parallel_batches: usize,
    /// Mean entries per level.
    pub avg_batch_size: f64,
    /// Admissions per second over the last 60 s.
    pub tps: f64,
}

/// The pool state proper. Not thread-safe; [`crate::Mempool`] wraps it in
/// a readers-writer lock.
#[derive(Debug)]
pub struct PoolInner {
    config: MempoolConfig,
    by_hash: HashMap<Hash, PoolEntry>,
    by_price: BTreeSet<PricedEntry>,
    by_sender: HashMap<Address, BTreeMap<u64, Hash>>,
    queued: HashMap<Address, BTreeMap<u64, QueuedTx>>,
    graph: DependencyGraph,
    /// Next expected nonce per account, advanced on inclusion.
    account_nonces: HashMap<Address, u64>,
    next_seq: u64,
    admissions: VecDeque<Timestamp>,
}

impl PoolInner {
    /// Creates an empty pool.
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            config,
            by_hash: HashMap::new(),
            by_price: BTreeSet::new(),
            by_sender: HashMap::new(),
            queued: HashMap::new(),
            graph: DependencyGraph::new(),
            account_nonces: HashMap::new(),
            next_seq: 0,
            admissions: VecDeque::new(),
        }
    }

    /// Pool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MempoolConfig::default())
    }

    /// Current configuration.
    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    /// Pending entry count.
    pub fn pending_count(&self) -> usize {
        self.by_hash.len()
    }

    /// Queued (nonce-gapped) entry count.
    pub fn queued_count(&self) -> usize {
        self.queued.values().map(BTreeMap::len).sum()
    }

    /// True if neither pending nor queued entries exist.
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty() && self.queued.is_empty()
    }

    /// True if `hash` is pending or queued.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
            || self
                .queued
                .values()
                .any(|q| q.values().any(|t| t.hash == *hash))
    }

    /// Pending entry lookup.
    pub fn get(&self, hash: &Hash) -> Option<&PoolEntry> {
        self.by_hash.get(hash)
    }

    /// Seed the committed nonce of an account (genesis / state sync).
    pub fn set_account_nonce(&mut self, address: Address, nonce: u64) {
        self.account_nonces.insert(address, nonce);
    }

    /// Admit a signed transaction.
    ///
    /// Performs, in order: signature verification, duplicate check,
    /// replacement routing, nonce-gap policy, capacity check with
    /// strict-priority eviction, footprint computation, conflict scan,
    /// graph insertion. Atomic: the pool is unchanged on any error.
    pub fn insert(&mut self, tx: SignedTransaction, now: Timestamp) -> Result<Hash, MempoolError> {
        shared_crypto::signatures::verify_raw(&tx.from, &tx.signing_bytes(), &tx.signature)
            .map_err(|_| MempoolError::BadSignature)?;
        let sender = Address::from(shared_crypto::derive_address(&tx.from));
        let hash = tx.hash();

        if self.contains(&hash) {
            return Err(MempoolError::AlreadyKnown(hash));
        }

        let base = self.account_nonce(&sender);
        if tx.nonce < base {
            return Err(MempoolError::NonceTooLow {
                got: tx.nonce,
                expected: base,
            });
        }

        // Replacement of an occupied slot takes precedence over the gap
        // policy: the nonce check above already rules out stale nonces.
        if let Some(old_hash) = self
            .by_sender
            .get(&sender)
            .and_then(|m| m.get(&tx.nonce))
            .copied()
        {
            return self.replace_pending(old_hash, tx, sender, hash, now);
        }
        if self
            .queued
            .get(&sender)
            .map_or(false, |q| q.contains_key(&tx.nonce))
        {
            return self.replace_queued(tx, sender, hash);
        }

        let next_pending = self.next_pending_nonce(&sender, base);
        if tx.nonce < next_pending {
            return Err(MempoolError::NonceTooLow {
                got: tx.nonce,
                expected: next_pending,
            });
        }
        if tx.nonce > next_pending {
            return self.enqueue_gapped(tx, sender, hash);
        }

        self.admit_pending(tx, sender, hash, now, None)?;
        self.record_admission(now);
        self.promote_queued(sender, now);
        Ok(hash)
    }

    /// Report transactions included in a finalised block.
    ///
    /// Deletes the entries, advances per-account nonces, and promotes any
    /// queued transactions whose gap closed. Absent hashes are no-ops.
    pub fn remove_included(&mut self, hashes: &[Hash], now: Timestamp) {
        let mut touched: HashSet<Address> = HashSet::new();

        for hash in hashes {
            let Some(entry) = self.remove_entry(hash) else {
                continue;
            };
            let next = self.account_nonces.entry(entry.sender).or_insert(0);
            *next = (*next).max(entry.tx.nonce + 1);
            touched.insert(entry.sender);
        }

        for sender in touched {
            let base = self.account_nonce(&sender);
            if let Some(q) = self.queued.get_mut(&sender) {
                // Queued nonces below the new base can never be admitted.
                q.retain(|nonce, _| *nonce >= base);
                if q.is_empty() {
                    self.queued.remove(&sender);
                }
            }
            self.promote_queued(sender, now);
        }
    }

    /// Point-in-time level decomposition.
    ///
    /// `result[i]` holds deep copies of every entry at dependency level
    /// `i`, sorted by priority descending (ties: earlier admission, then
    /// lexicographic hash). Queued entries never appear.
    pub fn levels(&self) -> Vec<Vec<PoolEntry>> {
        let hash_levels = match self.graph.levels() {
            Ok(levels) => levels,
            Err(err) => {
                // Unreachable by construction; refuse to emit a schedule
                // that could deadlock the executor.
                warn!("level decomposition failed: {err}");
                return Vec::new();
            }
        };

        hash_levels
            .into_iter()
            .map(|level| {
                let mut entries: Vec<PoolEntry> = level
                    .into_iter()
                    .filter_map(|hash| self.by_hash.get(&hash).cloned())
                    .collect();
                entries.sort_by(|a, b| {
                    b.priority
                        .cmp(&a.priority)
                        .then(a.added_at.cmp(&b.added_at))
                        .then(a.hash.cmp(&b.hash))
                });
                entries
            })
            .collect()
    }

    /// Aggregate statistics.
    pub fn stats(&self, now: Timestamp) -> MempoolStats {
        let cutoff = now.saturating_sub(TPS_WINDOW_MS);
        let recent = self
            .admissions
            .iter()
            .rev()
            .take_while(|t| **t >= cutoff)
            .count();

        let batches = self.levels();
        let pending = self.pending_count();
        let queued = self.queued_count();
        let avg = if batches.is_empty() {
            0.0
        } else {
            pending as f64 / batches.len() as f64
        };

        MempoolStats {
            total: pending + queued,
            pending,
            queued,
            parallel_batches: batches.len(),
            avg_batch_size: avg,
            tps: recent as f64 / (TPS_WINDOW_MS as f64 / 1000.0),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn account_nonce(&self, sender: &Address) -> u64 {
        self.account_nonces.get(sender).copied().unwrap_or(0)
    }

    /// Next admissible pending nonce: one past the sender's highest
    /// pending nonce, or the account nonce when nothing is pending.
    fn next_pending_nonce(&self, sender: &Address, base: u64) -> u64 {
        self.by_sender
            .get(sender)
            .and_then(|m| m.keys().next_back())
            .map(|n| n + 1)
            .unwrap_or(base)
    }

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn record_admission(&mut self, now: Timestamp) {
        let cutoff = now.saturating_sub(TPS_WINDOW_MS);
        while self.admissions.front().map_or(false, |t| *t < cutoff) {
            self.admissions.pop_front();
        }
        self.admissions.push_back(now);
    }

    /// Core pending admission: capacity, footprint, conflict scan, graph
    /// and index insertion. `inherited` carries the (seq, added_at) of a
    /// replaced slot so edge orientation follows the slot's original
    /// admission position.
    fn admit_pending(
        &mut self,
        tx: SignedTransaction,
        sender: Address,
        hash: Hash,
        now: Timestamp,
        inherited: Option<(u64, Timestamp)>,
    ) -> Result<(), MempoolError> {
        let priority = priority_of(tx.gas_price, tx.gas_limit);

        if self.by_hash.len() >= self.config.global_slots {
            self.evict_one_below(priority, &sender)?;
        }

        let footprint = analyze(&tx, sender);
        let (seq, added_at) = match inherited {
            Some(slot) => slot,
            None => (self.bump_seq(), now),
        };

        let new_fp = FootprintRef {
            hash,
            sender,
            reads: &footprint.reads,
            writes: &footprint.writes,
        };

        let mut predecessors: Vec<Hash> = Vec::new();
        let mut successors: Vec<Hash> = Vec::new();
        for existing in self.by_hash.values() {
            if conflict_between(&existing.footprint(), &new_fp).is_some() {
                if existing.seq < seq {
                    predecessors.push(existing.hash);
                } else {
                    successors.push(existing.hash);
                }
            }
        }

        let parallelizable = predecessors.is_empty() && successors.is_empty();

        self.graph.add_node(hash, &predecessors);
        for succ in &successors {
            self.graph.add_edge(&hash, succ);
        }

        let entry = PoolEntry {
            hash,
            sender,
            reads: footprint.reads,
            writes: footprint.writes,
            priority,
            added_at,
            seq,
            parallelizable,
            tx,
        };

        self.by_price.insert(PricedEntry::of(&entry));
        self.by_sender
            .entry(sender)
            .or_default()
            .insert(entry.tx.nonce, hash);
        self.by_hash.insert(hash, entry);

        debug!(
            hash = ?hash,
            sender = ?sender,
            deps = predecessors.len(),
            "transaction admitted"
        );
        Ok(())
    }

    /// Evict the lowest-priority entry strictly below `priority`.
    ///
    /// Entries of `arriving_sender` are never chosen: evicting part of the
    /// sender's own nonce chain mid-admission would gap the very chain
    /// being extended.
    fn evict_one_below(
        &mut self,
        priority: u128,
        arriving_sender: &Address,
    ) -> Result<(), MempoolError> {
        let capacity = self.config.global_slots;
        let victim = self
            .by_price
            .iter()
            .rev()
            .take_while(|p| p.priority < priority)
            .find_map(|p| {
                let entry = self.by_hash.get(&p.hash)?;
                (entry.sender != *arriving_sender).then_some(p.hash)
            });

        match victim {
            Some(hash) => {
                warn!(victim = ?hash, "pool full, evicting lowest-priority entry");
                self.evict_entry(&hash);
                Ok(())
            }
            None => Err(MempoolError::PoolFull { capacity }),
        }
    }

    /// Remove an entry and demote any now-gapped same-sender successors to
    /// the queued side-table.
    fn evict_entry(&mut self, hash: &Hash) {
        let Some(entry) = self.remove_entry(hash) else {
            return;
        };

        let tail: Vec<Hash> = self
            .by_sender
            .get(&entry.sender)
            .map(|m| m.range(entry.tx.nonce + 1..).map(|(_, h)| *h).collect())
            .unwrap_or_default();

        for gapped in tail {
            let Some(demoted) = self.remove_entry(&gapped) else {
                continue;
            };
            let queue = self.queued.entry(entry.sender).or_default();
            if queue.len() < self.config.max_queued_per_sender {
                queue.insert(
                    demoted.tx.nonce,
                    QueuedTx {
                        hash: demoted.hash,
                        tx: demoted.tx,
                    },
                );
            } else {
                warn!(hash = ?demoted.hash, "queue full during demotion, dropping");
            }
        }
    }

    /// Remove from every index and the graph. Returns the entry, if any.
    fn remove_entry(&mut self, hash: &Hash) -> Option<PoolEntry> {
        let entry = self.by_hash.remove(hash)?;

        self.by_price.remove(&PricedEntry::of(&entry));
        if let Some(nonces) = self.by_sender.get_mut(&entry.sender) {
            nonces.remove(&entry.tx.nonce);
            if nonces.is_empty() {
                self.by_sender.remove(&entry.sender);
            }
        }
        self.graph.remove_node(hash);

        Some(entry)
    }

    /// Replace the pending entry at (sender, nonce) if the bump suffices.
    fn replace_pending(
        &mut self,
        old_hash: Hash,
        tx: SignedTransaction,
        sender: Address,
        hash: Hash,
        now: Timestamp,
    ) -> Result<Hash, MempoolError> {
        let old = self
            .by_hash
            .get(&old_hash)
            .ok_or(MempoolError::AlreadyKnown(old_hash))?;

        let required = bumped_price(old.tx.gas_price, self.config.price_bump_percent);
        if tx.gas_price < required {
            return Err(MempoolError::Underpriced {
                gas_price: tx.gas_price,
                required,
            });
        }

        let inherited = (old.seq, old.added_at);
        self.remove_entry(&old_hash);
        self.admit_pending(tx, sender, hash, now, Some(inherited))?;
        self.record_admission(now);
        debug!(old = ?old_hash, new = ?hash, "pending transaction replaced");
        Ok(hash)
    }

    /// Replace a queued (gapped) transaction at the same nonce.
    fn replace_queued(
        &mut self,
        tx: SignedTransaction,
        sender: Address,
        hash: Hash,
    ) -> Result<Hash, MempoolError> {
        let queue = self
            .queued
            .get_mut(&sender)
            .ok_or(MempoolError::InvalidFormat)?;
        let old = queue.get(&tx.nonce).ok_or(MempoolError::InvalidFormat)?;

        let required = bumped_price(old.tx.gas_price, self.config.price_bump_percent);
        if tx.gas_price < required {
            return Err(MempoolError::Underpriced {
                gas_price: tx.gas_price,
                required,
            });
        }

        queue.insert(tx.nonce, QueuedTx { hash, tx });
        Ok(hash)
    }

    /// Park a nonce-gapped arrival in the sender's side-table.
    fn enqueue_gapped(
        &mut self,
        tx: SignedTransaction,
        sender: Address,
        hash: Hash,
    ) -> Result<Hash, MempoolError> {
        let queue = self.queued.entry(sender).or_default();
        if queue.len() >= self.config.max_queued_per_sender {
            return Err(MempoolError::QueueFull {
                capacity: self.config.max_queued_per_sender,
            });
        }
        queue.insert(tx.nonce, QueuedTx { hash, tx });
        debug!(hash = ?hash, sender = ?sender, "nonce-gapped transaction queued");
        Ok(hash)
    }

    /// Promote queued transactions whose nonce gap has closed.
    fn promote_queued(&mut self, sender: Address, now: Timestamp) {
        loop {
            let base = self.account_nonce(&sender);
            let next = self.next_pending_nonce(&sender, base);

            let Some(queue) = self.queued.get_mut(&sender) else {
                return;
            };
            let Some(queued_tx) = queue.remove(&next) else {
                if queue.is_empty() {
                    self.queued.remove(&sender);
                }
                return;
            };
            if queue.is_empty() {
                self.queued.remove(&sender);
            }

            let hash = queued_tx.hash;
            if let Err(err) = self.admit_pending(queued_tx.tx.clone(), sender, hash, now, None) {
                // Capacity pressure: park it again and stop promoting.
                debug!(hash = ?hash, "promotion deferred: {err}");
                self.queued.entry(sender).or_default().insert(
                    queued_tx.tx.nonce,
                    QueuedTx {
                        hash,
                        tx: queued_tx.tx,
                    },
                );
                return;
            }
            debug!(hash = ?hash, sender = ?sender, "queued transaction promoted");
        }
    }
}

/// Gas price after applying a percentage bump.
fn bumped_price(price: U256, bump_percent: u64) -> U256 {
    price
        .saturating_mul(U256::from(100 + bump_percent))
        .checked_div(U256::from(100u64))
        .unwrap_or(price)
}
