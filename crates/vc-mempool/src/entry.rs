//! Pool entries and their priority ordering.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash, SignedTransaction, Timestamp, U256};
use vc_ordering::{AccessSet, FootprintRef};

/// Divisor normalising `gas_price × gas_limit` into a priority score.
pub const PRIORITY_SCALE: u64 = 1_000_000;

/// A transaction admitted into the pending pool, with derived metadata.
///
/// Created at admission; the transaction itself is immutable, only the
/// dependency bookkeeping around it changes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoolEntry {
    /// The admitted transaction.
    pub tx: SignedTransaction,
    /// Content hash, cached at admission.
    pub hash: Hash,
    /// Sender address recovered from the verified signature.
    pub sender: Address,
    /// Approximated read set.
    pub reads: AccessSet,
    /// Approximated write set.
    pub writes: AccessSet,
    /// `floor(gas_price × gas_limit / 10^6)`, saturated to `u128`.
    pub priority: u128,
    /// Admission timestamp (ms).
    pub added_at: Timestamp,
    /// Admission sequence number; replacements inherit their slot's.
    pub seq: u64,
    /// Tentatively conflict-free at admission time.
    pub parallelizable: bool,
}

impl PoolEntry {
    /// Borrowed view for conflict detection.
    pub fn footprint(&self) -> FootprintRef<'_> {
        FootprintRef {
            hash: self.hash,
            sender: self.sender,
            reads: &self.reads,
            writes: &self.writes,
        }
    }
}

/// Normalised priority score of a transaction.
pub fn priority_of(gas_price: U256, gas_limit: u64) -> u128 {
    let scaled = gas_price
        .saturating_mul(U256::from(gas_limit))
        .checked_div(U256::from(PRIORITY_SCALE))
        .unwrap_or_default();
    if scaled > U256::from(u128::MAX) {
        u128::MAX
    } else {
        scaled.as_u128()
    }
}

/// Priority-index key. Ordered so that iterating a `BTreeSet` front to
/// back yields highest priority first; ties break by earlier admission,
/// then lexicographic hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PricedEntry {
    pub priority: u128,
    pub added_at: Timestamp,
    pub hash: Hash,
}

impl PricedEntry {
    pub fn of(entry: &PoolEntry) -> Self {
        Self {
            priority: entry.priority,
            added_at: entry.added_at,
            hash: entry.hash,
        }
    }
}

impl Ord for PricedEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(self.added_at.cmp(&other.added_at))
            .then(self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for PricedEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
