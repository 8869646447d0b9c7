//! Runtime conflict records.
//!
//! Static leveling should make deltas within a level write-disjoint; the
//! merge step verifies that and arbitrates any overlap it finds. Every
//! arbitration leaves a [`ConflictRecord`] in the tracker so operators can
//! see when the static analyser under-approximated.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash, Timestamp};

/// Classification of a detected conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeConflictKind {
    /// One transaction read what another wrote.
    ReadWrite,
    /// Two transactions wrote the same storage word.
    WriteWrite,
    /// Same-sender nonce ordering violated.
    Nonce,
    /// Two transactions wrote the same account's balance/nonce.
    Balance,
}

/// How a conflict was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictResolution {
    /// Higher-priority transaction kept its delta.
    PriorityWinner,
    /// Loser re-queued for a later level.
    Sequentialize,
    /// Loser retried in the next block.
    RetryLoser,
    /// Loser aborted at intrinsic gas.
    AbortLoser,
}

/// One arbitrated conflict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    /// Conflict classification.
    pub kind: RuntimeConflictKind,
    /// Transaction that kept its effects.
    pub winner: Hash,
    /// Transaction whose effects were discarded.
    pub loser: Hash,
    /// Contested account.
    pub address: Address,
    /// Contested storage slot, when the resource is a storage word.
    pub slot: Option<Hash>,
    /// Detection time (ms).
    pub detected_at: Timestamp,
    /// Applied resolution.
    pub resolution: ConflictResolution,
}

/// Append-only log of runtime conflicts.
#[derive(Debug, Default)]
pub struct ConflictTracker {
    records: Vec<ConflictRecord>,
}

impl ConflictTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn append(&mut self, record: ConflictRecord) {
        self.records.push(record);
    }

    /// All records so far.
    pub fn records(&self) -> &[ConflictRecord] {
        &self.records
    }

    /// Number of recorded conflicts.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_appends_in_order() {
        let mut tracker = ConflictTracker::new();
        for i in 0..3u64 {
            tracker.append(ConflictRecord {
                kind: RuntimeConflictKind::WriteWrite,
                winner: Hash::from_low_u64_be(i),
                loser: Hash::from_low_u64_be(100 + i),
                address: Address::from_low_u64_be(1),
                slot: None,
                detected_at: i,
                resolution: ConflictResolution::AbortLoser,
            });
        }

        assert_eq!(tracker.len(), 3);
        assert_eq!(tracker.records()[2].detected_at, 2);
    }
}
