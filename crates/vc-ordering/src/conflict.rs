//! Admission-time conflict detection.
//!
//! Two pending transactions conflict iff:
//!
//! 1. they share a sender (nonce ordering forces sequential execution), or
//! 2. their write sets overlap, or
//! 3. one's write set overlaps the other's read set (either direction).
//!
//! A conflict becomes a dependency edge from the earlier-admitted entry to
//! the later one, which is what keeps the graph acyclic by construction.

use crate::access::AccessSet;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};

/// Why two transactions must not run concurrently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictKind {
    /// Same sender, nonce ordering applies.
    NonceOrder,
    /// Both write the same resource.
    WriteWrite,
    /// One writes what the other reads.
    ReadWrite,
}

/// A detected admission-time conflict, oriented earlier → later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionConflict {
    /// The earlier-admitted transaction.
    pub earlier: Hash,
    /// The later-admitted transaction.
    pub later: Hash,
    /// Conflict classification.
    pub kind: ConflictKind,
    /// Contested account, when the conflict is data-driven.
    pub address: Option<Address>,
    /// Contested storage slot, when one can be named.
    pub slot: Option<Hash>,
}

/// Borrowed view of the fields conflict detection needs.
#[derive(Clone, Copy, Debug)]
pub struct FootprintRef<'a> {
    /// Content hash of the transaction.
    pub hash: Hash,
    /// Recovered sender address.
    pub sender: Address,
    /// Approximated read set.
    pub reads: &'a AccessSet,
    /// Approximated write set.
    pub writes: &'a AccessSet,
}

/// Detect a conflict between an earlier-admitted and a later entry.
pub fn conflict_between(
    earlier: &FootprintRef<'_>,
    later: &FootprintRef<'_>,
) -> Option<AdmissionConflict> {
    if earlier.sender == later.sender {
        return Some(AdmissionConflict {
            earlier: earlier.hash,
            later: later.hash,
            kind: ConflictKind::NonceOrder,
            address: Some(earlier.sender),
            slot: None,
        });
    }

    if let Some((address, slot)) = earlier.writes.intersects(later.writes) {
        return Some(AdmissionConflict {
            earlier: earlier.hash,
            later: later.hash,
            kind: ConflictKind::WriteWrite,
            address: Some(address),
            slot,
        });
    }

    if let Some((address, slot)) = earlier.writes.intersects(later.reads) {
        return Some(AdmissionConflict {
            earlier: earlier.hash,
            later: later.hash,
            kind: ConflictKind::ReadWrite,
            address: Some(address),
            slot,
        });
    }

    if let Some((address, slot)) = earlier.reads.intersects(later.writes) {
        return Some(AdmissionConflict {
            earlier: earlier.hash,
            later: later.hash,
            kind: ConflictKind::ReadWrite,
            address: Some(address),
            slot,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(v: u8) -> Hash {
        Hash::from_low_u64_be(v as u64)
    }

    fn addr(v: u8) -> Address {
        Address::from_low_u64_be(v as u64)
    }

    fn slot(v: u8) -> Hash {
        Hash::from_low_u64_be(v as u64)
    }

    struct Entry {
        hash: Hash,
        sender: Address,
        reads: AccessSet,
        writes: AccessSet,
    }

    impl Entry {
        fn new(h: u8, sender: u8) -> Self {
            Self {
                hash: hash(h),
                sender: addr(sender),
                reads: AccessSet::new(),
                writes: AccessSet::new(),
            }
        }

        fn as_ref(&self) -> FootprintRef<'_> {
            FootprintRef {
                hash: self.hash,
                sender: self.sender,
                reads: &self.reads,
                writes: &self.writes,
            }
        }
    }

    #[test]
    fn test_same_sender_is_nonce_conflict() {
        let a = Entry::new(1, 10);
        let b = Entry::new(2, 10);

        let conflict = conflict_between(&a.as_ref(), &b.as_ref()).unwrap();
        assert_eq!(conflict.kind, ConflictKind::NonceOrder);
        assert_eq!(conflict.earlier, a.hash);
        assert_eq!(conflict.later, b.hash);
    }

    #[test]
    fn test_write_write_conflict() {
        let mut a = Entry::new(1, 10);
        let mut b = Entry::new(2, 20);
        a.writes.touch_slot(addr(5), slot(1));
        b.writes.touch_slot(addr(5), slot(1));

        let conflict = conflict_between(&a.as_ref(), &b.as_ref()).unwrap();
        assert_eq!(conflict.kind, ConflictKind::WriteWrite);
        assert_eq!(conflict.address, Some(addr(5)));
        assert_eq!(conflict.slot, Some(slot(1)));
    }

    #[test]
    fn test_read_write_both_directions() {
        let mut writer = Entry::new(1, 10);
        let mut reader = Entry::new(2, 20);
        writer.writes.touch_slot(addr(5), slot(1));
        reader.reads.touch_slot(addr(5), slot(1));

        let forward = conflict_between(&writer.as_ref(), &reader.as_ref()).unwrap();
        assert_eq!(forward.kind, ConflictKind::ReadWrite);

        let backward = conflict_between(&reader.as_ref(), &writer.as_ref()).unwrap();
        assert_eq!(backward.kind, ConflictKind::ReadWrite);
        // Orientation always follows admission order.
        assert_eq!(backward.earlier, reader.hash);
        assert_eq!(backward.later, writer.hash);
    }

    #[test]
    fn test_disjoint_entries_do_not_conflict() {
        let mut a = Entry::new(1, 10);
        let mut b = Entry::new(2, 20);
        a.writes.touch_balance(addr(10));
        b.writes.touch_balance(addr(20));

        assert!(conflict_between(&a.as_ref(), &b.as_ref()).is_none());
    }
}
