//! Access-set representation.
//!
//! An [`AccessSet`] maps account addresses to the portions of the account a
//! transaction may touch. Three granularities exist per account:
//!
//! - `balance`: the account's balance/nonce fields,
//! - `slots`: specific storage slots,
//! - `wildcard`: any storage slot of the account.
//!
//! The wildcard exists because static payload analysis cannot always name
//! the slots a call will touch; marking the whole storage keeps the
//! footprint a superset of reality. Wildcard overlaps slot and wildcard
//! access, but not balance-only access.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};
use std::collections::{BTreeMap, BTreeSet};

/// Per-account access granularity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAccess {
    /// Balance/nonce access.
    pub balance: bool,
    /// Any-storage-slot access.
    pub wildcard: bool,
    /// Specific storage slots.
    pub slots: BTreeSet<Hash>,
}

impl SlotAccess {
    /// The storage resource (if any) on which `self` and `other` overlap.
    ///
    /// Returns `Some(resource)` when the two accesses may touch the same
    /// account portion; the resource is a concrete slot when one can be
    /// named, `None` for balance or wildcard overlaps.
    fn overlap(&self, other: &SlotAccess) -> Option<Option<Hash>> {
        if self.balance && other.balance {
            return Some(None);
        }
        if self.wildcard && (other.wildcard || !other.slots.is_empty()) {
            return Some(other.slots.iter().next().copied());
        }
        if other.wildcard && !self.slots.is_empty() {
            return Some(self.slots.iter().next().copied());
        }
        self.slots
            .intersection(&other.slots)
            .next()
            .map(|slot| Some(*slot))
    }

    fn is_empty(&self) -> bool {
        !self.balance && !self.wildcard && self.slots.is_empty()
    }
}

/// The set of (account, portion) pairs a transaction may access.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSet {
    entries: BTreeMap<Address, SlotAccess>,
}

impl AccessSet {
    /// Empty access set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record balance/nonce access to `address`.
    pub fn touch_balance(&mut self, address: Address) {
        self.entries.entry(address).or_default().balance = true;
    }

    /// Record access to a specific storage slot of `address`.
    pub fn touch_slot(&mut self, address: Address, slot: Hash) {
        self.entries.entry(address).or_default().slots.insert(slot);
    }

    /// Record potential access to any storage slot of `address`.
    pub fn touch_wildcard(&mut self, address: Address) {
        self.entries.entry(address).or_default().wildcard = true;
    }

    /// First overlapping resource between two access sets, if any.
    ///
    /// The result names the account and, when one can be identified, the
    /// concrete storage slot; `None` in the slot position means the overlap
    /// is on balance/nonce or unresolvable wildcard storage.
    pub fn intersects(&self, other: &AccessSet) -> Option<(Address, Option<Hash>)> {
        for (address, access) in &self.entries {
            if let Some(theirs) = other.entries.get(address) {
                if let Some(slot) = access.overlap(theirs) {
                    return Some((*address, slot));
                }
            }
        }
        None
    }

    /// True if no account is touched.
    pub fn is_empty(&self) -> bool {
        self.entries.values().all(SlotAccess::is_empty)
    }

    /// Addresses touched by this set.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.entries.keys()
    }

    /// Access granularity for one address.
    pub fn get(&self, address: &Address) -> Option<&SlotAccess> {
        self.entries.get(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(v: u8) -> Address {
        Address::from_low_u64_be(v as u64)
    }

    fn slot(v: u8) -> Hash {
        Hash::from_low_u64_be(v as u64)
    }

    #[test]
    fn test_balance_overlaps_balance_only() {
        let mut a = AccessSet::new();
        a.touch_balance(addr(1));
        let mut b = AccessSet::new();
        b.touch_balance(addr(1));
        let mut c = AccessSet::new();
        c.touch_slot(addr(1), slot(9));

        assert_eq!(a.intersects(&b), Some((addr(1), None)));
        // Balance access does not overlap storage-slot access.
        assert_eq!(a.intersects(&c), None);
    }

    #[test]
    fn test_slot_overlap_names_the_slot() {
        let mut a = AccessSet::new();
        a.touch_slot(addr(1), slot(5));
        let mut b = AccessSet::new();
        b.touch_slot(addr(1), slot(5));
        let mut c = AccessSet::new();
        c.touch_slot(addr(1), slot(6));

        assert_eq!(a.intersects(&b), Some((addr(1), Some(slot(5)))));
        assert_eq!(a.intersects(&c), None);
    }

    #[test]
    fn test_wildcard_overlaps_any_storage() {
        let mut wild = AccessSet::new();
        wild.touch_wildcard(addr(1));
        let mut slotted = AccessSet::new();
        slotted.touch_slot(addr(1), slot(3));
        let mut balance_only = AccessSet::new();
        balance_only.touch_balance(addr(1));

        assert!(wild.intersects(&slotted).is_some());
        assert!(slotted.intersects(&wild).is_some());
        assert!(wild.intersects(&wild.clone()).is_some());
        // Wildcard storage never overlaps balance-only access.
        assert_eq!(wild.intersects(&balance_only), None);
    }

    #[test]
    fn test_distinct_addresses_never_overlap() {
        let mut a = AccessSet::new();
        a.touch_balance(addr(1));
        a.touch_wildcard(addr(1));
        let mut b = AccessSet::new();
        b.touch_balance(addr(2));
        b.touch_wildcard(addr(2));

        assert_eq!(a.intersects(&b), None);
    }
}
