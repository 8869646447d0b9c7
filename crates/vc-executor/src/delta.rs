//! Per-transaction state deltas.
//!
//! A [`StateDelta`] is the complete effect of one transaction: account
//! changes with old and new values, storage changes, created and deleted
//! accounts, and emitted logs. Old values are first-touch values, which
//! lets a worker roll a failed transaction back precisely.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash, LogEntry, U256};
use std::collections::{BTreeMap, BTreeSet};

/// Old/new balance and nonce of a touched account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountChange {
    /// Balance before the transaction first touched the account.
    pub old_balance: U256,
    /// Balance after the transaction.
    pub new_balance: U256,
    /// Nonce before.
    pub old_nonce: u64,
    /// Nonce after.
    pub new_nonce: u64,
    /// Whether the account's code changed.
    pub code_changed: bool,
}

/// Old/new value of a storage word.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChange {
    /// Value before.
    pub old: Hash,
    /// Value after.
    pub new: Hash,
}

/// A resource written by a delta, used by merge arbitration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WriteKey {
    /// Balance/nonce of an account.
    Balance(Address),
    /// A storage word.
    Slot(Address, Hash),
}

/// The state effect of executing one transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDelta {
    /// Account changes keyed by address.
    pub accounts: BTreeMap<Address, AccountChange>,
    /// Storage changes keyed by (address, slot).
    pub storage: BTreeMap<(Address, Hash), StorageChange>,
    /// Accounts created by the transaction.
    pub created: BTreeSet<Address>,
    /// Accounts deleted by the transaction.
    pub deleted: BTreeSet<Address>,
    /// Logs emitted during execution.
    pub logs: Vec<LogEntry>,
}

impl StateDelta {
    /// True if the delta carries no effect.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.storage.is_empty()
            && self.created.is_empty()
            && self.deleted.is_empty()
            && self.logs.is_empty()
    }

    /// Every resource this delta writes.
    pub fn written_keys(&self) -> Vec<WriteKey> {
        let mut keys: Vec<WriteKey> = self
            .accounts
            .iter()
            .filter(|(_, change)| {
                change.old_balance != change.new_balance
                    || change.old_nonce != change.new_nonce
                    || change.code_changed
            })
            .map(|(address, _)| WriteKey::Balance(*address))
            .collect();
        keys.extend(
            self.storage
                .keys()
                .map(|(address, slot)| WriteKey::Slot(*address, *slot)),
        );
        keys.extend(self.created.iter().map(|a| WriteKey::Balance(*a)));
        keys.extend(self.deleted.iter().map(|a| WriteKey::Balance(*a)));
        keys.sort();
        keys.dedup();
        keys
    }

    /// Rough memory footprint, for the executor's memory bound.
    pub fn estimate_bytes(&self) -> usize {
        self.accounts.len() * 96
            + self.storage.len() * 128
            + (self.created.len() + self.deleted.len()) * 20
            + self
                .logs
                .iter()
                .map(|l| 20 + l.topics.len() * 32 + l.data.len())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(v: u8) -> Address {
        Address::from_low_u64_be(v as u64)
    }

    #[test]
    fn test_written_keys_skip_untouched_accounts() {
        let mut delta = StateDelta::default();
        delta.accounts.insert(
            addr(1),
            AccountChange {
                old_balance: U256::from(5u64),
                new_balance: U256::from(5u64),
                old_nonce: 1,
                new_nonce: 1,
                code_changed: false,
            },
        );
        delta.accounts.insert(
            addr(2),
            AccountChange {
                old_balance: U256::from(5u64),
                new_balance: U256::from(9u64),
                old_nonce: 0,
                new_nonce: 0,
                code_changed: false,
            },
        );

        // A read-only account record is not a write.
        assert_eq!(delta.written_keys(), vec![WriteKey::Balance(addr(2))]);
    }

    #[test]
    fn test_written_keys_cover_storage_and_lifecycle() {
        let mut delta = StateDelta::default();
        let slot = Hash::from_low_u64_be(7);
        delta.storage.insert(
            (addr(1), slot),
            StorageChange {
                old: Hash::zero(),
                new: Hash::repeat_byte(1),
            },
        );
        delta.created.insert(addr(3));

        let keys = delta.written_keys();
        assert!(keys.contains(&WriteKey::Slot(addr(1), slot)));
        assert!(keys.contains(&WriteKey::Balance(addr(3))));
    }

    #[test]
    fn test_empty_delta() {
        assert!(StateDelta::default().is_empty());
        assert_eq!(StateDelta::default().estimate_bytes(), 0);
    }
}
