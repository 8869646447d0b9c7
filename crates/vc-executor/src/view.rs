//! Worker-local state views.
//!
//! A [`WorkerView`] layers a private overlay on top of the shared,
//! read-only snapshot. Reads fall through the overlay to the snapshot;
//! writes land in the overlay and are recorded in the current
//! per-transaction delta. Between transactions of one shard the overlay
//! persists (later transactions see earlier writes), while `take_delta`
//! resets only the delta.
//!
//! Checkpoint/restore exists so a failed or panicked transaction can be
//! rolled back without poisoning the rest of the shard.

use crate::delta::{AccountChange, StateDelta, StorageChange};
use crate::snapshot::StateSnapshot;
use shared_types::{AccountState, Address, Hash, LogEntry};
use std::collections::HashMap;
use std::sync::Arc;

/// Saved overlay state for rollback.
pub(crate) struct ViewCheckpoint {
    accounts: HashMap<Address, Option<AccountState>>,
    storage: HashMap<(Address, Hash), Hash>,
    delta: StateDelta,
}

/// Exclusive, mutable view a worker executes against.
#[derive(Debug)]
pub struct WorkerView {
    base: Arc<StateSnapshot>,
    /// Overlay; `None` marks a deletion.
    accounts: HashMap<Address, Option<AccountState>>,
    storage: HashMap<(Address, Hash), Hash>,
    delta: StateDelta,
}

impl WorkerView {
    /// View over `base` with an empty overlay.
    pub fn new(base: Arc<StateSnapshot>) -> Self {
        Self {
            base,
            accounts: HashMap::new(),
            storage: HashMap::new(),
            delta: StateDelta::default(),
        }
    }

    /// Current account record; absent accounts read as default.
    pub fn account(&self, address: &Address) -> AccountState {
        match self.accounts.get(address) {
            Some(Some(state)) => state.clone(),
            Some(None) => AccountState::default(),
            None => self.base.account(address).cloned().unwrap_or_default(),
        }
    }

    /// True if the account exists in the overlay or the snapshot.
    pub fn account_exists(&self, address: &Address) -> bool {
        match self.accounts.get(address) {
            Some(existing) => existing.is_some(),
            None => self.base.account(address).is_some(),
        }
    }

    /// Write an account record, recording old/new in the delta.
    pub fn set_account(&mut self, address: Address, state: AccountState) {
        let current = self.account(&address);
        let change = self
            .delta
            .accounts
            .entry(address)
            .or_insert_with(|| AccountChange {
                old_balance: current.balance,
                new_balance: current.balance,
                old_nonce: current.nonce,
                new_nonce: current.nonce,
                code_changed: false,
            });
        change.new_balance = state.balance;
        change.new_nonce = state.nonce;
        if state.code_hash != current.code_hash {
            change.code_changed = true;
        }
        self.accounts.insert(address, Some(state));
    }

    /// Create an empty account if absent.
    pub fn create_account(&mut self, address: Address) {
        if !self.account_exists(&address) {
            self.delta.created.insert(address);
            self.accounts.insert(address, Some(AccountState::default()));
        }
    }

    /// Delete an account.
    pub fn delete_account(&mut self, address: Address) {
        if self.account_exists(&address) {
            self.delta.deleted.insert(address);
            self.accounts.insert(address, None);
        }
    }

    /// Current storage word; absent words read as zero.
    pub fn storage_at(&self, address: &Address, slot: &Hash) -> Hash {
        self.storage
            .get(&(*address, *slot))
            .copied()
            .unwrap_or_else(|| self.base.storage(address, slot))
    }

    /// Write a storage word, recording old/new in the delta.
    pub fn set_storage(&mut self, address: Address, slot: Hash, value: Hash) {
        let old = self.storage_at(&address, &slot);
        let change = self
            .delta
            .storage
            .entry((address, slot))
            .or_insert_with(|| StorageChange { old, new: old });
        change.new = value;
        self.storage.insert((address, slot), value);
    }

    /// Append a log to the current delta.
    pub fn emit_log(&mut self, log: LogEntry) {
        self.delta.logs.push(log);
    }

    /// Take the accumulated delta, resetting it for the next transaction.
    /// The overlay is kept: later transactions in the shard observe
    /// earlier writes.
    pub fn take_delta(&mut self) -> StateDelta {
        std::mem::take(&mut self.delta)
    }

    pub(crate) fn checkpoint(&self) -> ViewCheckpoint {
        ViewCheckpoint {
            accounts: self.accounts.clone(),
            storage: self.storage.clone(),
            delta: self.delta.clone(),
        }
    }

    pub(crate) fn restore(&mut self, checkpoint: ViewCheckpoint) {
        self.accounts = checkpoint.accounts;
        self.storage = checkpoint.storage;
        self.delta = checkpoint.delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::U256;

    fn addr(v: u8) -> Address {
        Address::from_low_u64_be(v as u64)
    }

    fn base() -> Arc<StateSnapshot> {
        Arc::new(StateSnapshot::genesis(vec![(addr(1), U256::from(100u64))]))
    }

    #[test]
    fn test_reads_fall_through_to_base() {
        let view = WorkerView::new(base());
        assert_eq!(view.account(&addr(1)).balance, U256::from(100u64));
        assert_eq!(view.account(&addr(9)).balance, U256::zero());
    }

    #[test]
    fn test_writes_record_first_touch_old_values() {
        let mut view = WorkerView::new(base());
        let mut account = view.account(&addr(1));
        account.balance = U256::from(80u64);
        view.set_account(addr(1), account.clone());
        account.balance = U256::from(60u64);
        view.set_account(addr(1), account);

        let delta = view.take_delta();
        let change = &delta.accounts[&addr(1)];
        assert_eq!(change.old_balance, U256::from(100u64));
        assert_eq!(change.new_balance, U256::from(60u64));
    }

    #[test]
    fn test_overlay_persists_across_delta_boundaries() {
        let mut view = WorkerView::new(base());
        let mut account = view.account(&addr(1));
        account.balance = U256::from(42u64);
        view.set_account(addr(1), account);
        let _ = view.take_delta();

        // Next transaction in the shard sees the earlier write...
        assert_eq!(view.account(&addr(1)).balance, U256::from(42u64));
        // ...and a fresh touch records the overlay value as old.
        let mut account = view.account(&addr(1));
        account.balance = U256::from(7u64);
        view.set_account(addr(1), account);
        let delta = view.take_delta();
        assert_eq!(delta.accounts[&addr(1)].old_balance, U256::from(42u64));
    }

    #[test]
    fn test_storage_roundtrip_and_delta() {
        let mut view = WorkerView::new(base());
        let slot = Hash::from_low_u64_be(5);
        assert_eq!(view.storage_at(&addr(1), &slot), Hash::zero());

        view.set_storage(addr(1), slot, Hash::repeat_byte(0xCD));
        assert_eq!(view.storage_at(&addr(1), &slot), Hash::repeat_byte(0xCD));

        let delta = view.take_delta();
        let change = &delta.storage[&(addr(1), slot)];
        assert_eq!(change.old, Hash::zero());
        assert_eq!(change.new, Hash::repeat_byte(0xCD));
    }

    #[test]
    fn test_checkpoint_restore_rolls_back() {
        let mut view = WorkerView::new(base());
        let checkpoint = view.checkpoint();

        let mut account = view.account(&addr(1));
        account.balance = U256::zero();
        view.set_account(addr(1), account);
        view.create_account(addr(9));

        view.restore(checkpoint);
        assert_eq!(view.account(&addr(1)).balance, U256::from(100u64));
        assert!(!view.account_exists(&addr(9)));
        assert!(view.take_delta().is_empty());
    }

    #[test]
    fn test_create_and_delete() {
        let mut view = WorkerView::new(base());
        view.create_account(addr(9));
        assert!(view.account_exists(&addr(9)));

        view.delete_account(addr(9));
        assert!(!view.account_exists(&addr(9)));

        let delta = view.take_delta();
        assert!(delta.created.contains(&addr(9)));
        assert!(delta.deleted.contains(&addr(9)));
    }
}
