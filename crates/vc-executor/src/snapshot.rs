//! Immutable state snapshots.
//!
//! A snapshot is the committed state at one height: account records plus
//! storage words. Snapshots never mutate; applying deltas produces a
//! successor. The root is a deterministic Keccak fold over the sorted
//! contents, so equal roots imply equal contents.
//!
//! ## Map-Reduce Root Computation
//!
//! A block may touch storage in many accounts. Per-account storage roots
//! are independent, so they are computed with rayon above a small-batch
//! threshold and folded sequentially into account records.

use crate::delta::StateDelta;
use rayon::prelude::*;
use shared_types::{AccountState, Address, Hash, U256};
use sha3::{Digest, Keccak256};
use std::collections::BTreeMap;

/// Below this many touched accounts the sequential path is faster.
pub const PARALLEL_THRESHOLD: usize = 4;

/// Immutable view of chain state at a height.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StateSnapshot {
    height: u64,
    accounts: BTreeMap<Address, AccountState>,
    storage: BTreeMap<(Address, Hash), Hash>,
}

impl StateSnapshot {
    /// Empty snapshot at height 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Genesis snapshot holding the given balances.
    pub fn genesis(balances: impl IntoIterator<Item = (Address, U256)>) -> Self {
        let mut snapshot = Self::new();
        for (address, balance) in balances {
            snapshot
                .accounts
                .insert(address, AccountState::with_balance(balance));
        }
        snapshot
    }

    /// Builder: set a full account record (genesis construction).
    pub fn with_account(mut self, address: Address, account: AccountState) -> Self {
        self.accounts.insert(address, account);
        self
    }

    /// Height this snapshot was committed at.
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Account lookup.
    pub fn account(&self, address: &Address) -> Option<&AccountState> {
        self.accounts.get(address)
    }

    /// Number of accounts.
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Storage word lookup; absent words read as zero.
    pub fn storage(&self, address: &Address, slot: &Hash) -> Hash {
        self.storage
            .get(&(*address, *slot))
            .copied()
            .unwrap_or_default()
    }

    /// Total balance held by all accounts (supply-conservation checks).
    pub fn total_balance(&self) -> U256 {
        self.accounts
            .values()
            .fold(U256::zero(), |acc, a| acc.saturating_add(a.balance))
    }

    /// Content-addressed root over accounts and storage.
    pub fn root(&self) -> Hash {
        // Group storage words per account.
        let mut per_account: BTreeMap<Address, Vec<(Hash, Hash)>> = BTreeMap::new();
        for ((address, slot), value) in &self.storage {
            per_account.entry(*address).or_default().push((*slot, *value));
        }

        let storage_roots: BTreeMap<Address, Hash> = if per_account.len() < PARALLEL_THRESHOLD {
            per_account
                .into_iter()
                .map(|(address, words)| (address, storage_root(&words)))
                .collect()
        } else {
            per_account
                .into_par_iter()
                .map(|(address, words)| (address, storage_root(&words)))
                .collect()
        };

        let mut hasher = Keccak256::new();
        for (address, account) in &self.accounts {
            hasher.update(address.as_bytes());
            let mut balance = [0u8; 32];
            account.balance.to_big_endian(&mut balance);
            hasher.update(balance);
            hasher.update(account.nonce.to_be_bytes());
            hasher.update(account.code_hash.as_bytes());
            let storage_root = storage_roots
                .get(address)
                .copied()
                .unwrap_or_else(Hash::zero);
            hasher.update(storage_root.as_bytes());
        }
        let digest = hasher.finalize();
        Hash::from_slice(&digest)
    }

    /// Successor snapshot after applying `deltas` at `height`.
    ///
    /// Deltas are expected to be write-disjoint (the merge step arbitrates
    /// overlaps before calling this); application order is therefore
    /// irrelevant.
    pub fn apply(&self, deltas: &[&StateDelta], height: u64) -> StateSnapshot {
        let mut accounts = self.accounts.clone();
        let mut storage = self.storage.clone();

        for delta in deltas {
            for address in &delta.created {
                accounts.entry(*address).or_default();
            }
            for (address, change) in &delta.accounts {
                let account = accounts.entry(*address).or_default();
                account.balance = change.new_balance;
                account.nonce = change.new_nonce;
            }
            for ((address, slot), change) in &delta.storage {
                storage.insert((*address, *slot), change.new);
            }
            for address in &delta.deleted {
                accounts.remove(address);
                storage.retain(|(a, _), _| a != address);
            }
        }

        // Refresh the storage roots of accounts whose storage changed.
        let touched: Vec<Address> = deltas
            .iter()
            .flat_map(|d| d.storage.keys().map(|(a, _)| *a))
            .collect();
        let mut per_account: BTreeMap<Address, Vec<(Hash, Hash)>> = BTreeMap::new();
        for ((address, slot), value) in &storage {
            if touched.contains(address) {
                per_account.entry(*address).or_default().push((*slot, *value));
            }
        }
        let refreshed: Vec<(Address, Hash)> = if per_account.len() < PARALLEL_THRESHOLD {
            per_account
                .into_iter()
                .map(|(address, words)| (address, storage_root(&words)))
                .collect()
        } else {
            per_account
                .into_par_iter()
                .map(|(address, words)| (address, storage_root(&words)))
                .collect()
        };
        for (address, root) in refreshed {
            if let Some(account) = accounts.get_mut(&address) {
                account.storage_root = root;
            }
        }

        StateSnapshot {
            height,
            accounts,
            storage,
        }
    }

    /// Rough memory footprint, for the executor's memory bound.
    pub fn estimate_bytes(&self) -> usize {
        self.accounts.len() * 128 + self.storage.len() * 96
    }
}

/// Keccak fold over an account's sorted storage words.
fn storage_root(words: &[(Hash, Hash)]) -> Hash {
    let mut hasher = Keccak256::new();
    for (slot, value) in words {
        hasher.update(slot.as_bytes());
        hasher.update(value.as_bytes());
    }
    let digest = hasher.finalize();
    Hash::from_slice(&digest)
}
