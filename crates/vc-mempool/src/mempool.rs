//! Thread-safe mempool facade.
//!
//! Readers-writer discipline: admission and removal take the write lock;
//! level-snapshot and stats queries take the read lock and return deep
//! copies, so callers iterate without holding the lock.

use crate::config::MempoolConfig;
use crate::entry::PoolEntry;
use crate::errors::MempoolError;
use crate::pool::{MempoolStats, PoolInner};
use shared_types::{Address, Hash, SignedTransaction, Timestamp};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-wide pending-transaction store for one chain instance.
///
/// Passed explicitly (usually as `Arc<Mempool>`) to every consumer; there
/// is no module-level instance.
#[derive(Debug)]
pub struct Mempool {
    inner: RwLock<PoolInner>,
}

impl Mempool {
    /// Mempool with the given configuration.
    pub fn new(config: MempoolConfig) -> Self {
        Self {
            inner: RwLock::new(PoolInner::new(config)),
        }
    }

    /// Mempool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(MempoolConfig::default())
    }

    /// Admit a wire-encoded signed transaction.
    ///
    /// Decoding failure maps to [`MempoolError::InvalidFormat`]; everything
    /// else follows the admission pipeline.
    pub fn submit(&self, signed_tx_bytes: &[u8]) -> Result<Hash, MempoolError> {
        let tx: SignedTransaction =
            bincode::deserialize(signed_tx_bytes).map_err(|_| MempoolError::InvalidFormat)?;
        self.submit_tx(tx)
    }

    /// Admit an already-decoded signed transaction.
    pub fn submit_tx(&self, tx: SignedTransaction) -> Result<Hash, MempoolError> {
        let now = now_millis();
        self.inner.write().expect("mempool lock poisoned").insert(tx, now)
    }

    /// Point-in-time level decomposition (deep copy).
    pub fn levels(&self) -> Vec<Vec<PoolEntry>> {
        self.inner.read().expect("mempool lock poisoned").levels()
    }

    /// True if `hash` is pending or queued.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.inner.read().expect("mempool lock poisoned").contains(hash)
    }

    /// Aggregate statistics.
    pub fn stats(&self) -> MempoolStats {
        self.inner
            .read()
            .expect("mempool lock poisoned")
            .stats(now_millis())
    }

    /// Report transactions included in a finalised block.
    pub fn remove_included(&self, hashes: &[Hash]) {
        self.inner
            .write()
            .expect("mempool lock poisoned")
            .remove_included(hashes, now_millis());
    }

    /// Seed the committed nonce of an account (genesis / state sync).
    pub fn set_account_nonce(&self, address: Address, nonce: u64) {
        self.inner
            .write()
            .expect("mempool lock poisoned")
            .set_account_nonce(address, nonce);
    }

    /// Pending entry count.
    pub fn pending_count(&self) -> usize {
        self.inner.read().expect("mempool lock poisoned").pending_count()
    }
}

fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
