//! # Mempool
//!
//! The pending-transaction store. Admission is atomic: signature check,
//! duplicate check, nonce policy, capacity check, footprint computation,
//! conflict scan, and graph insertion all happen under one write
//! acquisition.
//!
//! Output is a point-in-time **level snapshot**: `levels()[i]` is the list
//! of entries at dependency level `i`, priority-descending, deep-copied so
//! the caller can iterate without holding the pool lock.
//!
//! ## Indices
//!
//! - `by_hash`: O(1) lookup by content hash
//! - `by_price`: priority-ordered set for eviction and intra-level order
//! - `by_sender`: nonce-ordered pending transactions per account
//! - `queued`: per-sender side-table for nonce-gapped arrivals

pub mod config;
pub mod entry;
pub mod errors;
pub mod mempool;
pub mod pool;

pub use config::MempoolConfig;
pub use entry::{priority_of, PoolEntry};
pub use errors::MempoolError;
pub use mempool::Mempool;
pub use pool::{MempoolStats, PoolInner};
