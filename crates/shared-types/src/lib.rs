//! # Shared Types Crate
//!
//! This crate contains the chain entities shared by every VeloChain
//! subsystem: transactions, receipts, blocks, and account state, together
//! with the canonical content-hash helpers.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Content addressing**: every hashable entity derives its hash from a
//!   canonical `bincode` encoding, so equal hashes imply equal contents.
//! - **No behaviour**: subsystem logic lives in the subsystem crates; this
//!   crate only carries data and derivations over that data.

pub mod entities;
pub mod hashing;

pub use entities::*;
pub use hashing::{content_hash, keccak256};
