//! # Shared Crypto
//!
//! The narrow cryptographic contract the transaction core consumes:
//! Ed25519 signature verification and Keccak-256 address derivation.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Transaction sender verification |
//! | `hashing` | Keccak-256 | Address derivation |
//!
//! ## Security Properties
//!
//! - **Ed25519**: deterministic nonces, no RNG dependency at verify time
//! - **verify_strict**: rejects malleable / small-order signatures

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

pub use errors::CryptoError;
pub use hashing::derive_address;
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
