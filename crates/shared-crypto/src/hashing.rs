//! # Address Derivation
//!
//! Keccak-256 based address derivation: an account address is the last 20
//! bytes of the Keccak-256 digest of the owner's Ed25519 public key.

use sha3::{Digest, Keccak256};

/// Derive the 20-byte account address for a public key.
pub fn derive_address(public_key: &[u8; 32]) -> [u8; 20] {
    let digest = Keccak256::digest(public_key);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    address
}
