//! Canonical content hashing.
//!
//! Every hashable entity is hashed over its canonical `bincode` encoding,
//! so two values hash equal iff their contents are equal. Keccak-256 is the
//! chain-wide digest.

use crate::entities::Hash;
use serde::Serialize;
use sha3::{Digest, Keccak256};

/// Keccak-256 over raw bytes.
pub fn keccak256(bytes: &[u8]) -> Hash {
    let digest = Keccak256::digest(bytes);
    Hash::from_slice(&digest)
}

/// Keccak-256 over the canonical encoding of a serializable value.
///
/// Returns `None` only if encoding fails, which for the entity types in
/// this crate cannot happen; callers that hash foreign types should treat
/// `None` as malformed input.
pub fn content_hash<T: Serialize>(value: &T) -> Option<Hash> {
    bincode::serialize(value).ok().map(|bytes| keccak256(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keccak_known_vector() {
        // keccak256("") is a fixed constant
        let empty = keccak256(b"");
        assert_eq!(
            hex::encode(empty.as_bytes()),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_content_hash_deterministic() {
        let a = content_hash(&(1u64, "abc")).unwrap();
        let b = content_hash(&(1u64, "abc")).unwrap();
        let c = content_hash(&(2u64, "abc")).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
