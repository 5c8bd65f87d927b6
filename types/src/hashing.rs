//! Keccak256 is consumed as an external capability throughout the core (block roots, epoch
//! seeds, domain separation, prequorum commitments). The core never hard-codes a particular
//! hash implementation; callers pass a `Keccak256Hasher` so test doubles can be swapped in.

use crate::Hash256;
use sha3::{Digest, Keccak256};

/// Abstract Keccak256 hashing capability consumed by the core state machines.
pub trait Keccak256Hasher: Send + Sync {
    fn hash(&self, bytes: &[u8]) -> Hash256;

    /// Convenience helper for hashing the concatenation of several byte slices without an
    /// intermediate allocation per caller.
    fn hash_concat(&self, parts: &[&[u8]]) -> Hash256 {
        let mut hasher = Keccak256::new();
        for part in parts {
            hasher.update(part);
        }
        let digest = hasher.finalize();
        Hash256::from_slice(&digest)
    }
}

/// The production Keccak256 implementation, backed by the `sha3` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha3Keccak256;

impl Keccak256Hasher for Sha3Keccak256 {
    fn hash(&self, bytes: &[u8]) -> Hash256 {
        let digest = Keccak256::digest(bytes);
        Hash256::from_slice(&digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_digest() {
        let h = Sha3Keccak256;
        assert_eq!(h.hash(b"abc"), h.hash(b"abc"));
    }

    #[test]
    fn different_input_different_digest() {
        let h = Sha3Keccak256;
        assert_ne!(h.hash(b"abc"), h.hash(b"abd"));
    }

    #[test]
    fn hash_concat_matches_hash_of_joined_bytes() {
        let h = Sha3Keccak256;
        let joined = [b"foo".as_slice(), b"bar".as_slice()].concat();
        assert_eq!(h.hash_concat(&[b"foo", b"bar"]), h.hash(&joined));
    }
}
