use types::{Hash256, Keccak256Hasher};

/// Domain type constants (§4.5): the first four bytes mixed into every domain produced by
/// `domain_separation`. Must match bit-exact.
pub const DOMAIN_PROPOSER: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
pub const DOMAIN_ATTESTER: [u8; 4] = [0x01, 0x00, 0x00, 0x00];
pub const DOMAIN_RANDAO: [u8; 4] = [0x02, 0x00, 0x00, 0x00];
pub const DOMAIN_DEPOSIT: [u8; 4] = [0x03, 0x00, 0x00, 0x00];
pub const DOMAIN_VOLUNTARY_EXIT: [u8; 4] = [0x04, 0x00, 0x00, 0x00];
pub const DOMAIN_SYNC_COMMITTEE: [u8; 4] = [0x07, 0x00, 0x00, 0x00];

/// Builds a 32-byte domain: the first 4 bytes are `domain_type` verbatim; the remaining 28 are
/// the leading bytes of `hash(fork_version || genesis_root)`. Distinct domain types, fork
/// versions or genesis roots always produce distinct domains.
pub fn domain_separation(
    domain_type: [u8; 4],
    fork_version: [u8; 4],
    genesis_root: Hash256,
    hasher: &dyn Keccak256Hasher,
) -> Hash256 {
    let fork_data_hash = hasher.hash_concat(&[&fork_version, genesis_root.as_slice()]);

    let mut domain = [0u8; 32];
    domain[..4].copy_from_slice(&domain_type);
    domain[4..].copy_from_slice(&fork_data_hash.as_slice()[..28]);
    Hash256::from_slice(&domain)
}

/// Combines an object root with a domain into the root that is actually signed.
pub fn compute_signing_root(object_root: Hash256, domain: Hash256, hasher: &dyn Keccak256Hasher) -> Hash256 {
    hasher.hash_concat(&[object_root.as_slice(), domain.as_slice()])
}
