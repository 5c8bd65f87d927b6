use tracing::warn;
use types::{Hash256, PublicKeyBytes, SignatureBytes};

use crate::backend::BLSBackend;
use crate::domain::{compute_signing_root, domain_separation, DOMAIN_ATTESTER, DOMAIN_PROPOSER, DOMAIN_SYNC_COMMITTEE};
use types::Keccak256Hasher;

/// The fork-scoped parameters that feed into every domain computation.
#[derive(Debug, Clone, Copy)]
pub struct ForkContext {
    pub fork_version: [u8; 4],
    pub genesis_root: Hash256,
}

fn signing_root_for(
    domain_type: [u8; 4],
    object_root: Hash256,
    fork: ForkContext,
    hasher: &dyn Keccak256Hasher,
) -> Hash256 {
    let domain = domain_separation(domain_type, fork.fork_version, fork.genesis_root, hasher);
    compute_signing_root(object_root, domain, hasher)
}

/// Verifies a block proposer's signature over `block_root`.
pub fn verify_proposer_signature(
    pubkey: &PublicKeyBytes,
    block_root: Hash256,
    signature: &SignatureBytes,
    fork: ForkContext,
    backend: &dyn BLSBackend,
    hasher: &dyn Keccak256Hasher,
) -> bool {
    let signing_root = signing_root_for(DOMAIN_PROPOSER, block_root, fork, hasher);
    backend.verify(pubkey, signing_root, signature)
}

/// Verifies an attestation signature aggregated over every attesting committee member's pubkey.
pub fn verify_attestation_signature(
    pubkeys: &[PublicKeyBytes],
    attestation_data_root: Hash256,
    signature: &SignatureBytes,
    fork: ForkContext,
    backend: &dyn BLSBackend,
    hasher: &dyn Keccak256Hasher,
) -> bool {
    if pubkeys.is_empty() {
        warn!("attestation signature verification requested with no attesting pubkeys");
    }
    let signing_root = signing_root_for(DOMAIN_ATTESTER, attestation_data_root, fork, hasher);
    backend.verify_aggregate(pubkeys, signing_root, signature)
}

/// Verifies a sync-committee member's signature over a block root.
pub fn verify_sync_committee_signature(
    pubkey: &PublicKeyBytes,
    block_root: Hash256,
    signature: &SignatureBytes,
    fork: ForkContext,
    backend: &dyn BLSBackend,
    hasher: &dyn Keccak256Hasher,
) -> bool {
    let signing_root = signing_root_for(DOMAIN_SYNC_COMMITTEE, block_root, fork, hasher);
    backend.verify(pubkey, signing_root, signature)
}
