use types::{Hash256, Keccak256Hasher, Slot, ValidatorIndex};

/// Recomputes the commitment hash per §6's canonical encoding: `be_u64(slot) ∥
/// be_u64(validator_index) ∥ block_root[32] ∥ vrf_proof`, hashed with Keccak256.
pub fn commitment_hash(
    slot: Slot,
    validator_index: ValidatorIndex,
    block_root: Hash256,
    vrf_proof: &[u8],
    hasher: &dyn Keccak256Hasher,
) -> Hash256 {
    hasher.hash_concat(&[
        &slot.as_u64().to_be_bytes(),
        &validator_index.to_be_bytes(),
        block_root.as_slice(),
        vrf_proof,
    ])
}

/// Deterministic VRF weight derived from a commit-time VRF proof:
/// `(u64_be(Keccak256(vrf_proof)[0..8]) / u64::MAX) / validator_set_size`.
pub fn vrf_weight(vrf_proof: &[u8], validator_set_size: usize, hasher: &dyn Keccak256Hasher) -> f64 {
    let digest = hasher.hash(vrf_proof);
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest.as_slice()[..8]);
    let raw = u64::from_be_bytes(buf);
    (raw as f64 / u64::MAX as f64) / validator_set_size.max(1) as f64
}

/// A phase-1 commitment: `(slot, validator_index, block_root, vrf_proof, commitment_hash)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitVote {
    pub slot: Slot,
    pub validator_index: ValidatorIndex,
    pub block_root: Hash256,
    pub vrf_proof: Vec<u8>,
    pub commitment_hash: Hash256,
}

/// A phase-2 reveal: `(slot, validator_index, block_root, vrf_proof)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealVote {
    pub slot: Slot,
    pub validator_index: ValidatorIndex,
    pub block_root: Hash256,
    pub vrf_proof: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Sha3Keccak256;

    #[test]
    fn commitment_hash_is_deterministic() {
        let a = commitment_hash(Slot::new(1), 2, Hash256::repeat_byte(3), b"proof", &Sha3Keccak256);
        let b = commitment_hash(Slot::new(1), 2, Hash256::repeat_byte(3), b"proof", &Sha3Keccak256);
        assert_eq!(a, b);
    }

    #[test]
    fn commitment_hash_changes_with_any_field() {
        let h = Sha3Keccak256;
        let base = commitment_hash(Slot::new(1), 2, Hash256::repeat_byte(3), b"proof", &h);
        let different_slot = commitment_hash(Slot::new(9), 2, Hash256::repeat_byte(3), b"proof", &h);
        assert_ne!(base, different_slot);
    }

    #[test]
    fn vrf_weight_is_deterministic_and_bounded() {
        let h = Sha3Keccak256;
        let a = vrf_weight(b"proof", 10, &h);
        let b = vrf_weight(b"proof", 10, &h);
        assert_eq!(a, b);
        assert!(a >= 0.0 && a <= 1.0 / 10.0);
    }
}
