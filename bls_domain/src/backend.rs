use types::{Hash256, PublicKeyBytes, SignatureBytes};

/// Abstract BLS verification capability, injected the same way `Keccak256Hasher` is: the domain
/// layer never hard-codes a curve implementation.
pub trait BLSBackend: Send + Sync {
    fn verify(&self, pubkey: &PublicKeyBytes, message: Hash256, signature: &SignatureBytes) -> bool;

    fn verify_aggregate(&self, pubkeys: &[PublicKeyBytes], message: Hash256, signature: &SignatureBytes) -> bool;
}

const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Production verifier backed by `blst`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlstBackend;

impl BLSBackend for BlstBackend {
    fn verify(&self, pubkey: &PublicKeyBytes, message: Hash256, signature: &SignatureBytes) -> bool {
        let Ok(pk) = blst::min_pk::PublicKey::from_bytes(pubkey.as_bytes()) else {
            return false;
        };
        let Ok(sig) = blst::min_pk::Signature::from_bytes(signature.as_bytes()) else {
            return false;
        };

        matches!(
            sig.verify(true, message.as_slice(), DST, &[], &pk, true),
            blst::BLST_ERROR::BLST_SUCCESS
        )
    }

    fn verify_aggregate(&self, pubkeys: &[PublicKeyBytes], message: Hash256, signature: &SignatureBytes) -> bool {
        if pubkeys.is_empty() {
            return false;
        }
        let Ok(sig) = blst::min_pk::Signature::from_bytes(signature.as_bytes()) else {
            return false;
        };
        let parsed: Result<Vec<_>, _> = pubkeys
            .iter()
            .map(|pk| blst::min_pk::PublicKey::from_bytes(pk.as_bytes()))
            .collect();
        let Ok(parsed) = parsed else {
            return false;
        };
        let refs: Vec<&blst::min_pk::PublicKey> = parsed.iter().collect();
        let Ok(aggregate) = blst::min_pk::AggregatePublicKey::aggregate(&refs, true) else {
            return false;
        };

        matches!(
            sig.verify(true, message.as_slice(), DST, &[], &aggregate.to_public_key(), true),
            blst::BLST_ERROR::BLST_SUCCESS
        )
    }
}

#[cfg(test)]
/// A deterministic stand-in for real curve arithmetic: treats the signature bytes as "valid"
/// iff they match a fixture fixed at construction. Keeps the specialized verifiers in this
/// crate testable without depending on real keypairs.
pub(crate) struct FixtureBackend {
    pub valid_signature: SignatureBytes,
}

#[cfg(test)]
impl BLSBackend for FixtureBackend {
    fn verify(&self, _pubkey: &PublicKeyBytes, _message: Hash256, signature: &SignatureBytes) -> bool {
        *signature == self.valid_signature
    }

    fn verify_aggregate(&self, pubkeys: &[PublicKeyBytes], _message: Hash256, signature: &SignatureBytes) -> bool {
        !pubkeys.is_empty() && *signature == self.valid_signature
    }
}
