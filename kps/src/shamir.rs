use rand::Rng;
use types::{Hash256, Keccak256Hasher};
use zeroize::Zeroizing;

use crate::gf256::{add, eval_polynomial, inv, mul};

/// Shares may use any index in `1..=255`; `0` is reserved for the secret's own x-coordinate, and
/// GF(2^8) only has 255 nonzero elements to hand out as distinct indices.
const MAX_SHARES: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpsError {
    EmptyKey,
    InvalidThreshold,
    InvalidTotalShares,
    ThresholdExceedsTotal,
    EmptyShares,
    InconsistentDataLength,
    InconsistentGroupId,
    DuplicateShareIndex,
}

impl std::fmt::Display for KpsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for KpsError {}

/// A single point `(index, data)` on the degree-(threshold-1) polynomials for every byte of a
/// split secret, plus the group the share belongs to (`Keccak256(secret)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub index: u8,
    pub data: Vec<u8>,
    pub group_id: Hash256,
}

/// Splits `secret` into `total_shares` shares, any `threshold` of which reconstruct it.
///
/// For each byte position, picks a degree-`(threshold - 1)` polynomial whose constant term is
/// that secret byte and whose higher coefficients are uniformly random, then evaluates it at
/// `x = 1..=total_shares`.
pub fn split_key(
    secret: &[u8],
    threshold: usize,
    total_shares: usize,
    hasher: &dyn Keccak256Hasher,
) -> Result<Vec<Share>, KpsError> {
    if secret.is_empty() {
        return Err(KpsError::EmptyKey);
    }
    if threshold == 0 {
        return Err(KpsError::InvalidThreshold);
    }
    if total_shares == 0 || total_shares > MAX_SHARES {
        return Err(KpsError::InvalidTotalShares);
    }
    if threshold > total_shares {
        return Err(KpsError::ThresholdExceedsTotal);
    }

    let group_id = hasher.hash(secret);
    let mut rng = rand::rng();

    // One polynomial per secret byte; `polynomials[byte][0]` is that byte's secret value.
    let polynomials: Vec<Vec<u8>> = secret
        .iter()
        .map(|&byte| {
            let mut coeffs = Vec::with_capacity(threshold);
            coeffs.push(byte);
            for _ in 1..threshold {
                coeffs.push(rng.random::<u8>());
            }
            coeffs
        })
        .collect();

    let shares = (1..=total_shares as u16)
        .map(|x| {
            let index = x as u8;
            let data = polynomials
                .iter()
                .map(|coeffs| eval_polynomial(coeffs, index))
                .collect();
            Share {
                index,
                data,
                group_id,
            }
        })
        .collect();

    Ok(shares)
}

/// Reconstructs the secret from any `threshold`-sized subset of its shares via Lagrange
/// interpolation of each byte's polynomial at `x = 0`.
pub fn recombine_key(shares: &[Share]) -> Result<Zeroizing<Vec<u8>>, KpsError> {
    let Some(first) = shares.first() else {
        return Err(KpsError::EmptyShares);
    };

    let data_len = first.data.len();
    let group_id = first.group_id;

    let mut seen_indices = std::collections::HashSet::with_capacity(shares.len());
    for share in shares {
        if share.data.len() != data_len {
            return Err(KpsError::InconsistentDataLength);
        }
        if share.group_id != group_id {
            return Err(KpsError::InconsistentGroupId);
        }
        if !seen_indices.insert(share.index) {
            return Err(KpsError::DuplicateShareIndex);
        }
    }

    let mut secret = vec![0u8; data_len];
    for (byte_index, secret_byte) in secret.iter_mut().enumerate() {
        let points: Vec<(u8, u8)> = shares.iter().map(|s| (s.index, s.data[byte_index])).collect();
        *secret_byte = lagrange_interpolate_at_zero(&points);
    }

    Ok(Zeroizing::new(secret))
}

/// `L(0) = sum_i y_i * prod_{j != i} x_j / (x_j - x_i)`, all arithmetic over GF(2^8) where
/// subtraction is XOR.
fn lagrange_interpolate_at_zero(points: &[(u8, u8)]) -> u8 {
    let mut result = 0u8;
    for (i, &(xi, yi)) in points.iter().enumerate() {
        let mut numerator = 1u8;
        let mut denominator = 1u8;
        for (j, &(xj, _)) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            numerator = mul(numerator, xj);
            denominator = mul(denominator, add(xj, xi));
        }
        let term = mul(yi, mul(numerator, inv(denominator)));
        result = add(result, term);
    }
    result
}

/// Structural validity only: a non-zero index, a non-zero group id, and a data length matching
/// the deployment's configured key size. This does not (and cannot) confirm the share lies on the
/// correct polynomial; only `recombine_key` with a full threshold set can do that.
pub fn verify_key_share(share: &Share, expected_key_size: usize) -> bool {
    share.index != 0 && !share.group_id.is_zero() && share.data.len() == expected_key_size
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::Sha3Keccak256;

    fn secret_bytes() -> Vec<u8> {
        vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04]
    }

    #[test]
    fn split_key_rejects_empty_secret() {
        assert_eq!(split_key(&[], 2, 3, &Sha3Keccak256), Err(KpsError::EmptyKey));
    }

    #[test]
    fn split_key_rejects_zero_threshold() {
        assert_eq!(
            split_key(&secret_bytes(), 0, 3, &Sha3Keccak256),
            Err(KpsError::InvalidThreshold)
        );
    }

    #[test]
    fn split_key_rejects_zero_total() {
        assert_eq!(
            split_key(&secret_bytes(), 2, 0, &Sha3Keccak256),
            Err(KpsError::InvalidTotalShares)
        );
    }

    #[test]
    fn split_key_rejects_threshold_above_total() {
        assert_eq!(
            split_key(&secret_bytes(), 5, 3, &Sha3Keccak256),
            Err(KpsError::ThresholdExceedsTotal)
        );
    }

    /// Scenario 5: threshold=3, shares=5; every subset of 3 of the 5 shares recombines to the
    /// original secret.
    #[test]
    fn every_threshold_sized_subset_recombines_the_secret() {
        let secret = secret_bytes();
        let shares = split_key(&secret, 3, 5, &Sha3Keccak256).unwrap();
        assert_eq!(shares.len(), 5);

        for combo in combinations(&shares, 3) {
            let recovered = recombine_key(&combo).unwrap();
            assert_eq!(&*recovered, secret.as_slice());
        }
    }

    #[test]
    fn recombine_rejects_empty_shares() {
        assert_eq!(recombine_key(&[]), Err(KpsError::EmptyShares));
    }

    #[test]
    fn recombine_rejects_inconsistent_data_length() {
        let secret = secret_bytes();
        let mut shares = split_key(&secret, 2, 3, &Sha3Keccak256).unwrap();
        shares[0].data.push(0);
        assert_eq!(recombine_key(&shares[..2]), Err(KpsError::InconsistentDataLength));
    }

    #[test]
    fn recombine_rejects_inconsistent_group_id() {
        let secret = secret_bytes();
        let mut shares = split_key(&secret, 2, 3, &Sha3Keccak256).unwrap();
        shares[0].group_id = Hash256::repeat_byte(0xAB);
        assert_eq!(recombine_key(&shares[..2]), Err(KpsError::InconsistentGroupId));
    }

    #[test]
    fn recombine_rejects_duplicate_index() {
        let secret = secret_bytes();
        let mut shares = split_key(&secret, 2, 3, &Sha3Keccak256).unwrap();
        shares[1].index = shares[0].index;
        assert_eq!(recombine_key(&shares[..2]), Err(KpsError::DuplicateShareIndex));
    }

    #[test]
    fn verify_key_share_checks_structure() {
        let secret = secret_bytes();
        let shares = split_key(&secret, 2, 3, &Sha3Keccak256).unwrap();
        assert!(verify_key_share(&shares[0], secret.len()));

        let mut zero_index = shares[0].clone();
        zero_index.index = 0;
        assert!(!verify_key_share(&zero_index, secret.len()));

        assert!(!verify_key_share(&shares[0], secret.len() + 1));
    }

    fn combinations(shares: &[Share], k: usize) -> Vec<Vec<Share>> {
        fn helper(shares: &[Share], k: usize, start: usize, current: &mut Vec<Share>, out: &mut Vec<Vec<Share>>) {
            if current.len() == k {
                out.push(current.clone());
                return;
            }
            for i in start..shares.len() {
                current.push(shares[i].clone());
                helper(shares, k, i + 1, current, out);
                current.pop();
            }
        }
        let mut out = Vec::new();
        helper(shares, k, 0, &mut Vec::new(), &mut out);
        out
    }
}
