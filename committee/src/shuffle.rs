use types::{Hash256, Keccak256Hasher};

/// Number of swap-or-not rounds applied per index. Matches the round count used throughout the
/// beacon chain shuffling algorithm; enough rounds that the permutation is indistinguishable
/// from random for any practical committee size.
const SHUFFLE_ROUND_COUNT: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleError {
    IndexOutOfBounds { index: usize, count: usize },
}

/// The "swap-or-not" shuffle: deterministically maps `index` into its shuffled position among
/// `index_count` elements under `seed`.
///
/// Each round derives a pivot and a flip position from `(seed, round)`, then decides via a
/// single pseudo-random bit whether `index` swaps with its mirror position. Applying all rounds
/// in sequence yields a full permutation: same `(seed, index_count)` always produces the same
/// mapping, and distinct seeds produce distinguishable orderings with overwhelming probability.
pub fn compute_shuffled_index(
    mut index: usize,
    index_count: usize,
    seed: Hash256,
    hasher: &dyn Keccak256Hasher,
) -> Result<usize, ShuffleError> {
    if index >= index_count {
        return Err(ShuffleError::IndexOutOfBounds {
            index,
            count: index_count,
        });
    }

    for round in 0..SHUFFLE_ROUND_COUNT {
        let pivot = (bytes_to_u64(hasher.hash_concat(&[seed.as_slice(), &[round]]).as_slice()) as usize)
            % index_count;
        let flip = (pivot + (index_count - index)) % index_count;
        let position = index.max(flip);

        let position_bucket = ((position / 256) as u32).to_le_bytes();
        let source = hasher.hash_concat(&[seed.as_slice(), &[round], &position_bucket]);
        let byte = source[(position % 256) / 8];
        let bit = (byte >> (position % 8)) & 1;

        index = if bit == 1 { flip } else { index };
    }

    Ok(index)
}

fn bytes_to_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// Produces the full shuffled permutation of `indices` under `seed`.
pub fn shuffle_list(indices: &[u64], seed: Hash256, hasher: &dyn Keccak256Hasher) -> Vec<u64> {
    (0..indices.len())
        .map(|i| {
            let shuffled = compute_shuffled_index(i, indices.len(), seed, hasher)
                .expect("i is always < indices.len() by construction");
            indices[shuffled]
        })
        .collect()
}
