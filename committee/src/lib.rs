//! Deterministic committee shuffling, per-slot committee assignment, and the per-epoch cache
//! (component C5).

mod committee;
mod shuffle;

pub use committee::{
    compute_epoch_committees, compute_epoch_seed, Assignment, CommitteeCache, CommitteeError, EpochCommittees,
};
pub use shuffle::{compute_shuffled_index, shuffle_list, ShuffleError};
