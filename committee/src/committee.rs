use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::instrument;
use types::{Config, Epoch, Hash256, Keccak256Hasher, ValidatorIndex};

use crate::shuffle::shuffle_list;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitteeError {
    NoValidators,
    GroupNotFound,
    MemberNotFound,
}

/// `validator_index → (slot_offset, committee_index, position)`.
pub type Assignment = (usize, usize, usize);

/// The deterministic 3-D committee structure for one epoch:
/// `committees[slot_offset][committee_index] == Vec<ValidatorIndex>`, plus the inverse
/// assignment index.
#[derive(Debug, Clone)]
pub struct EpochCommittees {
    epoch: Epoch,
    committees_per_slot: u64,
    committees: Vec<Vec<Vec<ValidatorIndex>>>,
    assignment: HashMap<ValidatorIndex, Assignment>,
}

impl EpochCommittees {
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn committees_per_slot(&self) -> u64 {
        self.committees_per_slot
    }

    pub fn committee(&self, slot_offset: usize, committee_index: usize) -> Result<&[ValidatorIndex], CommitteeError> {
        self.committees
            .get(slot_offset)
            .and_then(|slot| slot.get(committee_index))
            .map(|c| c.as_slice())
            .ok_or(CommitteeError::GroupNotFound)
    }

    pub fn assignment_of(&self, validator_index: ValidatorIndex) -> Result<Assignment, CommitteeError> {
        self.assignment
            .get(&validator_index)
            .copied()
            .ok_or(CommitteeError::MemberNotFound)
    }
}

/// `committees_per_slot = max(1, min(MAX_COMMITTEES_PER_SLOT,
/// active_count / SLOTS_PER_EPOCH / TARGET_COMMITTEE_SIZE))`.
fn committees_per_slot(active_count: usize, config: &Config) -> u64 {
    let per_slot = active_count as u64 / config.slots_per_epoch / config.target_committee_size;
    per_slot.max(1).min(config.max_committees_per_slot)
}

/// Divides `items` into `groups` contiguous chunks as evenly as possible, with any remainder
/// distributed to the earlier groups.
fn partition<T: Clone>(items: &[T], groups: usize) -> Vec<Vec<T>> {
    let base = items.len() / groups;
    let remainder = items.len() % groups;
    let mut result = Vec::with_capacity(groups);
    let mut start = 0;
    for g in 0..groups {
        let size = base + usize::from(g < remainder);
        result.push(items[start..start + size].to_vec());
        start += size;
    }
    result
}

/// `compute_epoch_seed(epoch, randao_mix) := Keccak256(epoch || randao_mix)`.
pub fn compute_epoch_seed(epoch: Epoch, randao_mix: Hash256, hasher: &dyn Keccak256Hasher) -> Hash256 {
    hasher.hash_concat(&[&epoch.as_u64().to_be_bytes(), randao_mix.as_slice()])
}

/// Shuffles `active_indices`, caps at `config.max_attesters`, and partitions the result into
/// `SLOTS_PER_EPOCH × committees_per_slot` groups, building the inverse assignment index.
pub fn compute_epoch_committees(
    epoch: Epoch,
    active_indices: &[ValidatorIndex],
    seed: Hash256,
    config: &Config,
    hasher: &dyn Keccak256Hasher,
) -> Result<EpochCommittees, CommitteeError> {
    if active_indices.is_empty() {
        return Err(CommitteeError::NoValidators);
    }

    let capped: Vec<ValidatorIndex> = if active_indices.len() > config.max_attesters {
        active_indices[..config.max_attesters].to_vec()
    } else {
        active_indices.to_vec()
    };

    let per_slot = committees_per_slot(capped.len(), config);
    let shuffled = shuffle_list(&capped, seed, hasher);
    let total_groups = config.slots_per_epoch as usize * per_slot as usize;
    let groups = partition(&shuffled, total_groups);

    let mut committees = vec![vec![Vec::new(); per_slot as usize]; config.slots_per_epoch as usize];
    let mut assignment = HashMap::with_capacity(capped.len());

    for (group_index, group) in groups.into_iter().enumerate() {
        let slot_offset = group_index / per_slot as usize;
        let committee_index = group_index % per_slot as usize;
        for (position, validator_index) in group.iter().enumerate() {
            assignment.insert(*validator_index, (slot_offset, committee_index, position));
        }
        committees[slot_offset][committee_index] = group;
    }

    Ok(EpochCommittees {
        epoch,
        committees_per_slot: per_slot,
        committees,
        assignment,
    })
}

/// Per-epoch cache of computed committee structures. Readers of an already-computed epoch see a
/// stable, independently-owned `Arc` snapshot; computing a new epoch never disturbs one already
/// handed out.
pub struct CommitteeCache {
    epochs: RwLock<HashMap<Epoch, Arc<EpochCommittees>>>,
}

impl Default for CommitteeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CommitteeCache {
    pub fn new() -> Self {
        Self {
            epochs: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, epoch: Epoch) -> Option<Arc<EpochCommittees>> {
        self.epochs.read().get(&epoch).cloned()
    }

    #[instrument(level = "debug", skip(self, active_indices, hasher))]
    pub fn rotate_epoch(
        &self,
        epoch: Epoch,
        active_indices: &[ValidatorIndex],
        seed: Hash256,
        config: &Config,
        hasher: &dyn Keccak256Hasher,
    ) -> Result<Arc<EpochCommittees>, CommitteeError> {
        let computed = Arc::new(compute_epoch_committees(epoch, active_indices, seed, config, hasher)?);
        self.epochs.write().insert(epoch, computed.clone());
        Ok(computed)
    }

    /// Drops every cached epoch strictly before `epoch`.
    pub fn prune_before_epoch(&self, epoch: Epoch) {
        self.epochs.write().retain(|cached_epoch, _| *cached_epoch >= epoch);
    }

    pub fn len(&self) -> usize {
        self.epochs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.read().is_empty()
    }
}
