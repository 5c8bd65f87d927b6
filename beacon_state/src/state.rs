use crate::historical::HistoricalStateCache;
use crate::ring_buffer::RecentStateCache;
use safe_arith::SafeArith;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use types::{Checkpoint, Config, Epoch, Hash256, JustificationBits, Keccak256Hasher, Slot, Validator};

/// The subset of a proposed block's fields the core state transition cares about. The body
/// itself (transactions, attestations, operations) is opaque to this crate; only `body_root`
/// — its digest — participates in the block root computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub slot: Slot,
    pub parent_root: Hash256,
    pub state_root: Hash256,
    pub body_root: Hash256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    NilBlock,
    SlotRegression { state_slot: Slot, block_slot: Slot },
    ParentRootMismatch { expected: Hash256, found: Hash256 },
    ValidatorIndexBound { index: u64, len: usize },
    ValidatorNotFound,
    RecentSlotNotFound(Slot),
    HistoricalNotFound(Hash256),
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for StateError {}

/// The deterministic digest of `(slot, parent_root, state_root, body_root)`. Equal tuples
/// always hash to equal roots; changing any field changes the root.
pub fn compute_block_root(block: &Block, hasher: &dyn Keccak256Hasher) -> Hash256 {
    hasher.hash_concat(&[
        &block.slot.as_u64().to_be_bytes(),
        block.parent_root.as_slice(),
        block.state_root.as_slice(),
        block.body_root.as_slice(),
    ])
}

/// Owns the validator registry, balances, recent/historical root caches and the finality
/// checkpoints, and drives the per-block state transition.
#[derive(Debug, Clone)]
pub struct BeaconState {
    pub slot: Slot,
    pub epoch: Epoch,
    pub genesis_time: u64,

    pub validators: Vec<Validator>,
    pub balances: Vec<u64>,

    pub justification_bits: JustificationBits,
    pub current_justified: Checkpoint,
    pub previous_justified: Checkpoint,
    pub finalized: Checkpoint,

    pub latest_block_root: Hash256,

    recent_state: RecentStateCache,
    historical_state: HistoricalStateCache,

    config: Config,
}

impl BeaconState {
    /// Builds the genesis state: slot 0, epoch 0, justified and finalized both pointing at the
    /// genesis checkpoint.
    pub fn new(config: Config, genesis_time: u64, genesis_root: Hash256) -> Self {
        let genesis_checkpoint = Checkpoint::genesis(genesis_root);
        let historical_roots_limit = config.historical_roots_limit;
        Self {
            slot: Slot::new(0),
            epoch: Epoch::new(0),
            genesis_time,
            validators: Vec::new(),
            balances: Vec::new(),
            justification_bits: JustificationBits::new(),
            current_justified: genesis_checkpoint,
            previous_justified: genesis_checkpoint,
            finalized: genesis_checkpoint,
            latest_block_root: genesis_root,
            recent_state: RecentStateCache::new(0),
            historical_state: HistoricalStateCache::new(historical_roots_limit),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn recent_state(&self) -> &RecentStateCache {
        &self.recent_state
    }

    pub fn historical_state(&self) -> &HistoricalStateCache {
        &self.historical_state
    }

    /// Registers a new validator, immediately active as of `activation_epoch`. Returns the
    /// validator's stable index.
    pub fn add_validator(&mut self, mut validator: Validator, balance: u64, activation_epoch: Epoch) -> u64 {
        validator.activation_epoch = activation_epoch;
        self.validators.push(validator);
        self.balances.push(balance);
        (self.validators.len() - 1) as u64
    }

    pub fn get_validator(&self, index: u64) -> Result<&Validator, StateError> {
        self.validators
            .get(index as usize)
            .ok_or(StateError::ValidatorIndexBound {
                index,
                len: self.validators.len(),
            })
    }

    pub fn get_validator_by_pubkey(
        &self,
        pubkey: &types::PublicKeyBytes,
    ) -> Result<(&Validator, u64), StateError> {
        self.validators
            .iter()
            .position(|v| &v.pubkey == pubkey)
            .map(|idx| (&self.validators[idx], idx as u64))
            .ok_or(StateError::ValidatorNotFound)
    }

    pub fn active_validator_indices(&self, epoch: Epoch) -> Vec<u64> {
        self.validators
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_active_at(epoch))
            .map(|(i, _)| i as u64)
            .collect()
    }

    pub fn total_active_balance(&self, epoch: Epoch) -> u64 {
        self.validators
            .iter()
            .filter(|v| v.is_active_at(epoch))
            .map(|v| v.effective_balance)
            .fold(0u64, |acc, b| acc.saturating_add(b))
    }

    /// `effective_balance := min(balance, MAX_EFFECTIVE_BALANCE)` for every validator.
    pub fn effective_balance_update(&mut self) {
        let max = self.config.max_effective_balance;
        for (validator, balance) in self.validators.iter_mut().zip(self.balances.iter()) {
            validator.effective_balance = (*balance).min(max);
        }
    }

    /// Advances the state by applying `block`, per the per-block transition in §4.1:
    /// slot/parent checks, slot and epoch advancement, block-root caching, and (on an epoch
    /// boundary) effective-balance bookkeeping. Justification/finalization is a separate
    /// component (`finality::FfgTracker`) driven by the caller once attestation weights for
    /// the epoch are known; this transition only keeps the ledger fields consistent.
    #[instrument(level = "debug", skip(self, hasher))]
    pub fn state_transition(
        &mut self,
        block: Option<&Block>,
        hasher: &dyn Keccak256Hasher,
    ) -> Result<Hash256, StateError> {
        let block = block.ok_or(StateError::NilBlock)?;

        if block.slot <= self.slot {
            return Err(StateError::SlotRegression {
                state_slot: self.slot,
                block_slot: block.slot,
            });
        }

        if self.slot.as_u64() > 0 && block.parent_root != self.latest_block_root {
            return Err(StateError::ParentRootMismatch {
                expected: self.latest_block_root,
                found: block.parent_root,
            });
        }

        let previous_epoch = self.epoch;
        self.slot = block.slot;
        self.epoch = self.slot.epoch(self.config.slots_per_epoch);

        let block_root = compute_block_root(block, hasher);
        self.recent_state.put(block.slot, block_root);
        self.latest_block_root = block_root;
        self.historical_state.put(block_root, block.state_root);

        if self.epoch > previous_epoch {
            // Eligible-activation accounting has no churn-limited queue in this core: callers
            // choose a validator's activation epoch explicitly via `add_validator`.
            debug!(epoch = self.epoch.as_u64(), "epoch advanced, updating effective balances");
            self.effective_balance_update();
        }

        Ok(block_root)
    }

    pub fn get_recent_root(&self, slot: Slot) -> Result<Hash256, StateError> {
        self.recent_state
            .get(slot)
            .ok_or(StateError::RecentSlotNotFound(slot))
    }

    pub fn get_historical_state_root(&self, block_root: Hash256) -> Result<Hash256, StateError> {
        self.historical_state
            .get(block_root)
            .ok_or(StateError::HistoricalNotFound(block_root))
    }
}
