use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, instrument};
use types::{Fraction, Hash256, Keccak256Hasher, Slot, ValidatorIndex};

use crate::commit::{commitment_hash, vrf_weight, CommitVote, RevealVote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrequorumError {
    NullVote,
    ZeroSlot,
    ZeroBlockRoot,
    EmptyVrfProof,
    EmptyCommitment,
    InvalidCommitment,
    DuplicateVote,
    SlotVoteLimit,
    CommitmentNotFound,
    RevealDuplicate,
    RevealMismatch,
}

impl std::fmt::Display for PrequorumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for PrequorumError {}

#[derive(Debug, Clone, Copy)]
pub struct PrequorumConfig {
    pub threshold: Fraction,
    pub timeout: Duration,
    pub min_validators: usize,
    pub max_votes_per_slot: usize,
    pub validator_set_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStatus {
    pub committed: usize,
    pub revealed: usize,
    pub quorum_reached: bool,
    pub timed_out: bool,
}

#[derive(Debug, Clone)]
struct Commitment {
    block_root: Hash256,
    commitment_hash: Hash256,
    vrf_weight: f64,
    revealed: bool,
}

#[derive(Debug, Clone, Default)]
struct RoundState {
    commitments: HashMap<ValidatorIndex, Commitment>,
    revealed_weight_by_root: HashMap<Hash256, f64>,
    first_commit_ms: Option<u64>,
}

/// Two-phase commit-reveal secure prequorum with VRF-weighted quorum (component C8).
///
/// Orthogonal to single-slot finality: a prequorum signal is an advisory, user-facing
/// preconfirmation — it never feeds back into `finality::SsfEngine` or `endgame::EndgamePipeline`.
pub struct PrequorumEngine {
    config: PrequorumConfig,
    rounds: RwLock<HashMap<Slot, RoundState>>,
}

impl PrequorumEngine {
    pub fn new(config: PrequorumConfig) -> Self {
        Self {
            config,
            rounds: RwLock::new(HashMap::new()),
        }
    }

    /// Phase 1: records a commitment after verifying `commitment_hash` matches the re-derived
    /// hash, and pre-computes the validator's VRF weight.
    #[instrument(level = "debug", skip(self, vote, hasher))]
    pub fn commit(
        &self,
        vote: Option<CommitVote>,
        timestamp_ms: u64,
        hasher: &dyn Keccak256Hasher,
    ) -> Result<(), PrequorumError> {
        let vote = vote.ok_or(PrequorumError::NullVote)?;

        if vote.slot.as_u64() == 0 {
            return Err(PrequorumError::ZeroSlot);
        }
        if vote.block_root.is_zero() {
            return Err(PrequorumError::ZeroBlockRoot);
        }
        if vote.vrf_proof.is_empty() {
            return Err(PrequorumError::EmptyVrfProof);
        }
        if vote.commitment_hash.is_zero() {
            return Err(PrequorumError::EmptyCommitment);
        }

        let expected = commitment_hash(vote.slot, vote.validator_index, vote.block_root, &vote.vrf_proof, hasher);
        if expected != vote.commitment_hash {
            return Err(PrequorumError::InvalidCommitment);
        }

        let mut rounds = self.rounds.write();
        let round = rounds.entry(vote.slot).or_default();

        if round.commitments.contains_key(&vote.validator_index) {
            return Err(PrequorumError::DuplicateVote);
        }
        if round.commitments.len() >= self.config.max_votes_per_slot {
            return Err(PrequorumError::SlotVoteLimit);
        }

        let weight = vrf_weight(&vote.vrf_proof, self.config.validator_set_size, hasher);
        round.commitments.insert(
            vote.validator_index,
            Commitment {
                block_root: vote.block_root,
                commitment_hash: vote.commitment_hash,
                vrf_weight: weight,
                revealed: false,
            },
        );
        round.first_commit_ms.get_or_insert(timestamp_ms);

        Ok(())
    }

    /// Phase 2: verifies the reveal re-derives the stored commitment, rejects duplicate reveals,
    /// and credits the validator's VRF weight to the revealed target root.
    #[instrument(level = "debug", skip(self, vote, hasher))]
    pub fn reveal(&self, vote: Option<RevealVote>, hasher: &dyn Keccak256Hasher) -> Result<(), PrequorumError> {
        let vote = vote.ok_or(PrequorumError::NullVote)?;

        if vote.slot.as_u64() == 0 {
            return Err(PrequorumError::ZeroSlot);
        }
        if vote.block_root.is_zero() {
            return Err(PrequorumError::ZeroBlockRoot);
        }
        if vote.vrf_proof.is_empty() {
            return Err(PrequorumError::EmptyVrfProof);
        }

        let mut rounds = self.rounds.write();
        let round = rounds.entry(vote.slot).or_default();

        let commitment = round
            .commitments
            .get_mut(&vote.validator_index)
            .ok_or(PrequorumError::CommitmentNotFound)?;

        if commitment.revealed {
            return Err(PrequorumError::RevealDuplicate);
        }

        let rederived = commitment_hash(vote.slot, vote.validator_index, vote.block_root, &vote.vrf_proof, hasher);
        if rederived != commitment.commitment_hash {
            return Err(PrequorumError::RevealMismatch);
        }

        commitment.revealed = true;
        let weight = commitment.vrf_weight;
        *round.revealed_weight_by_root.entry(vote.block_root).or_insert(0.0) += weight;

        debug!(slot = vote.slot.as_u64(), validator = vote.validator_index, "prequorum reveal accepted");

        Ok(())
    }

    /// `revealed_count >= MinValidators AND sum(vrf_weight of revealed) >= threshold / validator_set_size`.
    pub fn round_status(&self, slot: Slot, now_ms: u64) -> RoundStatus {
        let rounds = self.rounds.read();
        let Some(round) = rounds.get(&slot) else {
            return RoundStatus {
                committed: 0,
                revealed: 0,
                quorum_reached: false,
                timed_out: false,
            };
        };

        let committed = round.commitments.len();
        let revealed = round.commitments.values().filter(|c| c.revealed).count();
        let total_revealed_weight: f64 = round.revealed_weight_by_root.values().sum();
        let required = self.config.threshold.numerator as f64
            / self.config.threshold.denominator as f64
            / self.config.validator_set_size.max(1) as f64;

        let quorum_reached = revealed >= self.config.min_validators && total_revealed_weight >= required;
        let timed_out = round
            .first_commit_ms
            .map(|first| now_ms.saturating_sub(first) as u128 > self.config.timeout.as_millis())
            .unwrap_or(false);

        RoundStatus {
            committed,
            revealed,
            quorum_reached,
            timed_out,
        }
    }

    /// Drops all state for `slot`.
    pub fn purge_slot(&self, slot: Slot) {
        self.rounds.write().remove(&slot);
    }
}
