use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::{debug, instrument};
use types::{Fraction, Hash256, Slot, ValidatorIndex};

const DEFAULT_MAX_SLOT_HISTORY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsfError {
    TotalWeightZero,
    ValidatorUnknown(ValidatorIndex),
    DuplicateVote,
    SlotAlreadyFinalized(Slot),
    InvalidSlot(Slot),
}

/// A single attester's vote for a slot's target root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub slot: Slot,
    pub validator_index: ValidatorIndex,
    pub target_root: Hash256,
    pub stake: u64,
}

/// Two distinct target roots observed from the same validator at the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Equivocation {
    pub validator_index: ValidatorIndex,
    pub slot: Slot,
    pub root1: Hash256,
    pub root2: Hash256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalityStatus {
    pub is_finalized: bool,
    pub threshold: u64,
    pub leading_root: Option<Hash256>,
    pub leading_stake: u64,
}

/// The outcome of submitting one vote: whether it pushed the slot over threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub finalized_root: Option<Hash256>,
    pub time_to_finality_ms: Option<u64>,
}

#[derive(Debug, Clone)]
struct SlotRecord {
    votes: HashMap<ValidatorIndex, Hash256>,
    stake_by_root: HashMap<Hash256, u64>,
    equivocations: Vec<Equivocation>,
    first_vote_ms: Option<u64>,
    last_vote_ms: Option<u64>,
}

impl SlotRecord {
    fn new() -> Self {
        Self {
            votes: HashMap::new(),
            stake_by_root: HashMap::new(),
            equivocations: Vec::new(),
            first_vote_ms: None,
            last_vote_ms: None,
        }
    }

    fn leading(&self) -> (Option<Hash256>, u64) {
        self.stake_by_root
            .iter()
            .max_by_key(|(_, stake)| **stake)
            .map(|(root, stake)| (Some(*root), *stake))
            .unwrap_or((None, 0))
    }
}

/// A slot that has crossed the finality threshold, retained for historical lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalizedSlot {
    pub slot: Slot,
    pub root: Hash256,
    pub time_to_finality_ms: Option<u64>,
}

/// Single-slot finality: per-slot stake-weighted vote collection, threshold detection and
/// equivocation tracking (component C4).
pub struct SsfEngine {
    weights: HashMap<ValidatorIndex, u64>,
    total_weight: u64,
    threshold: Fraction,
    max_slot_history: usize,
    active: HashMap<Slot, SlotRecord>,
    history: LruCache<Slot, FinalizedSlot>,
    latest_finalized_slot: Option<Slot>,
}

impl SsfEngine {
    pub fn new(threshold: Fraction, max_slot_history: usize) -> Self {
        let capacity = if max_slot_history == 0 {
            DEFAULT_MAX_SLOT_HISTORY
        } else {
            max_slot_history
        };
        Self {
            weights: HashMap::new(),
            total_weight: 0,
            threshold,
            max_slot_history: capacity,
            active: HashMap::new(),
            history: LruCache::new(NonZeroUsize::new(capacity).expect("capacity is non-zero")),
            latest_finalized_slot: None,
        }
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn latest_finalized_slot(&self) -> Option<Slot> {
        self.latest_finalized_slot
    }

    /// Replaces the validator weight map wholesale and recomputes `total_weight`.
    pub fn set_validator_weights(&mut self, weights: HashMap<ValidatorIndex, u64>) {
        self.total_weight = weights.values().fold(0u64, |acc, w| acc.saturating_add(*w));
        self.weights = weights;
    }

    fn is_slot_in_window(&self, slot: Slot) -> bool {
        match self.latest_finalized_slot {
            Some(latest) => slot.as_u64() + self.max_slot_history as u64 >= latest.as_u64(),
            None => true,
        }
    }

    /// Records one vote, applying the rejection rules described for the SSF engine and
    /// declaring finality immediately if the vote pushes a target root over threshold.
    #[instrument(level = "debug", skip(self))]
    pub fn process_attestation(&mut self, vote: Vote, timestamp_ms: u64) -> Result<VoteOutcome, SsfError> {
        if self.total_weight == 0 {
            return Err(SsfError::TotalWeightZero);
        }
        if !self.weights.is_empty() && !self.weights.contains_key(&vote.validator_index) {
            return Err(SsfError::ValidatorUnknown(vote.validator_index));
        }
        if !self.is_slot_in_window(vote.slot) {
            return Err(SsfError::InvalidSlot(vote.slot));
        }
        if self.history.peek(&vote.slot).is_some() {
            return Err(SsfError::SlotAlreadyFinalized(vote.slot));
        }

        let record = self.active.entry(vote.slot).or_insert_with(SlotRecord::new);

        if let Some(existing_root) = record.votes.get(&vote.validator_index).copied() {
            if existing_root != vote.target_root {
                record.equivocations.push(Equivocation {
                    validator_index: vote.validator_index,
                    slot: vote.slot,
                    root1: existing_root,
                    root2: vote.target_root,
                });
                debug!(validator = vote.validator_index, slot = vote.slot.as_u64(), "equivocation detected");
            }
            return Err(SsfError::DuplicateVote);
        }

        record.votes.insert(vote.validator_index, vote.target_root);
        *record.stake_by_root.entry(vote.target_root).or_insert(0) += vote.stake;
        record.first_vote_ms.get_or_insert(timestamp_ms);
        record.last_vote_ms = Some(timestamp_ms);

        let leading_stake = record.stake_by_root[&vote.target_root];
        if self.threshold.is_met_by(leading_stake, self.total_weight) {
            let time_to_finality_ms = record
                .last_vote_ms
                .zip(record.first_vote_ms)
                .map(|(last, first)| last.saturating_sub(first));
            self.finalize(vote.slot, vote.target_root, time_to_finality_ms);
            return Ok(VoteOutcome {
                finalized_root: Some(vote.target_root),
                time_to_finality_ms,
            });
        }

        Ok(VoteOutcome {
            finalized_root: None,
            time_to_finality_ms: None,
        })
    }

    /// Recomputes the current finality status for `slot` without mutating any state.
    pub fn check_finality(&self, slot: Slot) -> FinalityStatus {
        if let Some(finalized) = self.history.peek(&slot) {
            return FinalityStatus {
                is_finalized: true,
                threshold: self.threshold.ceil_threshold(self.total_weight),
                leading_root: Some(finalized.root),
                leading_stake: self.total_weight,
            };
        }

        let threshold = self.threshold.ceil_threshold(self.total_weight);
        let (leading_root, leading_stake) = self
            .active
            .get(&slot)
            .map(SlotRecord::leading)
            .unwrap_or((None, 0));

        FinalityStatus {
            is_finalized: self.threshold.is_met_by(leading_stake, self.total_weight),
            threshold,
            leading_root,
            leading_stake,
        }
    }

    pub fn equivocations(&self, slot: Slot) -> &[Equivocation] {
        self.active
            .get(&slot)
            .map(|record| record.equivocations.as_slice())
            .unwrap_or(&[])
    }

    /// Marks `slot` finalized with `root`, moving its record out of the active map and into the
    /// bounded LRU history. Idempotent: finalizing an already-finalized slot is a no-op.
    pub fn finalize(&mut self, slot: Slot, root: Hash256, time_to_finality_ms: Option<u64>) {
        if self.history.peek(&slot).is_some() {
            return;
        }

        self.active.remove(&slot);
        self.history.put(
            slot,
            FinalizedSlot {
                slot,
                root,
                time_to_finality_ms,
            },
        );
        self.latest_finalized_slot = Some(match self.latest_finalized_slot {
            Some(current) if current >= slot => current,
            _ => slot,
        });
    }

    pub fn finalized_slot(&self, slot: Slot) -> Option<FinalizedSlot> {
        self.history.peek(&slot).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(byte: u8) -> Hash256 {
        Hash256::repeat_byte(byte)
    }

    fn engine_with_weights(weights: &[(ValidatorIndex, u64)]) -> SsfEngine {
        let mut engine = SsfEngine::new(Fraction::TWO_THIRDS, 256);
        engine.set_validator_weights(weights.iter().copied().collect());
        engine
    }

    #[test]
    fn process_attestation_rejects_zero_total_weight() {
        let mut engine = SsfEngine::new(Fraction::TWO_THIRDS, 256);
        let vote = Vote {
            slot: Slot::new(1),
            validator_index: 0,
            target_root: root(1),
            stake: 10,
        };
        assert_eq!(engine.process_attestation(vote, 0), Err(SsfError::TotalWeightZero));
    }

    #[test]
    fn process_attestation_rejects_unknown_validator() {
        let mut engine = engine_with_weights(&[(0, 2), (1, 1)]);
        let vote = Vote {
            slot: Slot::new(1),
            validator_index: 7,
            target_root: root(1),
            stake: 10,
        };
        assert_eq!(
            engine.process_attestation(vote, 0),
            Err(SsfError::ValidatorUnknown(7))
        );
    }

    /// Scenario 1: total stake = 3, a single vote of weight 2 from validator 0 already crosses
    /// 2/3 of the total (threshold 2), so the slot finalizes on the first vote.
    #[test]
    fn ssf_two_thirds_exact_finalizes_on_crossing_vote() {
        let mut engine = engine_with_weights(&[(0, 2), (1, 1)]);
        let vote = Vote {
            slot: Slot::new(1),
            validator_index: 0,
            target_root: root(0xDD),
            stake: 2,
        };
        let outcome = engine.process_attestation(vote, 100).unwrap();
        assert_eq!(outcome.finalized_root, Some(root(0xDD)));

        let status = engine.check_finality(Slot::new(1));
        assert!(status.is_finalized);
        assert_eq!(status.threshold, 2);
    }

    #[test]
    fn check_finality_false_below_threshold() {
        let mut engine = engine_with_weights(&[(0, 1), (1, 1), (2, 1)]);
        let vote = Vote {
            slot: Slot::new(1),
            validator_index: 0,
            target_root: root(1),
            stake: 1,
        };
        engine.process_attestation(vote, 0).unwrap();
        let status = engine.check_finality(Slot::new(1));
        assert!(!status.is_finalized);
        assert_eq!(status.leading_stake, 1);
    }

    /// Scenario 2: a validator voting for two different roots at the same slot is an
    /// equivocation; the second vote is rejected and not counted.
    #[test]
    fn duplicate_vote_for_different_root_is_recorded_as_equivocation() {
        let mut engine = engine_with_weights(&[(0, 100), (1, 100), (2, 100)]);
        let first = Vote {
            slot: Slot::new(7),
            validator_index: 0,
            target_root: root(0xAA),
            stake: 100,
        };
        let second = Vote {
            slot: Slot::new(7),
            validator_index: 0,
            target_root: root(0xBB),
            stake: 100,
        };
        engine.process_attestation(first, 0).unwrap();
        assert_eq!(
            engine.process_attestation(second, 1),
            Err(SsfError::DuplicateVote)
        );

        let equivocations = engine.equivocations(Slot::new(7));
        assert_eq!(equivocations.len(), 1);
        assert_eq!(equivocations[0].root1, root(0xAA));
        assert_eq!(equivocations[0].root2, root(0xBB));

        let status = engine.check_finality(Slot::new(7));
        assert_eq!(status.leading_stake, 100);
    }

    #[test]
    fn identical_repeated_vote_is_a_plain_duplicate_not_an_equivocation() {
        let mut engine = engine_with_weights(&[(0, 100), (1, 100), (2, 100)]);
        let vote = Vote {
            slot: Slot::new(7),
            validator_index: 0,
            target_root: root(0xAA),
            stake: 100,
        };
        engine.process_attestation(vote, 0).unwrap();
        assert_eq!(engine.process_attestation(vote, 1), Err(SsfError::DuplicateVote));
        assert!(engine.equivocations(Slot::new(7)).is_empty());
    }

    #[test]
    fn finalize_moves_slot_into_bounded_history() {
        let mut engine = engine_with_weights(&[(0, 2), (1, 1)]);
        let vote = Vote {
            slot: Slot::new(1),
            validator_index: 0,
            target_root: root(0xDD),
            stake: 2,
        };
        engine.process_attestation(vote, 0).unwrap();
        assert!(engine.active.get(&Slot::new(1)).is_none());
        assert_eq!(engine.finalized_slot(Slot::new(1)).unwrap().root, root(0xDD));
    }

    #[test]
    fn votes_for_slots_older_than_the_window_are_rejected() {
        let mut engine = SsfEngine::new(Fraction::TWO_THIRDS, 4);
        engine.set_validator_weights([(0, 2), (1, 1)].into_iter().collect());
        engine.finalize(Slot::new(100), root(1), None);

        let vote = Vote {
            slot: Slot::new(10),
            validator_index: 0,
            target_root: root(2),
            stake: 2,
        };
        assert_eq!(
            engine.process_attestation(vote, 0),
            Err(SsfError::InvalidSlot(Slot::new(10)))
        );
    }

    #[test]
    fn votes_for_an_already_finalized_slot_are_rejected() {
        let mut engine = engine_with_weights(&[(0, 2), (1, 1)]);
        engine.finalize(Slot::new(1), root(0xDD), None);
        let vote = Vote {
            slot: Slot::new(1),
            validator_index: 1,
            target_root: root(0xDD),
            stake: 1,
        };
        assert_eq!(
            engine.process_attestation(vote, 0),
            Err(SsfError::SlotAlreadyFinalized(Slot::new(1)))
        );
    }
}
