use std::collections::HashMap;
use tracing::instrument;
use types::{Checkpoint, Epoch, Hash256, JustificationBits};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfgError {
    /// `process_epoch` is only defined for `current_epoch > 1`; there is nothing to finalize
    /// before that.
    GenesisEpoch,
}

/// The outcome of one call to `process_epoch`: which checkpoints became justified, and which
/// (if any) finalization condition fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FfgUpdate {
    pub previous_justified: Checkpoint,
    pub current_justified: Checkpoint,
    pub finalized: Option<Checkpoint>,
}

/// The Casper FFG justification-and-finalization state machine: a 4-bit history plus the
/// three rolling checkpoints (previous/current justified, finalized).
#[derive(Debug, Clone)]
pub struct FfgTracker {
    bits: JustificationBits,
    previous_justified: Checkpoint,
    current_justified: Checkpoint,
    finalized: Checkpoint,
    finalized_checkpoints: HashMap<Epoch, Checkpoint>,
}

impl FfgTracker {
    pub fn new(genesis_checkpoint: Checkpoint) -> Self {
        let mut finalized_checkpoints = HashMap::new();
        finalized_checkpoints.insert(genesis_checkpoint.epoch, genesis_checkpoint);
        Self {
            bits: JustificationBits::new(),
            previous_justified: genesis_checkpoint,
            current_justified: genesis_checkpoint,
            finalized: genesis_checkpoint,
            finalized_checkpoints,
        }
    }

    pub fn previous_justified(&self) -> Checkpoint {
        self.previous_justified
    }

    pub fn current_justified(&self) -> Checkpoint {
        self.current_justified
    }

    pub fn finalized(&self) -> Checkpoint {
        self.finalized
    }

    pub fn bits(&self) -> JustificationBits {
        self.bits
    }

    /// A checkpoint is finalized iff its epoch is at or below the latest finalized epoch.
    pub fn is_finalized(&self, epoch: Epoch) -> bool {
        epoch <= self.finalized.epoch
    }

    pub fn finalized_checkpoint_at(&self, epoch: Epoch) -> Option<Checkpoint> {
        self.finalized_checkpoints.get(&epoch).copied()
    }

    /// Runs the per-epoch justification/finalization procedure described in §4.2.
    ///
    /// `prev_weight`/`curr_weight` are the stake-weighted participation totals for the previous
    /// and current epoch's target checkpoints; `total_weight` is the total active stake.
    /// `previous_epoch_root`/`current_epoch_root` are the canonical block roots at the start of
    /// those epochs, used to build the checkpoints that get justified.
    ///
    /// Idempotent: calling this again with the same already-finalized epoch does not regress
    /// `finalized`.
    #[instrument(level = "debug", skip(self))]
    pub fn process_epoch(
        &mut self,
        current_epoch: Epoch,
        previous_epoch_root: Hash256,
        current_epoch_root: Hash256,
        prev_weight: u64,
        curr_weight: u64,
        total_weight: u64,
    ) -> Result<FfgUpdate, FfgError> {
        if current_epoch.as_u64() <= 1 {
            return Err(FfgError::GenesisEpoch);
        }

        let previous_epoch = Epoch::new(current_epoch.as_u64() - 1);

        // Step 1: capture the "old" checkpoints before anything in this round mutates them.
        let old_pj = self.previous_justified;
        let old_cj = self.current_justified;

        // Step 2.
        self.previous_justified = self.current_justified;

        // Step 3: shift the 4-bit history up, dropping the oldest observation.
        self.bits.shift_up();

        // Step 4: does the previous epoch reach 2/3?
        if is_supermajority(prev_weight, total_weight) {
            self.current_justified = Checkpoint::new(previous_epoch, previous_epoch_root);
            self.bits.set(1, true);
        }

        // Step 5: does the current epoch reach 2/3? (runs after step 4 so it can win ties.)
        if is_supermajority(curr_weight, total_weight) {
            self.current_justified = Checkpoint::new(current_epoch, current_epoch_root);
            self.bits.set(0, true);
        }

        // Step 6: the four finalization conditions.
        let finalized = evaluate_finalization(self.bits, old_pj, old_cj, current_epoch);

        if let Some(checkpoint) = finalized {
            self.apply_finalization(checkpoint);
        }

        Ok(FfgUpdate {
            previous_justified: self.previous_justified,
            current_justified: self.current_justified,
            finalized,
        })
    }

    /// Finalize is idempotent and never regresses: finalizing an epoch at or below the current
    /// finalized epoch is a no-op.
    fn apply_finalization(&mut self, checkpoint: Checkpoint) {
        if checkpoint.epoch > self.finalized.epoch {
            self.finalized = checkpoint;
        }
        self.finalized_checkpoints.insert(checkpoint.epoch, checkpoint);
    }
}

fn is_supermajority(weight: u64, total: u64) -> bool {
    (weight as u128).saturating_mul(3) >= (total as u128).saturating_mul(2)
}

/// The four finalization conditions over the post-shift bit history and the checkpoints
/// captured before this epoch's justification updates. Each condition is independent; when more
/// than one fires, the last one evaluated wins, matching the reference four-condition procedure.
fn evaluate_finalization(
    bits: JustificationBits,
    old_pj: Checkpoint,
    old_cj: Checkpoint,
    current_epoch: Epoch,
) -> Option<Checkpoint> {
    let mut finalized = None;

    // Cond-4: three consecutive epochs justified, the oldest three epochs back.
    if bits.get(1) && bits.get(2) && bits.get(3) && old_pj.epoch.as_u64() + 3 == current_epoch.as_u64() {
        finalized = Some(old_pj);
    }
    // Cond-2: two consecutive epochs justified, the older one two epochs back.
    if bits.get(1) && bits.get(2) && old_pj.epoch.as_u64() + 2 == current_epoch.as_u64() {
        finalized = Some(old_pj);
    }
    // Cond-3: current epoch plus the two before it justified, the newer one two epochs back.
    if bits.get(0) && bits.get(1) && bits.get(2) && old_cj.epoch.as_u64() + 2 == current_epoch.as_u64() {
        finalized = Some(old_cj);
    }
    // Cond-1: current and previous epoch justified, the newer one one epoch back.
    if bits.get(0) && bits.get(1) && old_cj.epoch.as_u64() + 1 == current_epoch.as_u64() {
        finalized = Some(old_cj);
    }

    finalized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(byte: u8) -> Hash256 {
        Hash256::repeat_byte(byte)
    }

    fn bits_of(b0: bool, b1: bool, b2: bool, b3: bool) -> JustificationBits {
        let mut bits = JustificationBits::new();
        bits.set(0, b0);
        bits.set(1, b1);
        bits.set(2, b2);
        bits.set(3, b3);
        bits
    }

    #[test]
    fn cond4_finalizes_old_previous_justified_three_epochs_back() {
        let old_pj = Checkpoint::new(Epoch::new(5), root(5));
        let old_cj = Checkpoint::new(Epoch::new(0), root(0));
        let bits = bits_of(false, true, true, true);
        assert_eq!(
            evaluate_finalization(bits, old_pj, old_cj, Epoch::new(8)),
            Some(old_pj)
        );
    }

    #[test]
    fn cond2_finalizes_old_previous_justified_two_epochs_back() {
        let old_pj = Checkpoint::new(Epoch::new(5), root(5));
        let old_cj = Checkpoint::new(Epoch::new(0), root(0));
        // b3 is unset: only two consecutive justifications have accumulated, not three.
        let bits = bits_of(false, true, true, false);
        assert_eq!(
            evaluate_finalization(bits, old_pj, old_cj, Epoch::new(7)),
            Some(old_pj)
        );
    }

    #[test]
    fn cond3_finalizes_old_current_justified_two_epochs_back() {
        let old_pj = Checkpoint::new(Epoch::new(0), root(0));
        let old_cj = Checkpoint::new(Epoch::new(10), root(10));
        let bits = bits_of(true, true, true, false);
        assert_eq!(
            evaluate_finalization(bits, old_pj, old_cj, Epoch::new(12)),
            Some(old_cj)
        );
    }

    #[test]
    fn cond1_finalizes_old_current_justified_one_epoch_back() {
        let old_pj = Checkpoint::new(Epoch::new(0), root(0));
        let old_cj = Checkpoint::new(Epoch::new(10), root(10));
        // b2 is unset, so Cond-3 does not also fire here.
        let bits = bits_of(true, true, false, false);
        assert_eq!(
            evaluate_finalization(bits, old_pj, old_cj, Epoch::new(11)),
            Some(old_cj)
        );
    }

    #[test]
    fn no_condition_fires_on_an_empty_history() {
        let old_pj = Checkpoint::new(Epoch::new(3), root(3));
        let old_cj = Checkpoint::new(Epoch::new(4), root(4));
        let bits = bits_of(false, false, false, false);
        assert_eq!(evaluate_finalization(bits, old_pj, old_cj, Epoch::new(20)), None);
    }

    /// Three consecutive epochs each justify only as "previous" (the current epoch's own target
    /// never separately reaches 2/3); after the third round Cond-4 finalizes the oldest of them.
    #[test]
    fn three_consecutive_previous_justifications_finalize_via_cond4() {
        let mut tracker = FfgTracker::new(Checkpoint::genesis(root(0)));

        tracker
            .process_epoch(Epoch::new(2), root(1), root(2), 100, 0, 100)
            .unwrap();
        tracker
            .process_epoch(Epoch::new(3), root(2), root(3), 100, 0, 100)
            .unwrap();
        let update = tracker
            .process_epoch(Epoch::new(4), root(3), root(4), 100, 0, 100)
            .unwrap();

        assert_eq!(update.finalized, Some(Checkpoint::new(Epoch::new(1), root(1))));
        assert_eq!(tracker.finalized().epoch, Epoch::new(1));
    }

    #[test]
    fn process_epoch_rejects_genesis_epochs() {
        let mut tracker = FfgTracker::new(Checkpoint::genesis(root(0)));
        assert_eq!(
            tracker.process_epoch(Epoch::new(1), root(0), root(1), 0, 0, 100),
            Err(FfgError::GenesisEpoch)
        );
    }

    #[test]
    fn finalized_checkpoint_never_regresses() {
        let mut tracker = FfgTracker::new(Checkpoint::genesis(root(0)));
        tracker
            .process_epoch(Epoch::new(2), root(1), root(2), 100, 0, 100)
            .unwrap();
        tracker
            .process_epoch(Epoch::new(3), root(2), root(3), 100, 0, 100)
            .unwrap();
        tracker
            .process_epoch(Epoch::new(4), root(3), root(4), 100, 0, 100)
            .unwrap();
        let finalized_after_epoch_4 = tracker.finalized();
        assert_eq!(finalized_after_epoch_4.epoch, Epoch::new(1));

        // Epoch 5 with no further supermajorities must leave `finalized` untouched.
        let update = tracker
            .process_epoch(Epoch::new(5), root(4), root(5), 0, 0, 100)
            .unwrap();
        assert_eq!(update.finalized, None);
        assert_eq!(tracker.finalized(), finalized_after_epoch_4);
    }

    #[test]
    fn no_finalization_without_supermajority() {
        let mut tracker = FfgTracker::new(Checkpoint::genesis(root(0)));
        let update = tracker
            .process_epoch(Epoch::new(2), root(1), root(2), 0, 0, 100)
            .unwrap();
        assert_eq!(update.finalized, None);
        assert_eq!(tracker.finalized().epoch, Epoch::new(0));
    }
}
