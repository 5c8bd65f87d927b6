use crate::{Epoch, PublicKeyBytes, FAR_FUTURE_EPOCH};
use serde::{Deserialize, Serialize};

/// A validator's registry entry.
///
/// The actual balance lives in `BeaconState::balances`, parallel to `BeaconState::validators`:
/// `effective_balance` is a slow-moving, rounded view used by consensus-weight calculations,
/// while the actual balance fluctuates block to block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    pub pubkey: PublicKeyBytes,
    pub effective_balance: u64,
    pub activation_epoch: Epoch,
    pub exit_epoch: Epoch,
    pub withdrawable_epoch: Epoch,
    pub slashed: bool,
}

impl Validator {
    pub fn new(pubkey: PublicKeyBytes, effective_balance: u64) -> Self {
        Self {
            pubkey,
            effective_balance,
            activation_epoch: FAR_FUTURE_EPOCH,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            slashed: false,
        }
    }

    /// A validator is active at `epoch` iff `activation_epoch <= epoch < exit_epoch`.
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.activation_epoch <= epoch && epoch < self.exit_epoch
    }

    pub fn is_exited_at(&self, epoch: Epoch) -> bool {
        self.exit_epoch <= epoch
    }
}
