use crate::{Epoch, Hash256};
use serde::{Deserialize, Serialize};

/// Names a finality boundary: the epoch and the block root considered canonical at that epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checkpoint {
    pub epoch: Epoch,
    pub root: Hash256,
}

impl Checkpoint {
    pub const fn new(epoch: Epoch, root: Hash256) -> Self {
        Self { epoch, root }
    }

    pub fn genesis(genesis_root: Hash256) -> Self {
        Self::new(Epoch::new(0), genesis_root)
    }
}
