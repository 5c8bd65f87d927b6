use std::collections::HashMap;

use parking_lot::RwLock;
use rand::Rng;
use tracing::{debug, instrument};
use types::{Hash256, Keccak256Hasher};

use crate::shamir::{split_key, KpsError, Share};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerError {
    GroupNotFound,
    Split(KpsError),
}

impl std::fmt::Display for ManagerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl std::error::Error for ManagerError {}

impl From<KpsError> for ManagerError {
    fn from(e: KpsError) -> Self {
        ManagerError::Split(e)
    }
}

struct GroupEntry {
    shares: Vec<Share>,
    threshold: usize,
    total_shares: usize,
    key_size: usize,
}

/// Registry of Shamir-split key groups, each identified by its `group_id`
/// (`Keccak256(secret)`). Owns the live shares for every registered group and supports
/// re-splitting a group under a fresh secret via `rotate_keys`.
pub struct KeyPairManager {
    groups: RwLock<HashMap<Hash256, GroupEntry>>,
}

impl Default for KeyPairManager {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyPairManager {
    pub fn new() -> Self {
        Self {
            groups: RwLock::new(HashMap::new()),
        }
    }

    /// Splits `secret` and registers the resulting shares under `Keccak256(secret)`.
    #[instrument(level = "debug", skip(self, secret, hasher))]
    pub fn register_group(
        &self,
        secret: &[u8],
        threshold: usize,
        total_shares: usize,
        hasher: &dyn Keccak256Hasher,
    ) -> Result<Hash256, ManagerError> {
        let shares = split_key(secret, threshold, total_shares, hasher)?;
        let group_id = shares[0].group_id;
        let entry = GroupEntry {
            shares,
            threshold,
            total_shares,
            key_size: secret.len(),
        };
        self.groups.write().insert(group_id, entry);
        debug!(?group_id, threshold, total_shares, "registered key share group");
        Ok(group_id)
    }

    /// Returns a clone of every share currently held for `group_id`.
    pub fn shares_for_group(&self, group_id: &Hash256) -> Option<Vec<Share>> {
        self.groups.read().get(group_id).map(|entry| entry.shares.clone())
    }

    pub fn contains_group(&self, group_id: &Hash256) -> bool {
        self.groups.read().contains_key(group_id)
    }

    /// Re-splits `group_id` under a fresh random secret of the same size and threshold/total
    /// shape, discarding the previous shares. Returns the new group id, since the group id is
    /// derived from the secret itself.
    #[instrument(level = "debug", skip(self, hasher))]
    pub fn rotate_keys(
        &self,
        group_id: Hash256,
        hasher: &dyn Keccak256Hasher,
    ) -> Result<Hash256, ManagerError> {
        let (threshold, total_shares, key_size) = {
            let groups = self.groups.read();
            let entry = groups.get(&group_id).ok_or(ManagerError::GroupNotFound)?;
            (entry.threshold, entry.total_shares, entry.key_size)
        };

        let mut rng = rand::rng();
        let fresh_secret: Vec<u8> = (0..key_size).map(|_| rng.random::<u8>()).collect();
        let shares = split_key(&fresh_secret, threshold, total_shares, hasher)?;
        let new_group_id = shares[0].group_id;

        let mut groups = self.groups.write();
        groups.remove(&group_id);
        groups.insert(
            new_group_id,
            GroupEntry {
                shares,
                threshold,
                total_shares,
                key_size,
            },
        );
        debug!(old = ?group_id, new = ?new_group_id, "rotated key share group");
        Ok(new_group_id)
    }
}
