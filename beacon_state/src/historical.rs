use std::collections::{HashMap, VecDeque};
use types::Hash256;

/// The default bound applied when a caller configures a capacity of zero.
pub const DEFAULT_HISTORICAL_ROOTS_LIMIT: usize = 16_777_216;

/// Insertion-ordered, bounded map from block root to state root.
///
/// Updating an existing key does not change its position in the eviction order and does not
/// evict anything; only a genuinely new key can trigger the oldest entry's eviction once the
/// map is full.
#[derive(Debug, Clone)]
pub struct HistoricalStateCache {
    capacity: usize,
    map: HashMap<Hash256, Hash256>,
    order: VecDeque<Hash256>,
}

impl HistoricalStateCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_HISTORICAL_ROOTS_LIMIT
        } else {
            capacity
        };
        Self {
            capacity,
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn put(&mut self, block_root: Hash256, state_root: Hash256) {
        if self.map.insert(block_root, state_root).is_some() {
            // Update in place: key already existed, insertion order is unchanged.
            return;
        }

        self.order.push_back(block_root);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.map.remove(&oldest);
            }
        }
    }

    pub fn get(&self, block_root: Hash256) -> Option<Hash256> {
        self.map.get(&block_root).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
