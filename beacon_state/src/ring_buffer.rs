use types::{Hash256, Slot};

/// Fixed-capacity ring buffer mapping recent slots to block roots, indexed by `slot mod N`.
///
/// A stale entry (one written for a different slot that happens to share the same bucket) is
/// never returned: `get` compares the stored slot key before handing back the root.
#[derive(Debug, Clone)]
pub struct RecentStateCache {
    capacity: usize,
    slots: Vec<Option<Slot>>,
    roots: Vec<Hash256>,
}

/// Used whenever a caller configures a capacity of zero.
pub const DEFAULT_RECENT_STATE_CAPACITY: usize = 256;

impl RecentStateCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_RECENT_STATE_CAPACITY
        } else {
            capacity
        };
        Self {
            capacity,
            slots: vec![None; capacity],
            roots: vec![Hash256::ZERO; capacity],
        }
    }

    fn index(&self, slot: Slot) -> usize {
        (slot.as_u64() as usize) % self.capacity
    }

    pub fn put(&mut self, slot: Slot, root: Hash256) {
        let idx = self.index(slot);
        self.slots[idx] = Some(slot);
        self.roots[idx] = root;
    }

    pub fn get(&self, slot: Slot) -> Option<Hash256> {
        let idx = self.index(slot);
        if self.slots[idx] == Some(slot) {
            Some(self.roots[idx])
        } else {
            None
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
