use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Number of decompressed blocks a reader keeps around.
pub const CACHE_CAPACITY: usize = 32;

/// Fixed-capacity map from block ordinal to decompressed bytes.
///
/// Eviction is strictly by insertion order: a hit never refreshes an entry,
/// and inserting an ordinal that is already present is a no-op, so one
/// ordinal never occupies two slots.
#[derive(Debug)]
pub struct BlockCache {
    capacity: usize,
    blocks: HashMap<u64, Arc<Vec<u8>>>,
    order: VecDeque<u64>,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            blocks: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, ordinal: u64) -> Option<Arc<Vec<u8>>> {
        self.blocks.get(&ordinal).cloned()
    }

    pub fn contains(&self, ordinal: u64) -> bool {
        self.blocks.contains_key(&ordinal)
    }

    pub fn insert(&mut self, ordinal: u64, data: Arc<Vec<u8>>) {
        if self.capacity == 0 || self.blocks.contains_key(&ordinal) {
            return;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.blocks.remove(&oldest);
            }
        }
        self.order.push_back(ordinal);
        self.blocks.insert(ordinal, data);
    }

    /// Cached ordinals, oldest first.
    pub fn ordinals(&self) -> impl Iterator<Item = u64> + '_ {
        self.order.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new(CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(b: u8) -> Arc<Vec<u8>> {
        Arc::new(vec![b; 4])
    }

    #[test]
    fn evicts_oldest_insert_first() {
        let mut cache = BlockCache::new(3);
        for i in 0..3 {
            cache.insert(i, block(i as u8));
        }
        // A hit must not refresh block 0.
        assert!(cache.get(0).is_some());
        cache.insert(3, block(3));

        assert!(!cache.contains(0));
        assert_eq!(cache.ordinals().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn duplicate_insert_is_ignored() {
        let mut cache = BlockCache::new(2);
        assert!(cache.is_empty());
        cache.insert(7, block(1));
        cache.insert(7, block(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(7).unwrap()[0], 1);
    }
}
