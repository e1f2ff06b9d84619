//! LRU Tracker Module
//!
//! Orders live keys by their last access so the least recently used one can be
//! found without scanning the whole store.

use std::collections::BTreeMap;

use crate::cache::Timestamp;

// == Access Stamp ==
/// Position of an entry in access order.
///
/// Ordered by clock reading first, then by a per-store sequence number so two
/// accesses that read the same clock value still have a strict order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccessStamp {
    /// Clock reading at the time of access
    pub at: Timestamp,
    /// Tie-breaker, strictly increasing per store
    pub seq: u64,
}

impl AccessStamp {
    // == Constructor ==
    /// Creates a stamp for an access at `at` with sequence number `seq`.
    pub fn new(at: Timestamp, seq: u64) -> Self {
        Self { at, seq }
    }
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys live in a BTreeMap keyed by their [`AccessStamp`]:
/// - First = Least recently used
/// - Last = Most recently used
#[derive(Debug)]
pub struct LruTracker<K> {
    /// Keys by access stamp
    order: BTreeMap<AccessStamp, K>,
}

impl<K> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self {
            order: BTreeMap::new(),
        }
    }

    // == Insert ==
    /// Records `key` as accessed at `stamp`.
    ///
    /// Callers must remove any previous stamp for the same key first.
    pub fn insert(&mut self, stamp: AccessStamp, key: K) {
        self.order.insert(stamp, key);
    }

    // == Touch ==
    /// Moves the key recorded at `old` to `new`.
    ///
    /// Returns false if nothing was recorded at `old`.
    pub fn touch(&mut self, old: &AccessStamp, new: AccessStamp) -> bool {
        match self.order.remove(old) {
            Some(key) => {
                self.order.insert(new, key);
                true
            }
            None => false,
        }
    }

    // == Remove ==
    /// Removes the key recorded at `stamp`.
    pub fn remove(&mut self, stamp: &AccessStamp) -> Option<K> {
        self.order.remove(stamp)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        self.order.pop_first().map(|(_, key)| key)
    }

    // == Clear ==
    /// Forgets every tracked key.
    pub fn clear(&mut self) {
        self.order.clear();
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }
}
