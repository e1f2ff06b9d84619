//! Cache Store Module
//!
//! Unsynchronized cache state: HashMap storage combined with LRU tracking,
//! TTL deadlines and statistics. [`BoundedTtlCache`](crate::cache::BoundedTtlCache)
//! owns one of these behind a lock.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use tokio::time::Instant;

use crate::cache::{
    AccessStamp, CacheEntry, CacheStats, Deadline, ExpiryHandle, Generation, LruTracker,
    Timestamp,
};

// == Insert Outcome ==
/// What happened to the store as a side effect of an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome<K> {
    /// Key was absent and there was room
    Inserted,
    /// Key was present; the previous entry was dropped
    Replaced,
    /// Key was absent and the store was full of live entries; the contained
    /// key was evicted
    Evicted(K),
}

// == Cache Store ==
/// Cache storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
    /// Keys by deadline, earliest first
    deadlines: BTreeMap<Deadline, K>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    capacity: usize,
    /// Last generation handed out
    generation: Generation,
    /// Next access sequence number
    seq: u64,
}

impl<K, V> CacheStore<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates a new CacheStore holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            lru: LruTracker::new(),
            deadlines: BTreeMap::new(),
            stats: CacheStats::new(),
            capacity,
            generation: 0,
            seq: 0,
        }
    }

    // == Capacity ==
    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a generation never handed out before by this store.
    pub fn next_generation(&mut self) -> Generation {
        self.generation += 1;
        self.generation
    }

    /// Returns an access stamp for `at` that orders after every earlier stamp
    /// with the same clock reading.
    pub fn stamp(&mut self, at: Timestamp) -> AccessStamp {
        let stamp = AccessStamp::new(at, self.seq);
        self.seq += 1;
        stamp
    }

    // == Insert ==
    /// Stores an entry under `key`.
    ///
    /// If the key already exists, the old entry is dropped (cancelling its
    /// expiry) and the capacity is not checked. Otherwise, if the store is
    /// still at capacity once expired entries are purged, the least recently
    /// used entry is evicted first.
    pub fn insert(&mut self, key: K, entry: CacheEntry<V>) -> InsertOutcome<K> {
        let outcome = if self.remove_entry(&key).is_some() {
            InsertOutcome::Replaced
        } else if self.entries.len() >= self.capacity && self.purge_expired() == 0 {
            match self.evict_oldest() {
                Some(evicted) => InsertOutcome::Evicted(evicted),
                None => InsertOutcome::Inserted,
            }
        } else {
            InsertOutcome::Inserted
        };

        self.lru.insert(entry.last_access, key.clone());
        self.deadlines.insert(entry.deadline(), key.clone());
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
        debug_assert_eq!(self.lru.len(), self.entries.len());

        outcome
    }

    // == Arm Expiry ==
    /// Attaches `handle` to the entry for `key` if it is still `generation`.
    ///
    /// If the entry is gone or was replaced, the handle is dropped, which
    /// cancels its task. Returns whether the handle was attached.
    pub fn arm_expiry<Q>(
        &mut self,
        key: &Q,
        generation: Generation,
        handle: ExpiryHandle,
    ) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.get_mut(key) {
            Some(entry) if entry.generation == generation => {
                entry.set_expiry(handle);
                true
            }
            _ => false,
        }
    }

    // == Get ==
    /// Retrieves a value by key and records the access at `now`.
    ///
    /// An entry past its deadline is removed and counted as a miss.
    pub fn get<Q>(&mut self, key: &Q, now: Timestamp) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            return None;
        }

        let stamp = self.stamp(now);
        let entry = self.entries.get_mut(key)?;
        self.lru.touch(&entry.last_access, stamp);
        entry.last_access = stamp;
        self.stats.record_hit();

        Some(&entry.value)
    }

    /// Returns true if a live entry exists for `key`. Does not count as an
    /// access.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether anything was removed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).is_some()
    }

    // == Expire ==
    /// Removes the entry for `key` only if it is still `generation`.
    ///
    /// Called when a TTL timer fires. A timer belonging to a replaced or
    /// deleted entry finds a different generation (or nothing) and leaves the
    /// store untouched.
    pub fn expire<Q>(&mut self, key: &Q, generation: Generation) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.entries.get(key) {
            Some(entry) if entry.generation == generation => {}
            _ => return false,
        }

        self.remove_entry(key);
        self.stats.record_expiration();
        true
    }

    // == Purge Expired ==
    /// Removes every entry whose deadline has passed, even if its timer has
    /// not fired yet.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let mut purged = 0;

        while let Some(first) = self.deadlines.first_entry() {
            if first.key().0 > now {
                break;
            }
            let key = first.remove();
            if let Some(entry) = self.entries.remove(&key) {
                self.lru.remove(&entry.last_access);
            }
            self.stats.record_expiration();
            purged += 1;
        }

        if purged > 0 {
            self.stats.set_total_entries(self.entries.len());
        }
        purged
    }

    // == Clear ==
    /// Removes every entry, cancelling all pending expiries.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        self.deadlines.clear();
        self.stats.set_total_entries(0);
        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Length ==
    /// Returns the number of stored entries. Entries past their deadline
    /// count until [`purge_expired`](Self::purge_expired) runs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_oldest(&mut self) -> Option<K> {
        let key = self.lru.evict_oldest()?;
        if let Some(entry) = self.entries.remove(&key) {
            self.deadlines.remove(&entry.deadline());
        }
        self.stats.record_eviction();
        Some(key)
    }

    fn remove_entry<Q>(&mut self, key: &Q) -> Option<CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.entries.remove(key)?;
        self.lru.remove(&entry.last_access);
        self.deadlines.remove(&entry.deadline());
        self.stats.set_total_entries(self.entries.len());
        Some(entry)
    }
}
