//! Bounded TTL Cache Module
//!
//! Thread-safe front of the cache. Wraps a [`CacheStore`] in a single lock and
//! arms one Tokio timer per entry to remove it once its TTL elapses.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::{
    CacheEntry, CacheStats, CacheStore, Clock, ExpiryHandle, Generation, InsertOutcome,
    SystemClock, MAX_TTL,
};
use crate::error::{CacheError, Result};

// == Bounded TTL Cache ==
/// Concurrent key/value cache with a fixed TTL and a hard capacity.
///
/// Every operation takes the same per-instance lock, so the
/// check-evict-insert sequence of [`put`](Self::put) is atomic with respect
/// to every other caller and the entry count never exceeds the capacity.
///
/// Cloning is cheap and yields a handle to the same cache. Expiry timers only
/// hold a weak reference: once the last handle is dropped, every pending
/// timer is cancelled.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ttl_lru_cache::cache::BoundedTtlCache;
///
/// # tokio_test::block_on(async {
/// let cache = BoundedTtlCache::new(Duration::from_secs(60), 2).unwrap();
/// cache.put("a", 1);
/// cache.put("b", 2);
/// assert_eq!(cache.get("a"), Some(1));
///
/// // "b" is now the least recently accessed entry
/// cache.put("c", 3);
/// assert_eq!(cache.get("b"), None);
/// assert_eq!(cache.len(), 2);
/// # });
/// ```
pub struct BoundedTtlCache<K, V, C = SystemClock> {
    inner: Arc<Inner<K, V, C>>,
}

struct Inner<K, V, C> {
    store: Mutex<CacheStore<K, V>>,
    ttl: Duration,
    clock: C,
    runtime: Handle,
}

impl<K, V, C> Clone for BoundedTtlCache<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> BoundedTtlCache<K, V, SystemClock>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    // == Constructor ==
    /// Creates a cache on the current Tokio runtime using the system clock.
    ///
    /// # Errors
    /// - `InvalidConfig` if `capacity` or `ttl` is zero, or `ttl` exceeds
    ///   [`MAX_TTL`]
    /// - `NoRuntime` if called outside a Tokio runtime
    pub fn new(ttl: Duration, capacity: usize) -> Result<Self> {
        Self::with_clock(ttl, capacity, SystemClock)
    }
}

impl<K, V, C> BoundedTtlCache<K, V, C>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
    C: Clock,
{
    /// Creates a cache on the current Tokio runtime with a custom clock.
    pub fn with_clock(ttl: Duration, capacity: usize, clock: C) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        Self::with_runtime(ttl, capacity, clock, runtime)
    }

    /// Creates a cache whose expiry timers run on `runtime`.
    ///
    /// The cache can then be used from any thread, inside or outside that
    /// runtime.
    pub fn with_runtime(
        ttl: Duration,
        capacity: usize,
        clock: C,
        runtime: Handle,
    ) -> Result<Self> {
        if capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "capacity must be at least 1".to_string(),
            ));
        }
        if ttl.is_zero() {
            return Err(CacheError::InvalidConfig(
                "ttl must be greater than zero".to_string(),
            ));
        }
        if ttl > MAX_TTL {
            return Err(CacheError::InvalidConfig(format!(
                "ttl must be at most {} seconds",
                MAX_TTL.as_secs()
            )));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                store: Mutex::new(CacheStore::new(capacity)),
                ttl,
                clock,
                runtime,
            }),
        })
    }

    // == Put ==
    /// Stores `value` under `key`, resetting the TTL if the key exists.
    ///
    /// If the key is new and the cache is full, entries past their deadline
    /// are dropped first; only if none are does the least recently accessed
    /// entry get evicted.
    pub fn put(&self, key: K, value: V) {
        let mut store = self.inner.store.lock();

        let generation = store.next_generation();
        let stamp = store.stamp(self.inner.clock.now());
        let entry = CacheEntry::new(value, generation, stamp, self.inner.ttl);
        let deadline = entry.expires_at;

        match store.insert(key.clone(), entry) {
            InsertOutcome::Inserted => {}
            InsertOutcome::Replaced => {
                debug!(generation, "Replaced cache entry, previous expiry cancelled");
            }
            InsertOutcome::Evicted(_) => {
                debug!(
                    generation,
                    len = store.len(),
                    "Cache at capacity: evicted least recently used entry"
                );
            }
        }

        let handle = self.schedule_expiry(key.clone(), generation, deadline);
        store.arm_expiry(&key, generation, handle);
    }

    // == Get ==
    /// Returns a clone of the value for `key` if it is present and unexpired.
    ///
    /// A hit refreshes the entry's recency.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut store = self.inner.store.lock();
        let now = self.inner.clock.now();
        store.get(key, now).cloned()
    }

    /// Returns true if `key` is present and unexpired, without refreshing it.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.store.lock().contains(key)
    }

    // == Delete ==
    /// Removes `key` and cancels its expiry. No-op if absent.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.store.lock().remove(key);
    }

    // == Clear ==
    /// Removes every entry and cancels every pending expiry.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let removed = self.inner.store.lock().clear();
        info!(removed, "Cache cleared");
        removed
    }

    // == Shutdown ==
    /// Releases every entry and its expiry timer.
    ///
    /// The cache stays usable afterwards; this exists so a server can release
    /// timers deterministically before its runtime stops.
    pub fn shutdown(&self) {
        let released = self.inner.store.lock().clear();
        info!(released, "Cache shut down, pending expiries cancelled");
    }

    // == Length ==
    /// Returns the number of live entries. Never exceeds [`capacity`](Self::capacity).
    ///
    /// Entries past their deadline are dropped first, so the count agrees with
    /// [`get`](Self::get) even before their timers fire.
    pub fn len(&self) -> usize {
        let mut store = self.inner.store.lock();
        store.purge_expired();
        store.len()
    }

    /// Returns true if the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Capacity ==
    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.inner.store.lock().capacity()
    }

    // == TTL ==
    /// Returns the lifetime given to every entry.
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut store = self.inner.store.lock();
        store.purge_expired();
        store.stats()
    }

    fn schedule_expiry(
        &self,
        key: K,
        generation: Generation,
        deadline: Instant,
    ) -> ExpiryHandle {
        let cache: Weak<Inner<K, V, C>> = Arc::downgrade(&self.inner);

        let task = self.inner.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;

            if let Some(inner) = cache.upgrade() {
                inner.expire(&key, generation);
            }
        });

        ExpiryHandle::new(task.abort_handle())
    }
}

impl<K, V, C> Inner<K, V, C>
where
    K: Eq + Hash + Clone,
{
    /// Removal path for fired timers. Shares the lock with `delete`.
    fn expire(&self, key: &K, generation: Generation) {
        if self.store.lock().expire(key, generation) {
            debug!(generation, "Cache entry expired");
        }
    }
}

impl<K, V, C> fmt::Debug for BoundedTtlCache<K, V, C>
where
    K: Eq + Hash + Clone,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.inner.store.lock();
        f.debug_struct("BoundedTtlCache")
            .field("ttl", &self.inner.ttl)
            .field("capacity", &store.capacity())
            .field("len", &store.len())
            .finish()
    }
}
