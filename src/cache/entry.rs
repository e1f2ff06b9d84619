//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and the handle to their
//! scheduled expiry.

use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::cache::AccessStamp;

/// Longest lifetime an entry can be given. Keeps every deadline well inside
/// the range of the runtime's monotonic clock.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Version tag distinguishing an entry from a predecessor under the same key.
pub type Generation = u64;

/// Position of an entry in deadline order. The generation keeps two entries
/// created at the same instant distinct.
pub type Deadline = (Instant, Generation);

// == Expiry Handle ==
/// Owned handle to an entry's scheduled removal.
///
/// Dropping the handle cancels the task. If the task has already started
/// running, the abort is a no-op.
#[derive(Debug)]
pub struct ExpiryHandle {
    task: AbortHandle,
}

impl ExpiryHandle {
    // == Constructor ==
    /// Takes ownership of the removal task behind `task`.
    pub fn new(task: AbortHandle) -> Self {
        Self { task }
    }
}

impl Drop for ExpiryHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Unique per insertion
    pub generation: Generation,
    /// Last insert or successful read
    pub last_access: AccessStamp,
    /// Deadline after which the entry is no longer visible
    pub expires_at: Instant,
    /// Pending removal task, if one was armed
    expiry: Option<ExpiryHandle>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl` from now.
    ///
    /// A `ttl` above [`MAX_TTL`] is shortened to it.
    ///
    /// # Arguments
    /// * `value` - The value to store
    /// * `generation` - Version tag for this insertion
    /// * `stamp` - Access stamp recorded for the insertion
    /// * `ttl` - Lifetime of the entry
    pub fn new(value: V, generation: Generation, stamp: AccessStamp, ttl: Duration) -> Self {
        Self {
            value,
            generation,
            last_access: stamp,
            expires_at: Instant::now() + ttl.min(MAX_TTL),
            expiry: None,
        }
    }

    /// Attaches the task that will remove this entry, cancelling any
    /// previously attached one.
    pub fn set_expiry(&mut self, handle: ExpiryHandle) {
        self.expiry = Some(handle);
    }

    /// Key of this entry in the store's deadline index.
    pub fn deadline(&self) -> Deadline {
        (self.expires_at, self.generation)
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its deadline, even if
    /// its removal task has not run yet.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn stamp() -> AccessStamp {
        AccessStamp::new(DateTime::<Utc>::UNIX_EPOCH, 0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_creation() {
        let ttl = Duration::from_secs(60);
        let entry = CacheEntry::new("test_value".to_string(), 1, stamp(), ttl);

        assert_eq!(entry.value, "test_value");
        assert_eq!(entry.generation, 1);
        assert_eq!(entry.last_access, stamp());
        assert_eq!(entry.deadline(), (Instant::now() + ttl, 1));
        assert!(entry.expiry.is_none());
        assert!(!entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new("test_value", 1, stamp(), Duration::from_secs(1));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_ttl_is_capped() {
        let entry = CacheEntry::new("test_value", 1, stamp(), Duration::MAX);

        assert_eq!(entry.expires_at, Instant::now() + MAX_TTL);
        assert!(!entry.is_expired());
    }

    #[tokio::test]
    async fn test_dropping_entry_cancels_expiry() {
        let task = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let mut entry = CacheEntry::new("v", 1, stamp(), Duration::from_secs(3600));
        entry.set_expiry(ExpiryHandle::new(task.abort_handle()));
        assert!(entry.expiry.is_some());

        drop(entry);

        let result = task.await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
