//! Cache Module
//!
//! Provides a concurrent in-memory cache with per-entry TTL expiration and
//! LRU eviction under a fixed capacity.

mod bounded;
mod clock;
mod entry;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use bounded::BoundedTtlCache;
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use entry::MAX_TTL;
pub use stats::CacheStats;

pub(crate) use entry::{CacheEntry, Deadline, ExpiryHandle, Generation};
pub(crate) use lru::{AccessStamp, LruTracker};
pub(crate) use store::{CacheStore, InsertOutcome};
