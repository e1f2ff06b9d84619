//! TTL LRU Cache - A bounded in-memory cache with self-expiring entries
//!
//! Entries expire a fixed TTL after they were written; when the cache is full,
//! the least recently accessed entry makes room for a new key. An optional
//! HTTP front-end exposes the cache as a small server.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;

pub use api::AppState;
pub use cache::BoundedTtlCache;
pub use config::Config;
pub use error::{CacheError, Result};
