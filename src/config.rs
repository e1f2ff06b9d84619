//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::cache::MAX_TTL;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub capacity: usize,
    /// Lifetime of every entry, in seconds
    pub ttl_secs: u64,
    /// HTTP server port
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` - Maximum cache entries (default: 1000)
    /// - `CACHE_TTL` - Entry lifetime in seconds (default: 300)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    ///
    /// Unparsable values, a zero capacity or TTL, and a TTL above [`MAX_TTL`]
    /// fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: positive_var("CACHE_CAPACITY", defaults.capacity),
            ttl_secs: ttl_var("CACHE_TTL", defaults.ttl_secs),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
        }
    }

    /// Entry lifetime as a Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl_secs: 300,
            server_port: 3000,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}, using default", name, raw);
            None
        }
    }
}

fn positive_var<T>(name: &str, default: T) -> T
where
    T: FromStr + PartialEq + Default,
{
    match parse_var::<T>(name) {
        Some(value) if value != T::default() => value,
        Some(_) => {
            warn!("{} must be greater than zero, using default", name);
            default
        }
        None => default,
    }
}

fn ttl_var(name: &str, default: u64) -> u64 {
    let secs = positive_var(name, default);
    if secs > MAX_TTL.as_secs() {
        warn!(
            "{} must be at most {} seconds, using default",
            name,
            MAX_TTL.as_secs()
        );
        return default;
    }
    secs
}
