//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::time::Duration;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Time-to-live applied to entries written through this configuration
    pub ttl: Duration,
    /// Maximum number of entries the shared namespace can hold
    pub max_entries: usize,
    /// Whether entries are mirrored into the durable tier
    pub persist: bool,
    /// Whether expired entries are served while a refresh runs in the background
    pub stale_while_revalidate: bool,
    /// Background cleanup task interval
    pub cleanup_interval: Duration,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `RXCACHE_TTL_SECS` - Entry TTL in seconds (default: 300)
    /// - `RXCACHE_MAX_ENTRIES` - Maximum namespace entries (default: 100)
    /// - `RXCACHE_PERSIST` - Mirror entries to durable storage (default: false)
    /// - `RXCACHE_STALE_WHILE_REVALIDATE` - Serve stale while refreshing (default: true)
    /// - `RXCACHE_CLEANUP_INTERVAL_SECS` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        Self {
            ttl: Duration::from_secs(
                env::var("RXCACHE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(300),
            ),
            max_entries: env::var("RXCACHE_MAX_ENTRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            persist: env::var("RXCACHE_PERSIST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            stale_while_revalidate: env::var("RXCACHE_STALE_WHILE_REVALIDATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
            cleanup_interval: Duration::from_secs(
                env::var("RXCACHE_CLEANUP_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }

    /// Returns a copy with a different TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns a copy with persistence enabled or disabled.
    pub fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    /// Returns a copy with stale-while-revalidate enabled or disabled.
    pub fn with_stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 100,
            persist: false,
            stale_while_revalidate: true,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}
