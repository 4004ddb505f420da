//! rxcache - Power-aware client data cache
//!
//! Provides keyed caching with TTL expiration, FIFO eviction,
//! stale-while-revalidate refresh and an optional durable tier, plus a
//! power policy deriving an operating mode from battery/network/lifecycle
//! telemetry to pace polling and defer background work.

pub mod cache;
pub mod config;
pub mod error;
pub mod power;
pub mod storage;
pub mod tasks;

pub use cache::{CacheEntry, CacheNamespace, CacheState, CacheStats, CacheStore, QueryCache};
pub use config::Config;
pub use error::{CacheError, Result};
pub use power::{
    BatteryState, ConnectionType, Lifecycle, NetworkState, PowerMode, PowerPolicy, PowerSettings,
};
pub use storage::{clear_stored_cache, DurableStore, JsonFileStore, MemoryStore};
pub use tasks::{spawn_cleanup_task, spawn_power_aware_poller};
