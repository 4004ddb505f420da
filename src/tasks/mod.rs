//! Background Tasks Module
//!
//! Long-running tokio tasks supporting the cache and power policy.

mod cleanup;
mod poller;

pub use cleanup::spawn_cleanup_task;
pub use poller::spawn_power_aware_poller;
