//! Power Module
//!
//! Derives a discrete operating mode from device and network telemetry and
//! exposes scheduling hints used to scale down background work.

mod mode;
mod policy;
mod telemetry;

// Re-export public types
pub use mode::{PowerMode, PowerSettings, CRITICAL_BATTERY_LEVEL, LOW_BATTERY_LEVEL};
pub use policy::{DeferredFn, PowerPolicy, DEFAULT_DEFERRED_PRIORITY};
pub use telemetry::{BatteryState, ConnectionType, Lifecycle, NetworkState};
