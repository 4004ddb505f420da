//! Power Policy Module
//!
//! Aggregates battery, network and lifecycle telemetry into a single
//! operating mode plus derived scheduling hints, and owns the
//! deferred-operation queue drained on return to the foreground.
//!
//! Telemetry sources call the `update_*`/`set_lifecycle` methods; UI
//! callers read the derived getters and predicates. The mode is recomputed
//! on every telemetry change.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::power::{BatteryState, Lifecycle, NetworkState, PowerMode, PowerSettings};

// == Public Constants ==
/// Priority assigned to deferred operations submitted without one
pub const DEFAULT_DEFERRED_PRIORITY: i32 = 5;

// == Deferred Operation ==
/// Unit of work postponed until the app returns to the foreground.
pub type DeferredFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send + Sync>;

struct DeferredOperation {
    op: DeferredFn,
    priority: i32,
    /// Submission order, tie-breaker for equal priorities
    seq: u64,
}

// == Policy State ==
#[derive(Default)]
struct PolicyState {
    battery: BatteryState,
    network: NetworkState,
    lifecycle: Lifecycle,
    mode: PowerMode,
    settings: PowerSettings,
    deferred: Vec<DeferredOperation>,
    next_seq: u64,
    /// Single-flight guard for the foreground drain
    draining: bool,
}

impl PolicyState {
    /// Recomputes mode and settings from the latest telemetry.
    fn recompute(&mut self) {
        let mode = PowerMode::derive(&self.battery, &self.network, self.lifecycle);
        if mode != self.mode {
            debug!(?mode, "power mode changed");
        }
        self.mode = mode;
        self.settings = PowerSettings::for_mode(mode);
    }
}

// == Power Policy ==
/// Shared handle to the power policy; clone freely across consumers.
#[derive(Clone)]
pub struct PowerPolicy {
    state: Arc<RwLock<PolicyState>>,
}

impl PowerPolicy {
    // == Constructor ==
    /// Creates a policy with default telemetry (foregrounded, connected,
    /// battery unknown), which derives the Normal mode.
    pub fn new() -> Self {
        let mut state = PolicyState::default();
        state.recompute();
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    // == Telemetry Updates ==
    /// Feeds a battery telemetry update and recomputes the mode.
    pub async fn update_battery(&self, battery: BatteryState) {
        let mut state = self.state.write().await;
        state.battery = battery;
        state.recompute();
    }

    /// Feeds a network telemetry update and recomputes the mode.
    pub async fn update_network(&self, network: NetworkState) {
        let mut state = self.state.write().await;
        state.network = network;
        state.recompute();
    }

    /// Feeds a lifecycle transition and recomputes the mode. A
    /// background-to-foreground transition drains the deferred queue.
    pub async fn set_lifecycle(&self, lifecycle: Lifecycle) {
        let entered_foreground = {
            let mut state = self.state.write().await;
            let previous = state.lifecycle;
            state.lifecycle = lifecycle;
            state.recompute();
            previous == Lifecycle::Background && lifecycle == Lifecycle::Foreground
        };

        if entered_foreground {
            self.drain_deferred().await;
        }
    }

    // == Getters ==
    /// Current operating mode.
    pub async fn mode(&self) -> PowerMode {
        self.state.read().await.mode
    }

    /// Current derived settings.
    pub async fn settings(&self) -> PowerSettings {
        self.state.read().await.settings
    }

    /// Latest battery telemetry.
    pub async fn battery(&self) -> BatteryState {
        self.state.read().await.battery
    }

    /// Latest network telemetry.
    pub async fn network(&self) -> NetworkState {
        self.state.read().await.network
    }

    /// Current lifecycle state.
    pub async fn lifecycle(&self) -> Lifecycle {
        self.state.read().await.lifecycle
    }

    // == Derived Predicates ==
    /// Whether background sync should run now: requires sync not disabled
    /// by the mode, a connected network, and (outside Normal mode) a
    /// non-metered connection.
    pub async fn should_perform_background_sync(&self) -> bool {
        let state = self.state.read().await;
        if state.settings.background_sync_disabled {
            return false;
        }
        if !state.network.is_connected {
            return false;
        }
        if state.network.is_expensive && state.mode != PowerMode::Normal {
            return false;
        }
        true
    }

    /// Whether full-resolution images should be requested.
    pub async fn should_fetch_high_res_images(&self) -> bool {
        let state = self.state.read().await;
        if state.mode == PowerMode::PowerSave {
            return false;
        }
        if state.network.is_cellular() && state.network.is_expensive {
            return false;
        }
        true
    }

    /// Whether periodic auto-refresh should run: Normal mode in the
    /// foreground only.
    pub async fn should_enable_auto_refresh(&self) -> bool {
        let state = self.state.read().await;
        state.mode == PowerMode::Normal && state.lifecycle.is_foreground()
    }

    /// Polling interval scaled by the mode's multiplier.
    pub async fn polling_interval(&self, base: Duration) -> Duration {
        let multiplier = self.state.read().await.settings.polling_interval_multiplier;
        base * multiplier
    }

    /// Location update interval, tripled when updates are reduced.
    pub async fn location_update_interval(&self, base: Duration) -> Duration {
        if self.state.read().await.settings.location_updates_reduced {
            base * 3
        } else {
            base
        }
    }

    /// Quality factor to apply to image requests.
    pub async fn image_quality_factor(&self) -> f32 {
        self.state.read().await.settings.image_quality_factor
    }

    // == Deferred Operations ==
    /// Submits an operation with the default priority.
    pub async fn submit(&self, op: impl FnOnce() -> anyhow::Result<()> + Send + Sync + 'static) {
        self.submit_with_priority(op, DEFAULT_DEFERRED_PRIORITY).await;
    }

    /// Submits an operation. While deferral is active and the app is
    /// backgrounded the operation is queued; otherwise it runs immediately.
    /// Failures are logged and do not propagate.
    pub async fn submit_with_priority(
        &self,
        op: impl FnOnce() -> anyhow::Result<()> + Send + Sync + 'static,
        priority: i32,
    ) {
        {
            let mut state = self.state.write().await;
            if state.settings.deferred_operations && state.lifecycle == Lifecycle::Background {
                let seq = state.next_seq;
                state.next_seq += 1;
                state.deferred.push(DeferredOperation {
                    op: Box::new(op),
                    priority,
                    seq,
                });
                debug!(priority, seq, "operation deferred until foreground");
                return;
            }
        }

        if let Err(error) = op() {
            warn!(%error, "immediate operation failed");
        }
    }

    /// Number of operations currently queued.
    pub async fn deferred_len(&self) -> usize {
        self.state.read().await.deferred.len()
    }

    /// Drains the deferred queue once: highest priority first, submission
    /// order for ties, each operation on its own scheduler turn. A failing
    /// operation is logged and skipped without aborting the batch.
    async fn drain_deferred(&self) {
        let batch = {
            let mut state = self.state.write().await;
            if state.draining || state.deferred.is_empty() {
                return;
            }
            state.draining = true;
            let mut batch = std::mem::take(&mut state.deferred);
            batch.sort_by_key(|op| (Reverse(op.priority), op.seq));
            batch
        };

        info!(count = batch.len(), "draining deferred operations");

        for operation in batch {
            // Next scheduler turn, the event-loop equivalent of "next paint"
            tokio::task::yield_now().await;
            if let Err(error) = (operation.op)() {
                warn!(
                    %error,
                    priority = operation.priority,
                    "deferred operation failed; continuing"
                );
            }
        }

        self.state.write().await.draining = false;
    }
}

impl Default for PowerPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PowerPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PowerPolicy").finish()
    }
}
