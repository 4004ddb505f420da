//! Power-Aware Poller Task
//!
//! Periodic callback paced by the power policy: each tick sleeps the
//! policy-scaled interval, and the callback only runs while auto-refresh
//! is enabled (Normal mode, foregrounded). This is the composition point
//! between the polling machinery and the power policy; it adds no logic of
//! its own.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::power::PowerPolicy;

/// Spawns a polling task whose cadence follows the power policy.
///
/// The base interval is re-scaled on every tick, so a mode change takes
/// effect from the next sleep onward.
///
/// # Arguments
/// * `policy` - Policy handle consulted for interval scaling and gating
/// * `base_interval` - Polling interval under Normal mode
/// * `callback` - Invoked on each non-gated tick
///
/// # Returns
/// A JoinHandle for the spawned task; abort it to stop polling.
pub fn spawn_power_aware_poller<F>(
    policy: PowerPolicy,
    base_interval: Duration,
    mut callback: F,
) -> JoinHandle<()>
where
    F: FnMut() -> BoxFuture<'static, ()> + Send + 'static,
{
    tokio::spawn(async move {
        info!(?base_interval, "starting power-aware poller");

        loop {
            let interval = policy.polling_interval(base_interval).await;
            tokio::time::sleep(interval).await;

            if policy.should_enable_auto_refresh().await {
                callback().await;
            } else {
                debug!("auto-refresh gated off; skipping poll tick");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::power::{BatteryState, Lifecycle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_poller_invokes_callback_in_normal_mode() {
        let policy = PowerPolicy::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        let counter = ticks.clone();
        let handle = spawn_power_aware_poller(policy, Duration::from_millis(50), move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        tokio::time::sleep(Duration::from_millis(180)).await;
        handle.abort();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_poller_skips_ticks_when_gated() {
        let policy = PowerPolicy::new();
        policy.set_lifecycle(Lifecycle::Background).await;

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let handle =
            spawn_power_aware_poller(policy.clone(), Duration::from_millis(50), move || {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            });

        tokio::time::sleep(Duration::from_millis(180)).await;
        handle.abort();

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_poller_interval_stretches_in_powersave() {
        let policy = PowerPolicy::new();
        policy
            .update_battery(BatteryState::new(0.05, false, false))
            .await;

        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let handle =
            spawn_power_aware_poller(policy.clone(), Duration::from_millis(50), move || {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            });

        // 4x multiplier: the first tick lands at ~200ms, and PowerSave also
        // gates auto-refresh off, so nothing fires
        tokio::time::sleep(Duration::from_millis(180)).await;
        handle.abort();

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
