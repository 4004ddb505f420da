//! Power Mode Module
//!
//! Derives the discrete operating mode from the latest telemetry and maps
//! each mode to its scheduling settings. Derivation is a pure function of
//! its three inputs so it can be unit-tested without a runtime; there is no
//! hysteresis, a telemetry tick across a threshold flips the mode
//! immediately.

use serde::Serialize;

use crate::power::{BatteryState, Lifecycle, NetworkState};

// == Thresholds ==
/// Battery level below which the mode is forced to PowerSave
pub const CRITICAL_BATTERY_LEVEL: f32 = 0.15;

/// Battery level below which a discharging device runs Balanced
pub const LOW_BATTERY_LEVEL: f32 = 0.30;

// == Power Mode ==
/// Discrete operating tier, ordered by restrictiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    #[default]
    Normal,
    Balanced,
    PowerSave,
}

impl PowerMode {
    // == Derivation ==
    /// Derives the mode from the latest telemetry, first match wins:
    ///
    /// 1. `PowerSave` — OS low-power mode, or battery known below the
    ///    critical level.
    /// 2. `Balanced` — backgrounded, or on cellular, or battery known below
    ///    the low level while discharging.
    /// 3. `Normal` — otherwise.
    pub fn derive(battery: &BatteryState, network: &NetworkState, lifecycle: Lifecycle) -> Self {
        if battery.is_low_power_mode
            || battery.level.is_some_and(|level| level < CRITICAL_BATTERY_LEVEL)
        {
            return PowerMode::PowerSave;
        }

        if lifecycle == Lifecycle::Background
            || network.is_cellular()
            || (!battery.is_charging
                && battery.level.is_some_and(|level| level < LOW_BATTERY_LEVEL))
        {
            return PowerMode::Balanced;
        }

        PowerMode::Normal
    }
}

// == Power Settings ==
/// Scheduling knobs derived from a mode. The table values are the contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerSettings {
    pub reduced_animations: bool,
    pub reduced_polling_frequency: bool,
    pub deferred_operations: bool,
    pub reduced_image_quality: bool,
    pub background_sync_disabled: bool,
    pub location_updates_reduced: bool,
    /// Factor applied to polling base intervals
    pub polling_interval_multiplier: u32,
    /// Quality factor applied to image requests, in `(0, 1]`
    pub image_quality_factor: f32,
}

impl Default for PowerSettings {
    fn default() -> Self {
        PowerSettings::for_mode(PowerMode::Normal)
    }
}

impl PowerSettings {
    // == Settings Table ==
    /// Returns the settings for a mode.
    pub fn for_mode(mode: PowerMode) -> Self {
        match mode {
            PowerMode::Normal => Self {
                reduced_animations: false,
                reduced_polling_frequency: false,
                deferred_operations: false,
                reduced_image_quality: false,
                background_sync_disabled: false,
                location_updates_reduced: false,
                polling_interval_multiplier: 1,
                image_quality_factor: 1.0,
            },
            PowerMode::Balanced => Self {
                reduced_animations: false,
                reduced_polling_frequency: true,
                deferred_operations: false,
                reduced_image_quality: true,
                background_sync_disabled: false,
                location_updates_reduced: true,
                polling_interval_multiplier: 2,
                image_quality_factor: 0.7,
            },
            PowerMode::PowerSave => Self {
                reduced_animations: true,
                reduced_polling_frequency: true,
                deferred_operations: true,
                reduced_image_quality: true,
                background_sync_disabled: true,
                location_updates_reduced: true,
                polling_interval_multiplier: 4,
                image_quality_factor: 0.5,
            },
        }
    }
}
