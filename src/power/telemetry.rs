//! Power Telemetry Module
//!
//! Input types fed into the power policy by the host environment's
//! notification streams: battery, network, and app lifecycle.

use serde::{Deserialize, Serialize};

// == Battery State ==
/// Latest battery telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatteryState {
    /// Charge level in `[0, 1]`, or None when the platform does not report it
    pub level: Option<f32>,
    /// True while plugged in and charging
    pub is_charging: bool,
    /// True when the OS low-power mode is active
    pub is_low_power_mode: bool,
}

impl BatteryState {
    /// Builds a battery state with a known level.
    pub fn new(level: f32, is_charging: bool, is_low_power_mode: bool) -> Self {
        Self {
            level: Some(level),
            is_charging,
            is_low_power_mode,
        }
    }
}

impl Default for BatteryState {
    /// Level unknown, discharging, low-power mode off.
    fn default() -> Self {
        Self {
            level: None,
            is_charging: false,
            is_low_power_mode: false,
        }
    }
}

// == Connection Type ==
/// Transport reported by the platform's connectivity monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Wifi,
    Cellular,
    Ethernet,
    Unknown,
}

// == Network State ==
/// Latest network telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkState {
    /// True when any route to the network exists
    pub is_connected: bool,
    /// Transport in use
    pub connection: ConnectionType,
    /// True when the platform flags the connection as metered/expensive
    pub is_expensive: bool,
}

impl NetworkState {
    /// Connected over wifi, not expensive.
    pub fn wifi() -> Self {
        Self {
            is_connected: true,
            connection: ConnectionType::Wifi,
            is_expensive: false,
        }
    }

    /// Connected over cellular; metered flag as given.
    pub fn cellular(is_expensive: bool) -> Self {
        Self {
            is_connected: true,
            connection: ConnectionType::Cellular,
            is_expensive,
        }
    }

    /// No connectivity.
    pub fn disconnected() -> Self {
        Self {
            is_connected: false,
            connection: ConnectionType::Unknown,
            is_expensive: false,
        }
    }

    /// True when the transport is wifi.
    pub fn is_wifi(&self) -> bool {
        self.connection == ConnectionType::Wifi
    }

    /// True when the transport is cellular.
    pub fn is_cellular(&self) -> bool {
        self.connection == ConnectionType::Cellular
    }
}

impl Default for NetworkState {
    /// Connected over an unknown transport, not expensive.
    fn default() -> Self {
        Self {
            is_connected: true,
            connection: ConnectionType::Unknown,
            is_expensive: false,
        }
    }
}

// == Lifecycle ==
/// Foreground/background state of the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    #[default]
    Foreground,
    Background,
}

impl Lifecycle {
    /// True when the app is foregrounded.
    pub fn is_foreground(&self) -> bool {
        *self == Lifecycle::Foreground
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_battery_default_is_unknown_level() {
        let battery = BatteryState::default();
        assert!(battery.level.is_none());
        assert!(!battery.is_charging);
        assert!(!battery.is_low_power_mode);
    }

    #[test]
    fn test_network_helpers() {
        assert!(NetworkState::wifi().is_wifi());
        assert!(!NetworkState::wifi().is_cellular());
        assert!(NetworkState::cellular(true).is_cellular());
        assert!(NetworkState::cellular(true).is_expensive);
        assert!(!NetworkState::disconnected().is_connected);
    }

    #[test]
    fn test_lifecycle_default_is_foreground() {
        assert!(Lifecycle::default().is_foreground());
        assert!(!Lifecycle::Background.is_foreground());
    }

    #[test]
    fn test_connection_type_serde_round_trip() {
        let json = serde_json::to_string(&ConnectionType::Cellular).unwrap();
        assert_eq!(json, "\"cellular\"");
        let back: ConnectionType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ConnectionType::Cellular);
    }
}
