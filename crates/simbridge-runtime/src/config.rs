//! [`BridgeConfig`] – every tunable of a bridge run.
//!
//! All fields have defaults, so a TOML document only needs to name what it
//! changes:
//!
//! ```toml
//! rate_hz = 50.0
//!
//! [control]
//! steer_ratio = 12.0
//!
//! [restart]
//! max_restarts = 3
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use simbridge_control::ControlParams;
use simbridge_kernel::RestartPolicy;
use simbridge_types::BridgeError;

/// Emission periods of the periodic publishers, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherIntervals {
    pub panda_ms: u64,
    pub peripheral_ms: u64,
    pub driver_monitoring_ms: u64,
    pub actuation_ms: u64,
}

impl Default for PublisherIntervals {
    fn default() -> Self {
        Self {
            panda_ms: 500,
            peripheral_ms: 500,
            driver_monitoring_ms: 50,
            actuation_ms: 10,
        }
    }
}

/// Configuration for [`Bridge`][crate::Bridge].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub control: ControlParams,
    /// Arbitration loop frequency.
    pub rate_hz: f64,
    /// Lag past a tick deadline that is reported as an overrun.
    pub overrun_threshold_ms: u64,
    /// Frames between two status log lines.
    pub print_decimation: u64,
    /// Speed reported until a velocity sample arrives.
    pub vehicle_speed_mps: f32,
    pub publishers: PublisherIntervals,
    /// Per-topic buffer of the telemetry bus.
    pub bus_capacity: usize,
    pub restart: RestartPolicy,
    /// Silence after which a task is reported as frozen.
    pub watchdog_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            control: ControlParams::default(),
            rate_hz: 100.0,
            overrun_threshold_ms: 50,
            print_decimation: 100,
            vehicle_speed_mps: 11.1,
            publishers: PublisherIntervals::default(),
            bus_capacity: 256,
            restart: RestartPolicy::default(),
            watchdog_timeout_ms: 2_000,
        }
    }
}

impl BridgeConfig {
    pub fn overrun_threshold(&self) -> Duration {
        Duration::from_millis(self.overrun_threshold_ms)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    /// Check every field, returning the first problem as
    /// [`BridgeError::Config`].
    pub fn validate(&self) -> Result<(), BridgeError> {
        self.control.validate()?;
        self.restart.validate()?;
        if !self.rate_hz.is_finite() || self.rate_hz <= 0.0 {
            return Err(BridgeError::Config(format!(
                "rate_hz must be finite and > 0, got {}",
                self.rate_hz
            )));
        }
        if !self.vehicle_speed_mps.is_finite() || self.vehicle_speed_mps < 0.0 {
            return Err(BridgeError::Config(format!(
                "vehicle_speed_mps must be finite and >= 0, got {}",
                self.vehicle_speed_mps
            )));
        }
        let non_zero = [
            ("print_decimation", self.print_decimation),
            ("bus_capacity", self.bus_capacity as u64),
            ("watchdog_timeout_ms", self.watchdog_timeout_ms),
            ("publishers.panda_ms", self.publishers.panda_ms),
            ("publishers.peripheral_ms", self.publishers.peripheral_ms),
            ("publishers.driver_monitoring_ms", self.publishers.driver_monitoring_ms),
            ("publishers.actuation_ms", self.publishers.actuation_ms),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(BridgeError::Config(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = BridgeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.overrun_threshold(), Duration::from_millis(50));
        assert_eq!(config.publishers.driver_monitoring_ms, 50);
    }

    #[test]
    fn rejects_zero_rate() {
        let config = BridgeConfig {
            rate_hz: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config = BridgeConfig::default();
        config.publishers.actuation_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("publishers.actuation_ms"));
    }

    #[test]
    fn nested_errors_surface() {
        let mut config = BridgeConfig::default();
        config.control.steer_ratio = -1.0;
        assert!(config.validate().unwrap_err().to_string().contains("steer_ratio"));
    }

    #[test]
    fn parses_partial_toml() {
        let config: BridgeConfig = toml::from_str(
            "rate_hz = 50.0\n[control]\nsteer_ratio = 12.0\n[publishers]\npanda_ms = 250\n",
        )
        .unwrap();
        assert_eq!(config.rate_hz, 50.0);
        assert_eq!(config.control.steer_ratio, 12.0);
        assert_eq!(config.control.repeat_count, 5);
        assert_eq!(config.publishers.panda_ms, 250);
        assert_eq!(config.publishers.peripheral_ms, 500);
    }
}
