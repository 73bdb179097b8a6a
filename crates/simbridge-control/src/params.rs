//! Tunable constants of the arbitration logic.
//!
//! The manual multipliers assume the input collaborators deliver keyboard and
//! joystick signals already normalised to unit magnitude: a full key press is
//! `1.0`, so full manual throttle maps to `0.7` and full manual steer maps to
//! `45°` of road-wheel angle expressed in steering-wheel units.

use serde::{Deserialize, Serialize};
use simbridge_types::BridgeError;

/// Physical limits and smoothing constants used by the [`Arbiter`][crate::Arbiter].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlParams {
    /// Steering-wheel angle per unit of road-wheel angle.
    pub steer_ratio: f32,
    /// Largest road-wheel angle the actuator accepts.
    pub max_steer_angle: f32,
    /// Ticks a released control holds its last value.
    pub repeat_count: u32,
    /// Largest steering change per tick while autonomy is authoritative.
    pub steer_rate_limit: f32,
    pub throttle_manual_multiplier: f32,
    pub brake_manual_multiplier: f32,
    /// Manual steer gain in degrees; the effective multiplier is
    /// `steer_manual_gain * steer_ratio`.
    pub steer_manual_gain: f32,
    /// Acceleration (m/s²) mapping to full throttle.
    pub accel_to_throttle: f32,
    /// Deceleration (m/s²) mapping to full brake.
    pub decel_to_brake: f32,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            steer_ratio: 15.0,
            max_steer_angle: std::f32::consts::PI,
            repeat_count: 5,
            steer_rate_limit: 0.5,
            throttle_manual_multiplier: 0.7,
            brake_manual_multiplier: 0.7,
            steer_manual_gain: 45.0,
            accel_to_throttle: 1.6,
            decel_to_brake: 4.0,
        }
    }
}

impl ControlParams {
    /// Saturation bound for steering output: `max_steer_angle * steer_ratio`.
    pub fn steer_limit(&self) -> f32 {
        self.max_steer_angle * self.steer_ratio
    }

    /// Multiplier applied to a unit-normalised manual steer input.
    pub fn steer_manual_multiplier(&self) -> f32 {
        self.steer_manual_gain * self.steer_ratio
    }

    /// Reject values that would make the control law meaningless.
    pub fn validate(&self) -> Result<(), BridgeError> {
        let positive = [
            ("steer_ratio", self.steer_ratio),
            ("max_steer_angle", self.max_steer_angle),
            ("steer_rate_limit", self.steer_rate_limit),
            ("accel_to_throttle", self.accel_to_throttle),
            ("decel_to_brake", self.decel_to_brake),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(BridgeError::Config(format!(
                    "{name} must be finite and > 0, got {value}"
                )));
            }
        }
        let non_negative = [
            ("throttle_manual_multiplier", self.throttle_manual_multiplier),
            ("brake_manual_multiplier", self.brake_manual_multiplier),
            ("steer_manual_gain", self.steer_manual_gain),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(BridgeError::Config(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}
