use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Separator between the verb and the argument of a textual command token,
/// e.g. `throttle_1.0` or `cruise_down`.
pub const COMMAND_DELIMITER: char = '_';

/// Cruise-control stalk events an operator can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CruiseKind {
    Up,
    Down,
    Cancel,
}

impl CruiseKind {
    /// `true` when this event hands authority to the autonomy stack.
    pub fn engages(self) -> bool {
        !matches!(self, CruiseKind::Cancel)
    }

    /// Cruise button reported on the bus for this event.
    pub fn button(self) -> CruiseButton {
        match self {
            CruiseKind::Down => CruiseButton::DecelSet,
            CruiseKind::Up => CruiseButton::ResAccel,
            CruiseKind::Cancel => CruiseButton::Cancel,
        }
    }
}

/// A decoded operator or autonomy command.
///
/// Parsed from `<verb>[_<arg>]` tokens. `steer`, `throttle` and `brake` carry a
/// finite float normalised to unit magnitude by the input device; `cruise`
/// carries `up`, `down` or `cancel`; `reverse` and `quit` ignore any argument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verb", content = "arg", rename_all = "lowercase")]
pub enum Command {
    Steer(f32),
    Throttle(f32),
    Brake(f32),
    Cruise(CruiseKind),
    Reverse,
    Quit,
}

impl Command {
    /// Parse a raw token, mapping every malformed input to `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    /// `true` for the raw manual controls that revoke autonomy.
    pub fn is_manual(&self) -> bool {
        matches!(
            self,
            Command::Steer(_) | Command::Throttle(_) | Command::Brake(_) | Command::Reverse
        )
    }
}

impl FromStr for Command {
    type Err = BridgeError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || BridgeError::MalformedCommand(raw.to_string());
        let token = raw.trim();
        let (verb, arg) = match token.split_once(COMMAND_DELIMITER) {
            Some((verb, arg)) => (verb, Some(arg)),
            None => (token, None),
        };

        let value = || -> Result<f32, BridgeError> {
            let v: f32 = arg.ok_or_else(malformed)?.parse().map_err(|_| malformed())?;
            if v.is_finite() { Ok(v) } else { Err(malformed()) }
        };

        match verb {
            "steer" => Ok(Command::Steer(value()?)),
            "throttle" => Ok(Command::Throttle(value()?)),
            "brake" => Ok(Command::Brake(value()?)),
            "cruise" => match arg {
                Some("up") => Ok(Command::Cruise(CruiseKind::Up)),
                Some("down") => Ok(Command::Cruise(CruiseKind::Down)),
                Some("cancel") => Ok(Command::Cruise(CruiseKind::Cancel)),
                _ => Err(malformed()),
            },
            "reverse" => Ok(Command::Reverse),
            "quit" => Ok(Command::Quit),
            _ => Err(malformed()),
        }
    }
}

/// Cruise button code placed on the actuation bus (Honda button encoding).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CruiseButton {
    #[default]
    None,
    DecelSet,
    ResAccel,
    Cancel,
}

impl CruiseButton {
    pub fn code(self) -> u8 {
        match self {
            CruiseButton::None => 0,
            CruiseButton::Cancel => 2,
            CruiseButton::DecelSet => 3,
            CruiseButton::ResAccel => 4,
        }
    }
}

/// Which control source determines actuation output on a given tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Authority {
    #[default]
    Manual,
    Autonomous,
}

/// Latest resolved actuation and telemetry values.
///
/// Written once per tick by the arbitration loop; every other task only ever
/// sees whole snapshots of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Vehicle speed in m/s, never negative.
    pub speed: f32,
    /// Steering angle after rate limiting and saturation.
    pub steering_angle: f32,
    pub throttle: f32,
    pub brake: f32,
    pub bearing_deg: f32,
    pub cruise_button: CruiseButton,
    pub autonomy_engaged: bool,
}

/// Per-tick control result. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlOutputs {
    /// Throttle in `[0, 1]` for autonomy, `raw * multiplier` for manual input.
    pub throttle: f32,
    /// Steering angle in physical units, within `±max_steer_angle * steer_ratio`.
    pub steer: f32,
    pub brake: f32,
    /// Bus-relative steering command in `[-1, 1]` (sign inverted).
    pub steer_command: f32,
}

/// Last-value setpoints exposed by the autonomy stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AutonomyFeedback {
    /// Desired longitudinal acceleration in m/s².
    pub accel: f32,
    /// Desired steering-wheel angle in degrees.
    pub steering_angle_deg: f32,
}

impl AutonomyFeedback {
    pub fn new(accel: f32, steering_angle_deg: f32) -> Self {
        Self {
            accel,
            steering_angle_deg,
        }
    }
}

/// Motion quantities supplied by sensor collaborators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub speed_mps: f32,
    pub bearing_deg: f32,
    /// Velocity in the simulator world frame (x east, y south, z up).
    pub velocity: [f32; 3],
}

// ---------------------------------------------------------------------------
// Sensor samples
// ---------------------------------------------------------------------------

/// Raw inertial sample as delivered by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuSample {
    pub accelerometer: [f32; 3],
    pub gyroscope: [f32; 3],
    /// Compass heading in radians.
    pub compass_rad: f32,
}

/// Raw GNSS fix as delivered by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsSample {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

// ---------------------------------------------------------------------------
// Telemetry payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PandaType {
    BlackPanda,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyModel {
    HondaNidec,
}

/// Interface-hardware health snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PandaState {
    pub ignition_line: bool,
    pub panda_type: PandaType,
    pub controls_allowed: bool,
    pub safety_model: SafetyModel,
}

/// Power and fan telemetry of the interface hardware.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeripheralState {
    pub panda_type: PandaType,
    pub voltage_mv: u32,
    pub current_ma: u32,
    pub fan_speed_rpm: u16,
}

/// Output of the driver-facing camera model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverState {
    pub face_prob: f32,
}

/// Output of the driver-monitoring policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverMonitoringState {
    pub face_detected: bool,
    pub is_distracted: bool,
    pub awareness_status: f32,
}

/// Low-level actuation frame emitted onto the vehicle bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuationFrame {
    pub sequence: u64,
    pub speed: f32,
    pub steering_angle: f32,
    pub cruise_button: u8,
    pub autonomy_engaged: bool,
}

/// A single entry of a `sensorEvents` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorEvent {
    Acceleration { sensor: u8, kind: u8, v: [f32; 3] },
    GyroUncalibrated { sensor: u8, kind: u8, v: [f32; 3] },
}

/// External GNSS location report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsLocation {
    pub timestamp_ms: i64,
    pub flags: u32,
    pub accuracy: f32,
    pub vertical_accuracy: f32,
    pub speed_accuracy: f32,
    pub bearing_accuracy_deg: f32,
    /// Velocity in north/east/down order.
    pub v_ned: [f32; 3],
    pub bearing_deg: f32,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f32,
}

/// Unified event wrapper for the telemetry bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "simbridge-runtime::publishers/panda_state"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` in a fresh envelope stamped with the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the telemetry bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    PandaStates(Vec<PandaState>),
    PeripheralState(PeripheralState),
    DriverState(DriverState),
    DriverMonitoringState(DriverMonitoringState),
    Actuation(ActuationFrame),
    SensorEvents(Vec<SensorEvent>),
    GpsLocation(GpsLocation),
}

/// Error taxonomy of the bridge.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BridgeError {
    #[error("Malformed command: {0:?}")]
    MalformedCommand(String),

    #[error("Autonomy feedback unavailable: {0}")]
    FeedbackUnavailable(String),

    #[error("Invalid autonomy feedback: {0}")]
    InvalidFeedback(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Restart budget exhausted after {attempts} attempts: {last_error}")]
    RestartLimit { attempts: u32, last_error: String },
}

impl BridgeError {
    /// Transient faults restart the control loop; everything else is handed
    /// to the host.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BridgeError::FeedbackUnavailable(_)
                | BridgeError::InvalidFeedback(_)
                | BridgeError::Channel(_)
        )
    }
}
