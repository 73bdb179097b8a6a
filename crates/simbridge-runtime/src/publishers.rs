//! Periodic publishers.
//!
//! Each [`Publisher`] describes one fixed-cadence message stream derived
//! from the latest [`VehicleState`] snapshot.  [`spawn_publisher`] runs it
//! as its own Tokio task, decoupled from the arbitration loop's cadence:
//!
//! | Publisher | Topic(s) | Default period |
//! |---|---|---|
//! | [`PandaStatePublisher`] | `pandaStates` | 500 ms |
//! | [`PeripheralStatePublisher`] | `peripheralState` | 500 ms |
//! | [`DriverMonitoringPublisher`] | `driverState`, `driverMonitoringState` | 50 ms |
//! | [`ActuationFramePublisher`] | `can` | 10 ms |
//!
//! Publishing with nobody subscribed is not an error for a publisher; the
//! message is simply dropped.

use std::time::Duration;

use simbridge_kernel::Heartbeat;
use simbridge_middleware::{EventBus, LatestReader, Topic};
use simbridge_types::{
    ActuationFrame, DriverMonitoringState, DriverState, Event, EventPayload, PandaState, PandaType,
    PeripheralState, SafetyModel, VehicleState,
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::PublisherIntervals;

/// A fixed-interval message source.
pub trait Publisher: Send {
    /// Stable name, used for logging and watchdog registration.
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    /// Messages for one period, given the latest vehicle snapshot.
    fn emit(&mut self, state: &VehicleState) -> Vec<(Topic, EventPayload)>;
}

// ────────────────────────────────────────────────────────────────────────────
// Publishers
// ────────────────────────────────────────────────────────────────────────────

/// "Healthy interface hardware present, controls allowed."
pub struct PandaStatePublisher {
    interval: Duration,
}

impl PandaStatePublisher {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Publisher for PandaStatePublisher {
    fn name(&self) -> &'static str {
        "panda_state"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn emit(&mut self, _state: &VehicleState) -> Vec<(Topic, EventPayload)> {
        let panda = PandaState {
            ignition_line: true,
            panda_type: PandaType::BlackPanda,
            controls_allowed: true,
            safety_model: SafetyModel::HondaNidec,
        };
        vec![(Topic::PandaStates, EventPayload::PandaStates(vec![panda]))]
    }
}

/// Static power and fan telemetry.
pub struct PeripheralStatePublisher {
    interval: Duration,
}

impl PeripheralStatePublisher {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Publisher for PeripheralStatePublisher {
    fn name(&self) -> &'static str {
        "peripheral_state"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn emit(&mut self, _state: &VehicleState) -> Vec<(Topic, EventPayload)> {
        vec![(
            Topic::PeripheralState,
            EventPayload::PeripheralState(PeripheralState {
                panda_type: PandaType::BlackPanda,
                voltage_mv: 12_000,
                current_ma: 5_678,
                fan_speed_rpm: 1_000,
            }),
        )]
    }
}

/// An attentive driver: one camera-model message and one policy message per
/// period.
pub struct DriverMonitoringPublisher {
    interval: Duration,
}

impl DriverMonitoringPublisher {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Publisher for DriverMonitoringPublisher {
    fn name(&self) -> &'static str {
        "driver_monitoring"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn emit(&mut self, _state: &VehicleState) -> Vec<(Topic, EventPayload)> {
        vec![
            (
                Topic::DriverState,
                EventPayload::DriverState(DriverState { face_prob: 1.0 }),
            ),
            (
                Topic::DriverMonitoringState,
                EventPayload::DriverMonitoringState(DriverMonitoringState {
                    face_detected: true,
                    is_distracted: false,
                    awareness_status: 1.0,
                }),
            ),
        ]
    }
}

/// Low-level actuation frames with a strictly increasing sequence number.
pub struct ActuationFramePublisher {
    interval: Duration,
    sequence: u64,
}

impl ActuationFramePublisher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            sequence: 0,
        }
    }
}

impl Publisher for ActuationFramePublisher {
    fn name(&self) -> &'static str {
        "actuation"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    fn emit(&mut self, state: &VehicleState) -> Vec<(Topic, EventPayload)> {
        let frame = ActuationFrame {
            sequence: self.sequence,
            speed: state.speed,
            steering_angle: state.steering_angle,
            cruise_button: state.cruise_button.code(),
            autonomy_engaged: state.autonomy_engaged,
        };
        self.sequence += 1;
        vec![(Topic::Can, EventPayload::Actuation(frame))]
    }
}

/// The four standard publishers at the configured periods.
pub fn standard_publishers(intervals: &PublisherIntervals) -> Vec<Box<dyn Publisher>> {
    vec![
        Box::new(PandaStatePublisher::new(Duration::from_millis(intervals.panda_ms))),
        Box::new(PeripheralStatePublisher::new(Duration::from_millis(
            intervals.peripheral_ms,
        ))),
        Box::new(DriverMonitoringPublisher::new(Duration::from_millis(
            intervals.driver_monitoring_ms,
        ))),
        Box::new(ActuationFramePublisher::new(Duration::from_millis(
            intervals.actuation_ms,
        ))),
    ]
}

// ────────────────────────────────────────────────────────────────────────────
// Task runner
// ────────────────────────────────────────────────────────────────────────────

/// Run `publisher` on its own task until `cancel` fires.
///
/// The first emission happens immediately.  Each period reads one fresh
/// [`VehicleState`] snapshot, publishes every message and beats `heartbeat`.
/// The task resolves to the number of periods it completed.
pub fn spawn_publisher(
    mut publisher: Box<dyn Publisher>,
    bus: EventBus,
    state: LatestReader<VehicleState>,
    cancel: CancellationToken,
    heartbeat: Heartbeat,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let name = publisher.name();
        let source = format!("simbridge-runtime::publishers/{name}");
        let mut ticker = tokio::time::interval(publisher.interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut periods = 0_u64;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let snapshot = state.snapshot();
            for (topic, payload) in publisher.emit(&snapshot) {
                let _ = bus.publish_to(topic, Event::new(source.as_str(), payload));
            }
            heartbeat.beat();
            periods += 1;
        }

        debug!(publisher = name, periods, "publisher stopped");
        periods
    })
}
