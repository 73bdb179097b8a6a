//! [`SensorIngest`] – republishes simulator sensor samples.
//!
//! The simulator client (outside this crate) hands over already decoded IMU,
//! GNSS and velocity samples.  `SensorIngest` turns them into bus messages
//! and keeps the [`Kinematics`] cell the arbitration loop reads its speed and
//! bearing from.

use simbridge_middleware::{EventBus, LatestReader, LatestWriter, Topic, latest};
use simbridge_types::{
    BridgeError, Event, EventPayload, GpsLocation, GpsSample, ImuSample, Kinematics, SensorEvent,
};

const SOURCE: &str = "simbridge-runtime::sensors";

/// Sensor id of the accelerometer in `sensorEvents`.
pub const ACCELERATION_SENSOR: u8 = 4;
/// Sensor id of the uncalibrated gyroscope in `sensorEvents`.
pub const GYRO_UNCALIBRATED_SENSOR: u8 = 5;
const SENSOR_KIND: u8 = 0x10;

/// Converts sensor samples into telemetry and tracks vehicle kinematics.
pub struct SensorIngest {
    bus: EventBus,
    kinematics: LatestWriter<Kinematics>,
}

impl SensorIngest {
    /// Start with a vehicle moving at `speed_mps` due north.
    pub fn new(bus: EventBus, speed_mps: f32) -> Self {
        let (kinematics, _) = latest(Kinematics {
            speed_mps,
            ..Default::default()
        });
        Self { bus, kinematics }
    }

    /// Reader for the kinematics cell.
    pub fn kinematics(&self) -> LatestReader<Kinematics> {
        self.kinematics.reader()
    }

    /// Update the bearing from the compass and publish `sensorEvents`.
    pub fn ingest_imu(&self, sample: ImuSample) -> Result<usize, BridgeError> {
        self.kinematics
            .update(|k| k.bearing_deg = sample.compass_rad.to_degrees());
        let events = vec![
            SensorEvent::Acceleration {
                sensor: ACCELERATION_SENSOR,
                kind: SENSOR_KIND,
                v: sample.accelerometer,
            },
            SensorEvent::GyroUncalibrated {
                sensor: GYRO_UNCALIBRATED_SENSOR,
                kind: SENSOR_KIND,
                v: sample.gyroscope,
            },
        ];
        self.bus.publish_to(
            Topic::SensorEvents,
            Event::new(SOURCE, EventPayload::SensorEvents(events)),
        )
    }

    /// Publish `gpsLocationExternal` for a GNSS fix, stamped with the
    /// current bearing, speed and velocity.
    pub fn ingest_gps(&self, sample: GpsSample) -> Result<usize, BridgeError> {
        let k = self.kinematics.reader().snapshot();
        let [vx, vy, vz] = k.velocity;
        let location = GpsLocation {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            flags: 1,
            accuracy: 1.0,
            vertical_accuracy: 1.0,
            speed_accuracy: 0.1,
            bearing_accuracy_deg: 0.1,
            v_ned: [-vy, vx, vz],
            bearing_deg: k.bearing_deg,
            latitude: sample.latitude,
            longitude: sample.longitude,
            altitude: sample.altitude,
            speed: k.speed_mps,
        };
        self.bus.publish_to(
            Topic::GpsLocationExternal,
            Event::new(SOURCE, EventPayload::GpsLocation(location)),
        )
    }

    /// Record the world-frame velocity; speed becomes its magnitude.
    pub fn update_velocity(&self, velocity: [f32; 3]) {
        let speed = velocity.iter().map(|v| v * v).sum::<f32>().sqrt();
        self.kinematics.update(|k| {
            k.velocity = velocity;
            k.speed_mps = speed;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imu(compass_rad: f32) -> ImuSample {
        ImuSample {
            accelerometer: [0.1, 0.2, 9.8],
            gyroscope: [0.0, 0.0, 0.3],
            compass_rad,
        }
    }

    #[test]
    fn seeds_speed() {
        let ingest = SensorIngest::new(EventBus::default(), 11.1);
        assert_eq!(ingest.kinematics().snapshot().speed_mps, 11.1);
    }

    #[test]
    fn imu_updates_bearing_and_publishes_two_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::SensorEvents);
        let ingest = SensorIngest::new(bus, 0.0);

        ingest.ingest_imu(imu(std::f32::consts::FRAC_PI_2)).unwrap();
        assert!((ingest.kinematics().snapshot().bearing_deg - 90.0).abs() < 1e-4);

        let event = rx.try_recv().unwrap();
        match event.payload {
            EventPayload::SensorEvents(events) => {
                assert_eq!(events.len(), 2);
                assert_eq!(
                    events[0],
                    SensorEvent::Acceleration {
                        sensor: 4,
                        kind: 0x10,
                        v: [0.1, 0.2, 9.8]
                    }
                );
                assert!(matches!(
                    events[1],
                    SensorEvent::GyroUncalibrated { sensor: 5, .. }
                ));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn imu_without_subscribers_still_updates_bearing() {
        let ingest = SensorIngest::new(EventBus::default(), 0.0);
        assert!(ingest.ingest_imu(imu(std::f32::consts::PI)).is_err());
        assert!((ingest.kinematics().snapshot().bearing_deg - 180.0).abs() < 1e-4);
    }

    #[test]
    fn gps_reorders_velocity_to_ned() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::GpsLocationExternal);
        let ingest = SensorIngest::new(bus, 0.0);
        ingest.update_velocity([3.0, 4.0, 0.5]);
        ingest
            .ingest_gps(GpsSample {
                latitude: 37.77,
                longitude: -122.41,
                altitude: 12.0,
            })
            .unwrap();

        match rx.try_recv().unwrap().payload {
            EventPayload::GpsLocation(fix) => {
                assert_eq!(fix.v_ned, [-4.0, 3.0, 0.5]);
                assert!((fix.speed - 5.024938).abs() < 1e-4);
                assert_eq!(fix.flags, 1);
                assert_eq!(fix.latitude, 37.77);
                assert!(fix.timestamp_ms > 0);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn velocity_sets_speed_magnitude() {
        let ingest = SensorIngest::new(EventBus::default(), 11.1);
        ingest.update_velocity([0.0, -3.0, 4.0]);
        let k = ingest.kinematics().snapshot();
        assert_eq!(k.speed_mps, 5.0);
        assert_eq!(k.velocity, [0.0, -3.0, 4.0]);
    }
}
