//! Named, topic-based publish/subscribe telemetry bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the publishers.
//!
//! # Topics
//!
//! Each [`Topic`] maps to one fixed channel name consumed downstream:
//!
//! | Topic | Channel | Typical traffic |
//! |---|---|---|
//! | [`Topic::PandaStates`] | `pandaStates` | Interface-hardware health, 2 Hz |
//! | [`Topic::PeripheralState`] | `peripheralState` | Power / fan telemetry, 2 Hz |
//! | [`Topic::DriverState`] | `driverState` | Driver camera model output |
//! | [`Topic::DriverMonitoringState`] | `driverMonitoringState` | Driver attention policy |
//! | [`Topic::Can`] | `can` | Actuation frames, 100 Hz |
//! | [`Topic::SensorEvents`] | `sensorEvents` | IMU samples |
//! | [`Topic::GpsLocationExternal`] | `gpsLocationExternal` | GNSS fixes |

use simbridge_types::{BridgeError, Event};
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of all routing topics on the telemetry bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    PandaStates,
    PeripheralState,
    DriverState,
    DriverMonitoringState,
    Can,
    SensorEvents,
    GpsLocationExternal,
}

impl Topic {
    /// Every topic, in declaration order.
    pub const ALL: [Topic; 7] = [
        Topic::PandaStates,
        Topic::PeripheralState,
        Topic::DriverState,
        Topic::DriverMonitoringState,
        Topic::Can,
        Topic::SensorEvents,
        Topic::GpsLocationExternal,
    ];

    /// The wire-level channel name downstream consumers subscribe to.
    pub fn name(self) -> &'static str {
        match self {
            Topic::PandaStates => "pandaStates",
            Topic::PeripheralState => "peripheralState",
            Topic::DriverState => "driverState",
            Topic::DriverMonitoringState => "driverMonitoringState",
            Topic::Can => "can",
            Topic::SensorEvents => "sensorEvents",
            Topic::GpsLocationExternal => "gpsLocationExternal",
        }
    }
}

/// Shared telemetry bus. Clone it cheaply – all clones share the same
/// underlying broadcast channels, so the host can hand one handle to every
/// component at construction time.
#[derive(Clone, Debug)]
pub struct EventBus {
    panda_states: broadcast::Sender<Event>,
    peripheral_state: broadcast::Sender<Event>,
    driver_state: broadcast::Sender<Event>,
    driver_monitoring_state: broadcast::Sender<Event>,
    can: broadcast::Sender<Event>,
    sensor_events: broadcast::Sender<Event>,
    gps_location_external: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    pub fn new(capacity: usize) -> Self {
        let (panda_states, _) = broadcast::channel(capacity);
        let (peripheral_state, _) = broadcast::channel(capacity);
        let (driver_state, _) = broadcast::channel(capacity);
        let (driver_monitoring_state, _) = broadcast::channel(capacity);
        let (can, _) = broadcast::channel(capacity);
        let (sensor_events, _) = broadcast::channel(capacity);
        let (gps_location_external, _) = broadcast::channel(capacity);
        Self {
            panda_states,
            peripheral_state,
            driver_state,
            driver_monitoring_state,
            can,
            sensor_events,
            gps_location_external,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event, or
    /// [`BridgeError::Channel`] when nobody is listening on the topic.
    /// Periodic publishers treat the latter as a normal condition.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, BridgeError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| BridgeError::Channel(format!("no subscribers for {}", topic.name())))
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of receivers currently subscribed to `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::PandaStates => &self.panda_states,
            Topic::PeripheralState => &self.peripheral_state,
            Topic::DriverState => &self.driver_state,
            Topic::DriverMonitoringState => &self.driver_monitoring_state,
            Topic::Can => &self.can,
            Topic::SensorEvents => &self.sensor_events,
            Topic::GpsLocationExternal => &self.gps_location_external,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Non-blocking receive of an already buffered event.
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drain every event currently buffered, skipping lag gaps.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut out = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => out.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return out,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}
