//! `simbridge-middleware` – The Wiring
//!
//! Moves data between the control loop, its periodic publishers, and the
//! external collaborators without caring about the data's meaning.
//!
//! # Modules
//!
//! - [`bus`] – Named, topic-based publish/subscribe telemetry bus built on
//!   Tokio broadcast channels.
//! - [`command_channel`] – Multi-producer / single-consumer queue of textual
//!   command tokens, decoded into typed [`Command`][simbridge_types::Command]s
//!   at the consumer boundary.
//! - [`latest`] – Last-value cells: one writer, any number of readers taking
//!   whole snapshots.  Used for the vehicle state and the autonomy feedback
//!   channel.

pub mod bus;
pub mod command_channel;
pub mod latest;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use command_channel::{CommandReceiver, CommandSender, command_channel};
pub use latest::{LatestReader, LatestWriter, latest};
