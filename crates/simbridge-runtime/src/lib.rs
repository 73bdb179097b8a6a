//! `simbridge-runtime` – The Control Loop Engine
//!
//! Runs the bridge: a fixed-rate arbitration loop, independent periodic
//! publishers, sensor ingestion, and the supervisor that keeps them alive.
//!
//! # Modules
//!
//! - [`bridge`] – [`Bridge`][bridge::Bridge]: one scoped run of every task
//!   ([`run_once`][bridge::Bridge::run_once]) and the restart supervisor
//!   ([`run`][bridge::Bridge::run]).
//! - [`arbitration`] – [`ArbitrationLoop`][arbitration::ArbitrationLoop]:
//!   pops commands, asks the [`Arbiter`][simbridge_control::Arbiter] for the
//!   tick's outputs and publishes the [`VehicleState`][simbridge_types::VehicleState].
//! - [`ratekeeper`] – [`Ratekeeper`][ratekeeper::Ratekeeper]: fixed-frequency
//!   deadlines with overrun reporting.
//! - [`publishers`] – the [`Publisher`][publishers::Publisher] trait, the four
//!   standard publishers and their task runner.
//! - [`sensors`] – [`SensorIngest`][sensors::SensorIngest]: IMU / GNSS /
//!   velocity samples in, telemetry and kinematics out.
//! - [`config`] – [`BridgeConfig`][config::BridgeConfig].
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with optional OTLP span export.

pub mod arbitration;
pub mod bridge;
pub mod config;
pub mod publishers;
pub mod ratekeeper;
pub mod sensors;
pub mod telemetry;

pub use arbitration::{ArbitrationLoop, LoopExit};
pub use bridge::Bridge;
pub use config::{BridgeConfig, PublisherIntervals};
pub use publishers::{
    ActuationFramePublisher, DriverMonitoringPublisher, PandaStatePublisher, PeripheralStatePublisher,
    Publisher, spawn_publisher, standard_publishers,
};
pub use ratekeeper::Ratekeeper;
pub use sensors::SensorIngest;
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
