//! `simbridge-control` – Control Arbitration
//!
//! Pure, synchronous decision logic for the vehicle bridge.  Nothing in this
//! crate sleeps, allocates per tick, or performs I/O; the async loop in
//! `simbridge-runtime` feeds it one command and one feedback sample per tick.
//!
//! # Modules
//!
//! - [`params`] – [`ControlParams`][params::ControlParams]: vehicle geometry,
//!   manual-input multipliers and smoothing constants.
//! - [`rate_limit`] – per-tick steering step limiter.
//! - [`ease_out`] – [`EaseOut`][ease_out::EaseOut]: bounded hold of a released
//!   control input before it collapses to neutral.
//! - [`arbiter`] – [`Arbiter`][arbiter::Arbiter]: resolves manual vs.
//!   autonomous authority each tick and produces saturated
//!   [`ControlOutputs`][simbridge_types::ControlOutputs].

pub mod arbiter;
pub mod ease_out;
pub mod params;
pub mod rate_limit;

pub use arbiter::{Arbiter, Resolution, TickOutcome};
pub use ease_out::{EaseOut, Release};
pub use params::ControlParams;
pub use rate_limit::rate_limit;
