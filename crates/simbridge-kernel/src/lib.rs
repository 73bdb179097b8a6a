//! `simbridge-kernel` – Supervision primitives
//!
//! The bridge's control loop and publishers are supervised rather than
//! trusted to run forever.  This crate holds the pieces that decide *when* a
//! failed loop may be re-entered and *whether* a task has gone quiet.
//!
//! # Modules
//!
//! - [`restart_policy`] – [`RestartPolicy`][restart_policy::RestartPolicy] and
//!   [`RestartBudget`][restart_policy::RestartBudget]: a bounded retry count
//!   with exponential backoff, reset after a stable run.
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]: tracks heartbeats from
//!   registered tasks and reports the ones that stopped beating.

pub mod restart_policy;
pub mod watchdog;

pub use restart_policy::{RestartBudget, RestartDecision, RestartPolicy};
pub use watchdog::{Heartbeat, TaskHealth, Watchdog};
