//! [`Ratekeeper`] – fixed-frequency tick scheduler.
//!
//! Deadlines are laid out on an absolute grid (`start + n * interval`), so
//! short jitter in one tick does not shift later ones.  A tick that finishes
//! past its deadline sleeps not at all; a tick that is late by more than a
//! whole interval re-anchors the grid at "now" instead of bursting through
//! the missed deadlines.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use simbridge_runtime::Ratekeeper;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), simbridge_types::BridgeError> {
//! let mut rk = Ratekeeper::new(100.0, Duration::from_millis(50))?;
//! for _ in 0..3 {
//!     // ... do one tick of work ...
//!     rk.keep_time().await;
//! }
//! assert_eq!(rk.frame(), 3);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use simbridge_types::BridgeError;
use tokio::time::{Instant, sleep_until};
use tracing::warn;

/// Keeps a loop running at a fixed rate and reports overruns.
#[derive(Debug)]
pub struct Ratekeeper {
    interval: Duration,
    overrun_threshold: Duration,
    next_deadline: Instant,
    frame: u64,
}

impl Ratekeeper {
    /// A scheduler whose first deadline is one interval from now.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Scheduler`] when `rate_hz` does not yield a positive,
    /// representable interval.
    pub fn new(rate_hz: f64, overrun_threshold: Duration) -> Result<Self, BridgeError> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(BridgeError::Scheduler(format!(
                "invalid tick rate {rate_hz} Hz (must be finite and > 0)"
            )));
        }
        let interval = Duration::try_from_secs_f64(1.0 / rate_hz)
            .map_err(|e| BridgeError::Scheduler(format!("tick rate {rate_hz} Hz: {e}")))?;
        if interval.is_zero() {
            return Err(BridgeError::Scheduler(format!(
                "tick rate {rate_hz} Hz is too high for the timer"
            )));
        }
        if rate_hz > 1_000.0 {
            warn!(rate_hz, "very high control rate, ticks may overrun");
        }
        Ok(Self {
            interval,
            overrun_threshold,
            next_deadline: Instant::now() + interval,
            frame: 0,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Ticks completed so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Finish the current tick: wait for its deadline, then advance.
    ///
    /// Returns `true` when the tick overran its deadline by more than the
    /// overrun threshold; a warning carrying the lag is logged in that case.
    pub async fn keep_time(&mut self) -> bool {
        self.frame += 1;
        let now = Instant::now();
        let lag = now.saturating_duration_since(self.next_deadline);
        let lagged = lag > self.overrun_threshold;
        if lagged {
            warn!(
                frame = self.frame,
                lag_ms = lag.as_secs_f64() * 1_000.0,
                "control loop lagging"
            );
        }

        if lag > self.interval {
            self.next_deadline = now + self.interval;
        } else {
            sleep_until(self.next_deadline).await;
            self.next_deadline += self.interval;
        }
        lagged
    }
}
