//! [`ArbitrationLoop`] – the fixed-rate control task.
//!
//! One iteration ("tick"):
//!
//! 1. Pop at most one command from the [`CommandReceiver`].
//! 2. Resolve authority and outputs with the [`Arbiter`], reading the
//!    autonomy feedback cell only while autonomy is engaged.
//! 3. Publish the result, merged with the latest kinematics, as the new
//!    [`VehicleState`] snapshot.
//! 4. Every `print_decimation` frames, log a status line and report tasks
//!    that stopped beating.
//! 5. Wait for the next [`Ratekeeper`] deadline.
//!
//! A `quit` command or cancellation ends the loop cleanly.  Any error from a
//! tick ends it with that error; deciding whether to re-enter is the
//! supervisor's job.

use simbridge_control::{Arbiter, ControlParams, Resolution, TickOutcome};
use simbridge_kernel::{Heartbeat, Watchdog};
use simbridge_middleware::{CommandReceiver, LatestReader, LatestWriter};
use simbridge_types::{AutonomyFeedback, BridgeError, Kinematics, VehicleState};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::ratekeeper::Ratekeeper;

/// Why a loop run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A `quit` command was received.
    Quit,
    /// The cancellation token fired.
    Cancelled,
}

/// The arbitration task for one run of the bridge.
///
/// Borrows the command queue and the vehicle-state writer so that both
/// outlive the run and can be handed to the next one after a restart.
pub struct ArbitrationLoop<'a> {
    arbiter: Arbiter,
    commands: &'a mut CommandReceiver,
    state: &'a LatestWriter<VehicleState>,
    feedback: LatestReader<AutonomyFeedback>,
    kinematics: LatestReader<Kinematics>,
    print_decimation: u64,
    frame: u64,
    last: Option<Resolution>,
    supervision: Option<(Watchdog, Heartbeat)>,
}

impl<'a> ArbitrationLoop<'a> {
    pub fn new(
        params: ControlParams,
        commands: &'a mut CommandReceiver,
        state: &'a LatestWriter<VehicleState>,
        feedback: LatestReader<AutonomyFeedback>,
        kinematics: LatestReader<Kinematics>,
    ) -> Self {
        Self {
            arbiter: Arbiter::new(params),
            commands,
            state,
            feedback,
            kinematics,
            print_decimation: 100,
            frame: 0,
            last: None,
            supervision: None,
        }
    }

    /// Log a status line every `frames` ticks (`0` is treated as `1`).
    pub fn with_print_decimation(mut self, frames: u64) -> Self {
        self.print_decimation = frames.max(1);
        self
    }

    /// Beat `heartbeat` every tick and report silent tasks of `watchdog` with
    /// the status line.
    pub fn with_watchdog(mut self, watchdog: Watchdog, heartbeat: Heartbeat) -> Self {
        self.supervision = Some((watchdog, heartbeat));
        self
    }

    /// Ticks completed in this run.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Resolution of the most recent completed tick.
    pub fn last_resolution(&self) -> Option<&Resolution> {
        self.last.as_ref()
    }

    /// Run one tick without waiting for the next deadline.
    pub fn tick(&mut self) -> Result<TickOutcome, BridgeError> {
        let command = self.commands.try_pop();
        let feedback = &self.feedback;
        let outcome = self.arbiter.step(command, || feedback.live())?;

        let TickOutcome::Continue(resolution) = outcome else {
            info!(frame = self.frame, "quit command received");
            return Ok(outcome);
        };

        let kinematics = self.kinematics.snapshot();
        self.state.publish(VehicleState {
            speed: kinematics.speed_mps.max(0.0),
            steering_angle: resolution.outputs.steer,
            throttle: resolution.outputs.throttle,
            brake: resolution.outputs.brake,
            bearing_deg: kinematics.bearing_deg,
            cruise_button: resolution.cruise_button,
            autonomy_engaged: resolution.autonomy_engaged,
        });

        self.frame += 1;
        self.last = Some(resolution);
        if let Some((_, heartbeat)) = &self.supervision {
            heartbeat.beat();
        }
        if self.frame % self.print_decimation == 0 {
            self.report(&resolution);
        }
        Ok(outcome)
    }

    /// Tick at the [`Ratekeeper`]'s rate until quit, cancellation or error.
    pub async fn run(
        &mut self,
        ratekeeper: &mut Ratekeeper,
        cancel: &CancellationToken,
    ) -> Result<LoopExit, BridgeError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(LoopExit::Cancelled);
            }
            if self.tick()? == TickOutcome::Quit {
                return Ok(LoopExit::Quit);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(LoopExit::Cancelled),
                _ = ratekeeper.keep_time() => {}
            }
        }
    }

    fn report(&self, resolution: &Resolution) {
        info!(
            frame = self.frame,
            engaged = resolution.autonomy_engaged,
            throttle = resolution.outputs.throttle,
            steer = resolution.outputs.steer,
            brake = resolution.outputs.brake,
            queued = self.commands.pending(),
            "control status"
        );
        if let Some((watchdog, _)) = &self.supervision {
            for task in watchdog.check_all() {
                warn!(task = %task, "task missed its heartbeat deadline");
            }
        }
    }
}
