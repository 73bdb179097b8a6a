//! [`Bridge`] – scoped run of every task plus the keep-alive supervisor.
//!
//! [`Bridge::run_once`] is one structured run: it resets the vehicle state,
//! spawns the periodic publishers on a child cancellation token, drives the
//! [`ArbitrationLoop`] until it ends, then cancels and joins every publisher
//! before returning.  Nothing spawned by a run outlives it.
//!
//! [`Bridge::run`] wraps that in the restart policy: recoverable failures
//! re-enter `run_once` from a clean state after a backoff delay, fatal ones
//! and an exhausted [`RestartBudget`] are returned to the host.
//!
//! The command queue belongs to the bridge, not to a run, so commands pushed
//! during a restart are delivered to the next run.

use simbridge_kernel::{RestartBudget, RestartDecision, Watchdog};
use simbridge_middleware::{CommandReceiver, EventBus, LatestReader, LatestWriter, latest};
use simbridge_types::{AutonomyFeedback, BridgeError, Kinematics, VehicleState};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::arbitration::{ArbitrationLoop, LoopExit};
use crate::config::BridgeConfig;
use crate::publishers::{spawn_publisher, standard_publishers};
use crate::ratekeeper::Ratekeeper;

/// Owns everything that survives a control-loop restart.
pub struct Bridge {
    config: BridgeConfig,
    bus: EventBus,
    commands: CommandReceiver,
    feedback: LatestReader<AutonomyFeedback>,
    kinematics: LatestReader<Kinematics>,
    state: LatestWriter<VehicleState>,
}

impl Bridge {
    /// Assemble a bridge from injected handles.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Config`] when `config` does not validate.
    pub fn new(
        config: BridgeConfig,
        bus: EventBus,
        commands: CommandReceiver,
        feedback: LatestReader<AutonomyFeedback>,
        kinematics: LatestReader<Kinematics>,
    ) -> Result<Self, BridgeError> {
        config.validate()?;
        let (state, _) = latest(VehicleState::default());
        Ok(Self {
            config,
            bus,
            commands,
            feedback,
            kinematics,
            state,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Reader for the vehicle state published every tick.
    pub fn vehicle_state(&self) -> LatestReader<VehicleState> {
        self.state.reader()
    }

    /// One scoped run of the loop and the publishers.
    pub async fn run_once(&mut self, cancel: &CancellationToken) -> Result<LoopExit, BridgeError> {
        let mut ratekeeper = Ratekeeper::new(self.config.rate_hz, self.config.overrun_threshold())?;

        let kinematics = self.kinematics.snapshot();
        self.state.publish(VehicleState {
            speed: kinematics.speed_mps.max(0.0),
            bearing_deg: kinematics.bearing_deg,
            ..Default::default()
        });

        let tasks = cancel.child_token();
        let mut watchdog = Watchdog::new();
        let timeout = self.config.watchdog_timeout();
        let handles: Vec<_> = standard_publishers(&self.config.publishers)
            .into_iter()
            .map(|publisher| {
                let heartbeat =
                    watchdog.register(publisher.name(), timeout.max(publisher.interval() * 2));
                spawn_publisher(
                    publisher,
                    self.bus.clone(),
                    self.state.reader(),
                    tasks.clone(),
                    heartbeat,
                )
            })
            .collect();
        let loop_heartbeat = watchdog.register("arbitration", timeout);
        info!(publishers = handles.len(), rate_hz = self.config.rate_hz, "bridge run started");

        let result = ArbitrationLoop::new(
            self.config.control.clone(),
            &mut self.commands,
            &self.state,
            self.feedback.clone(),
            self.kinematics.clone(),
        )
        .with_print_decimation(self.config.print_decimation)
        .with_watchdog(watchdog, loop_heartbeat)
        .run(&mut ratekeeper, &tasks)
        .await;

        tasks.cancel();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "publisher task did not shut down cleanly");
            }
        }
        result
    }

    /// Run until quit or cancellation, restarting after recoverable failures.
    ///
    /// # Errors
    ///
    /// Fatal errors from a run are returned unchanged.  When the restart
    /// budget is spent, [`BridgeError::RestartLimit`] carries the last cause.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<LoopExit, BridgeError> {
        let mut budget = RestartBudget::new(self.config.restart.clone());
        loop {
            let started = Instant::now();
            let err = match self.run_once(cancel).await {
                Ok(exit) => {
                    info!(?exit, "bridge stopped");
                    return Ok(exit);
                }
                Err(e) if e.is_recoverable() => e,
                Err(e) => {
                    error!(error = %e, "fatal bridge error");
                    return Err(e);
                }
            };

            match budget.record_failure(started.elapsed()) {
                RestartDecision::Retry { attempt, delay } => {
                    warn!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "control loop failed, restarting"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Ok(LoopExit::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                RestartDecision::GiveUp { attempts } => {
                    error!(attempts, error = %err, "restart budget exhausted, giving up");
                    return Err(BridgeError::RestartLimit {
                        attempts,
                        last_error: err.to_string(),
                    });
                }
            }
        }
    }
}
