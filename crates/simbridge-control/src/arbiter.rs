//! [`Arbiter`] – per-tick authority resolution.
//!
//! Each call to [`Arbiter::step`] performs one control tick:
//!
//! 1. **Command** – at most one decoded [`Command`] is applied.  `Quit`
//!    ends the loop.  Raw manual controls revoke autonomy and set their own
//!    channel to `raw * multiplier`; `Reverse` additionally reports a cancel
//!    button.  Cruise events toggle autonomy and report their button.
//! 2. **Autonomy** – while engaged, throttle and brake come from the desired
//!    acceleration and steering from the desired angle, limited to
//!    `steer_rate_limit` per tick against the previous output.
//! 3. **Ease-out** – with no fresh command and no autonomy, every channel
//!    runs its [`EaseOut`] hold.
//! 4. **Saturation** – steering is clamped to `±max_steer_angle * steer_ratio`
//!    and the clamped value becomes the reference for the next tick.
//!
//! Authority only changes in step 1, so it is fixed for the whole tick.
//!
//! # Example
//!
//! ```rust
//! use simbridge_control::{Arbiter, ControlParams, TickOutcome};
//! use simbridge_types::{AutonomyFeedback, Command};
//!
//! let mut arbiter = Arbiter::new(ControlParams::default());
//! let feedback = || Ok(AutonomyFeedback::default());
//!
//! match arbiter.step(Some(Command::Throttle(1.0)), feedback).unwrap() {
//!     TickOutcome::Continue(res) => assert!((res.outputs.throttle - 0.7).abs() < 1e-6),
//!     TickOutcome::Quit => unreachable!(),
//! }
//! ```

use simbridge_types::{
    Authority, AutonomyFeedback, BridgeError, Command, ControlOutputs, CruiseButton,
};

use tracing::debug;

use crate::ease_out::{EaseOut, Release};
use crate::params::ControlParams;
use crate::rate_limit::rate_limit;

/// Everything one tick decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub outputs: ControlOutputs,
    pub authority: Authority,
    /// Button pressed on this tick only; `None` on every tick without one.
    pub cruise_button: CruiseButton,
    pub autonomy_engaged: bool,
}

/// Result of one [`Arbiter::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Continue(Resolution),
    Quit,
}

/// Owns the engagement flag and the three [`EaseOut`] channels.
#[derive(Debug, Clone)]
pub struct Arbiter {
    params: ControlParams,
    throttle: EaseOut,
    brake: EaseOut,
    steer: EaseOut,
    autonomy_engaged: bool,
}

impl Arbiter {
    /// A disengaged arbiter with every channel at rest.
    pub fn new(params: ControlParams) -> Self {
        let repeat = params.repeat_count;
        Self {
            throttle: EaseOut::new(repeat, Release::Positive),
            brake: EaseOut::new(repeat, Release::Positive),
            steer: EaseOut::new(repeat, Release::NonZero),
            autonomy_engaged: false,
            params,
        }
    }

    pub fn params(&self) -> &ControlParams {
        &self.params
    }

    pub fn autonomy_engaged(&self) -> bool {
        self.autonomy_engaged
    }

    pub fn authority(&self) -> Authority {
        if self.autonomy_engaged {
            Authority::Autonomous
        } else {
            Authority::Manual
        }
    }

    /// Run one control tick.
    ///
    /// `feedback` is only called while autonomy is authoritative.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `feedback`, and returns
    /// [`BridgeError::InvalidFeedback`] when it yields non-finite setpoints.
    pub fn step<F>(&mut self, command: Option<Command>, feedback: F) -> Result<TickOutcome, BridgeError>
    where
        F: FnOnce() -> Result<AutonomyFeedback, BridgeError>,
    {
        let mut cruise_button = CruiseButton::None;
        let mut outputs = ControlOutputs::default();

        if let Some(command) = command {
            if command == Command::Quit {
                return Ok(TickOutcome::Quit);
            }
            let was_engaged = self.autonomy_engaged;
            cruise_button = self.apply_command(command, &mut outputs);
            if was_engaged != self.autonomy_engaged {
                debug!(?command, authority = ?self.authority(), "authority changed");
            }
        }

        if self.autonomy_engaged {
            let fb = feedback()?;
            if !fb.accel.is_finite() || !fb.steering_angle_deg.is_finite() {
                return Err(BridgeError::InvalidFeedback(format!(
                    "non-finite setpoint accel={} steer={}",
                    fb.accel, fb.steering_angle_deg
                )));
            }
            outputs.throttle = (fb.accel / self.params.accel_to_throttle).clamp(0.0, 1.0);
            outputs.brake = (-fb.accel / self.params.decel_to_brake).clamp(0.0, 1.0);
            outputs.steer = rate_limit(
                self.steer.last(),
                fb.steering_angle_deg,
                self.params.steer_rate_limit,
            );
        } else if command.is_none() {
            outputs.throttle = self.throttle.release();
            outputs.brake = self.brake.release();
            outputs.steer = self.steer.release();
        }

        let limit = self.params.steer_limit();
        outputs.steer = outputs.steer.clamp(-limit, limit);
        outputs.steer_command = (outputs.steer / -limit).clamp(-1.0, 1.0);
        self.steer.set_last(outputs.steer);

        Ok(TickOutcome::Continue(Resolution {
            outputs,
            authority: self.authority(),
            cruise_button,
            autonomy_engaged: self.autonomy_engaged,
        }))
    }

    /// Apply a non-quit command, returning the cruise button it pressed.
    fn apply_command(&mut self, command: Command, outputs: &mut ControlOutputs) -> CruiseButton {
        let p = &self.params;
        let (throttle, brake, steer, button) = match command {
            Command::Throttle(v) => (v * p.throttle_manual_multiplier, 0.0, 0.0, CruiseButton::None),
            Command::Brake(v) => (0.0, v * p.brake_manual_multiplier, 0.0, CruiseButton::None),
            Command::Steer(v) => (0.0, 0.0, v * p.steer_manual_multiplier(), CruiseButton::None),
            Command::Reverse => (0.0, 0.0, 0.0, CruiseButton::Cancel),
            Command::Cruise(kind) => {
                self.autonomy_engaged = kind.engages();
                if self.autonomy_engaged {
                    // Steering keeps its reference so the limiter starts from
                    // the wheel's current position.
                    self.throttle.command(0.0);
                    self.brake.command(0.0);
                    return kind.button();
                }
                (0.0, 0.0, 0.0, kind.button())
            }
            Command::Quit => (0.0, 0.0, 0.0, CruiseButton::None),
        };
        if command.is_manual() {
            self.autonomy_engaged = false;
        }
        self.throttle.command(throttle);
        self.brake.command(brake);
        self.steer.command(steer);
        outputs.throttle = throttle;
        outputs.brake = brake;
        outputs.steer = steer;
        button
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use simbridge_types::CruiseKind;

    const EPS: f32 = 1e-5;

    fn unused() -> Result<AutonomyFeedback, BridgeError> {
        Err(BridgeError::FeedbackUnavailable("not consulted in manual mode".into()))
    }

    fn resolve(
        arbiter: &mut Arbiter,
        command: Option<Command>,
        feedback: AutonomyFeedback,
    ) -> Resolution {
        match arbiter.step(command, || Ok(feedback)).expect("tick must succeed") {
            TickOutcome::Continue(res) => res,
            TickOutcome::Quit => panic!("unexpected quit"),
        }
    }

    fn manual(arbiter: &mut Arbiter, command: Option<Command>) -> Resolution {
        match arbiter.step(command, unused).expect("manual tick must not need feedback") {
            TickOutcome::Continue(res) => res,
            TickOutcome::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn quit_ends_the_loop() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        assert_eq!(arbiter.step(Some(Command::Quit), unused), Ok(TickOutcome::Quit));
    }

    #[test]
    fn idle_tick_is_neutral() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        let res = manual(&mut arbiter, None);
        assert_eq!(res.outputs, ControlOutputs::default());
        assert_eq!(res.authority, Authority::Manual);
        assert_eq!(res.cruise_button, CruiseButton::None);
    }

    #[test]
    fn manual_throttle_then_ease_out() {
        let params = ControlParams::default();
        let repeat = params.repeat_count as usize;
        let mut arbiter = Arbiter::new(params);

        let first = manual(&mut arbiter, Some(Command::Throttle(1.0)));
        assert!((first.outputs.throttle - 0.7).abs() < EPS);

        let released: Vec<f32> = (0..=repeat)
            .map(|_| manual(&mut arbiter, None).outputs.throttle)
            .collect();
        for held in &released[..repeat] {
            assert!((held - 0.7).abs() < EPS);
        }
        assert_eq!(released[repeat], 0.0);
        assert_eq!(manual(&mut arbiter, None).outputs.throttle, 0.0);
    }

    #[test]
    fn manual_brake_is_scaled() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        let res = manual(&mut arbiter, Some(Command::Brake(0.5)));
        assert!((res.outputs.brake - 0.35).abs() < EPS);
        assert_eq!(res.outputs.throttle, 0.0);
    }

    #[test]
    fn manual_steer_is_scaled_and_saturated() {
        let params = ControlParams::default();
        let limit = params.steer_limit();
        let mut arbiter = Arbiter::new(params);

        let small = manual(&mut arbiter, Some(Command::Steer(0.01)));
        assert!((small.outputs.steer - 6.75).abs() < 1e-3);

        let full = manual(&mut arbiter, Some(Command::Steer(-1.0)));
        assert_eq!(full.outputs.steer, -limit);
        assert_eq!(full.outputs.steer_command, 1.0);
    }

    #[test]
    fn steer_release_holds_the_saturated_value() {
        let params = ControlParams::default();
        let limit = params.steer_limit();
        let mut arbiter = Arbiter::new(params);
        manual(&mut arbiter, Some(Command::Steer(1.0)));
        let held = manual(&mut arbiter, None);
        assert_eq!(held.outputs.steer, limit);
        assert_eq!(held.outputs.steer_command, -1.0);
    }

    #[test]
    fn new_command_on_another_channel_cancels_the_hold() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        manual(&mut arbiter, Some(Command::Throttle(1.0)));
        manual(&mut arbiter, Some(Command::Brake(1.0)));
        let res = manual(&mut arbiter, None);
        assert_eq!(res.outputs.throttle, 0.0);
        assert!((res.outputs.brake - 0.7).abs() < EPS);
    }

    #[test]
    fn reverse_reports_cancel_and_disengages() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        resolve(&mut arbiter, Some(Command::Cruise(CruiseKind::Up)), AutonomyFeedback::default());
        let res = manual(&mut arbiter, Some(Command::Reverse));
        assert_eq!(res.cruise_button, CruiseButton::Cancel);
        assert!(!res.autonomy_engaged);
    }

    #[test]
    fn cruise_buttons_only_last_one_tick() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        let fb = AutonomyFeedback::default();
        let pressed = resolve(&mut arbiter, Some(Command::Cruise(CruiseKind::Down)), fb);
        assert_eq!(pressed.cruise_button, CruiseButton::DecelSet);
        let next = resolve(&mut arbiter, None, fb);
        assert_eq!(next.cruise_button, CruiseButton::None);
        assert!(next.autonomy_engaged);
    }

    #[test]
    fn cruise_down_follows_autonomy_feedback() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        let fb = AutonomyFeedback::new(0.8, 10.0);

        let engage = resolve(&mut arbiter, Some(Command::Cruise(CruiseKind::Down)), fb);
        assert_eq!(engage.authority, Authority::Autonomous);

        let mut previous = engage.outputs.steer;
        for _ in 0..3 {
            let res = resolve(&mut arbiter, None, fb);
            assert!((res.outputs.throttle - 0.5).abs() < EPS);
            assert_eq!(res.outputs.brake, 0.0);
            assert!((res.outputs.steer - previous - 0.5).abs() < EPS);
            previous = res.outputs.steer;
        }
        assert!((previous - 2.0).abs() < EPS);
    }

    #[test]
    fn negative_accel_maps_to_brake() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        let res = resolve(
            &mut arbiter,
            Some(Command::Cruise(CruiseKind::Up)),
            AutonomyFeedback::new(-2.0, 0.0),
        );
        assert_eq!(res.outputs.throttle, 0.0);
        assert!((res.outputs.brake - 0.5).abs() < EPS);

        let hard = resolve(&mut arbiter, None, AutonomyFeedback::new(-40.0, 0.0));
        assert_eq!(hard.outputs.brake, 1.0);
    }

    #[test]
    fn engaging_keeps_the_steer_reference() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        manual(&mut arbiter, Some(Command::Steer(0.01)));
        let res = resolve(
            &mut arbiter,
            Some(Command::Cruise(CruiseKind::Down)),
            AutonomyFeedback::new(0.0, 0.0),
        );
        assert!((res.outputs.steer - 6.25).abs() < 1e-3);
    }

    #[test]
    fn manual_input_revokes_autonomy() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        resolve(&mut arbiter, Some(Command::Cruise(CruiseKind::Up)), AutonomyFeedback::new(1.6, 0.0));
        let res = manual(&mut arbiter, Some(Command::Throttle(0.5)));
        assert!(!res.autonomy_engaged);
        assert!((res.outputs.throttle - 0.35).abs() < EPS);
    }

    #[test]
    fn feedback_errors_propagate() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        let err = arbiter
            .step(Some(Command::Cruise(CruiseKind::Down)), unused)
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn non_finite_feedback_is_rejected() {
        let mut arbiter = Arbiter::new(ControlParams::default());
        let err = arbiter
            .step(Some(Command::Cruise(CruiseKind::Down)), || {
                Ok(AutonomyFeedback::new(f32::NAN, 0.0))
            })
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidFeedback(_)));
    }

    fn any_command() -> impl Strategy<Value = Option<Command>> {
        prop_oneof![
            Just(None),
            (-2.0f32..2.0).prop_map(|v| Some(Command::Steer(v))),
            (0.0f32..1.0).prop_map(|v| Some(Command::Throttle(v))),
            (0.0f32..1.0).prop_map(|v| Some(Command::Brake(v))),
            Just(Some(Command::Reverse)),
            Just(Some(Command::Cruise(CruiseKind::Up))),
            Just(Some(Command::Cruise(CruiseKind::Down))),
            Just(Some(Command::Cruise(CruiseKind::Cancel))),
        ]
    }

    fn manual_command() -> impl Strategy<Value = Option<Command>> {
        prop_oneof![
            Just(None),
            (-2.0f32..2.0).prop_map(|v| Some(Command::Steer(v))),
            (-1.0f32..1.0).prop_map(|v| Some(Command::Throttle(v))),
            (-1.0f32..1.0).prop_map(|v| Some(Command::Brake(v))),
            Just(Some(Command::Reverse)),
        ]
    }

    proptest! {
        #[test]
        fn manual_sequences_never_engage(commands in prop::collection::vec(manual_command(), 1..60)) {
            let params = ControlParams::default();
            let limit = params.steer_limit();
            let mut arbiter = Arbiter::new(params.clone());
            for command in commands {
                let res = manual(&mut arbiter, command);
                prop_assert!(!res.autonomy_engaged);
                match command {
                    Some(Command::Throttle(v)) => {
                        prop_assert!((res.outputs.throttle - v * params.throttle_manual_multiplier).abs() < EPS);
                    }
                    Some(Command::Brake(v)) => {
                        prop_assert!((res.outputs.brake - v * params.brake_manual_multiplier).abs() < EPS);
                    }
                    Some(Command::Steer(v)) => {
                        let expected = (v * params.steer_manual_multiplier()).clamp(-limit, limit);
                        prop_assert!((res.outputs.steer - expected).abs() < 1e-3);
                    }
                    _ => {}
                }
            }
        }

        #[test]
        fn steer_always_within_bounds(
            commands in prop::collection::vec(any_command(), 1..80),
            angles in prop::collection::vec(-500.0f32..500.0, 80),
        ) {
            let params = ControlParams::default();
            let limit = params.steer_limit();
            let mut arbiter = Arbiter::new(params);
            for (command, angle) in commands.into_iter().zip(angles) {
                let res = resolve(&mut arbiter, command, AutonomyFeedback::new(0.3, angle));
                prop_assert!(res.outputs.steer.abs() <= limit);
                prop_assert!(res.outputs.steer_command.abs() <= 1.0);
            }
        }

        #[test]
        fn autonomous_steer_is_rate_limited(
            commands in prop::collection::vec(any_command(), 1..80),
            angles in prop::collection::vec(-500.0f32..500.0, 80),
        ) {
            let params = ControlParams::default();
            let step = params.steer_rate_limit;
            let mut arbiter = Arbiter::new(params);
            let mut previous: Option<Resolution> = None;
            for (command, angle) in commands.into_iter().zip(angles) {
                let res = resolve(&mut arbiter, command, AutonomyFeedback::new(0.0, angle));
                if let Some(prev) = previous
                    && prev.autonomy_engaged
                    && res.autonomy_engaged
                {
                    prop_assert!((res.outputs.steer - prev.outputs.steer).abs() <= step + 1e-4);
                }
                previous = Some(res);
            }
        }

        #[test]
        fn cancel_always_disengages(commands in prop::collection::vec(any_command(), 0..40)) {
            let mut arbiter = Arbiter::new(ControlParams::default());
            for command in commands {
                resolve(&mut arbiter, command, AutonomyFeedback::default());
            }
            let res = resolve(
                &mut arbiter,
                Some(Command::Cruise(CruiseKind::Cancel)),
                AutonomyFeedback::default(),
            );
            prop_assert!(!res.autonomy_engaged);
            prop_assert_eq!(res.cruise_button, CruiseButton::Cancel);
            prop_assert_eq!(res.authority, Authority::Manual);
        }
    }
}
