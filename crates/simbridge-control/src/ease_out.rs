//! Ease-out hold for released control inputs.
//!
//! When an operator lets go of a key the command stream simply stops; the
//! channel's command-derived value drops to zero.  Instead of snapping the
//! actuator to neutral, [`EaseOut`] keeps emitting the last nonzero value for
//! `repeat_count` ticks and only then collapses to zero.
//!
//! # Example
//!
//! ```rust
//! use simbridge_control::{EaseOut, Release};
//!
//! let mut throttle = EaseOut::new(2, Release::Positive);
//! throttle.command(0.7);
//!
//! assert_eq!(throttle.release(), 0.7);
//! assert_eq!(throttle.release(), 0.7);
//! assert_eq!(throttle.release(), 0.0); // hold exhausted
//! assert_eq!(throttle.release(), 0.0); // stays neutral
//! ```

/// Which previous values count as "still pressed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Only strictly positive values are held (throttle, brake).
    Positive,
    /// Any nonzero value is held (steering, which is signed).
    NonZero,
}

/// Per-channel hold counter plus the value being held.
#[derive(Debug, Clone, PartialEq)]
pub struct EaseOut {
    repeat_count: u32,
    remaining: u32,
    last: f32,
    release: Release,
}

impl EaseOut {
    /// A channel at rest with a full hold budget.
    pub fn new(repeat_count: u32, release: Release) -> Self {
        Self {
            repeat_count,
            remaining: repeat_count,
            last: 0.0,
            release,
        }
    }

    /// Record the value derived from a fresh command on this tick.
    ///
    /// A nonzero value refills the hold budget; zero (the channel was not the
    /// one commanded) clears the held value without touching the budget.
    pub fn command(&mut self, value: f32) {
        self.last = value;
        if value != 0.0 {
            self.remaining = self.repeat_count;
        }
    }

    /// Output for a tick without a fresh command.
    ///
    /// Returns the held value while budget remains, decrementing it.  On the
    /// tick the budget is found empty the held value collapses to zero and
    /// the budget refills for the next release.
    pub fn release(&mut self) -> f32 {
        if !self.is_holding() {
            return 0.0;
        }
        if self.remaining > 0 {
            self.remaining -= 1;
            self.last
        } else {
            self.remaining = self.repeat_count;
            self.last = 0.0;
            0.0
        }
    }

    /// Overwrite the held value without touching the budget.
    ///
    /// Used to keep the reference value in post-saturation units.
    pub fn set_last(&mut self, value: f32) {
        self.last = value;
    }

    /// Value currently held (the previous tick's output for this channel).
    pub fn last(&self) -> f32 {
        self.last
    }

    /// Hold ticks left before the channel collapses to zero.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    fn is_holding(&self) -> bool {
        match self.release {
            Release::Positive => self.last > 0.0,
            Release::NonZero => self.last != 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_channel_outputs_zero_and_keeps_budget() {
        let mut ch = EaseOut::new(5, Release::Positive);
        for _ in 0..10 {
            assert_eq!(ch.release(), 0.0);
        }
        assert_eq!(ch.remaining(), 5);
    }

    #[test]
    fn holds_for_exactly_repeat_count_ticks() {
        let mut ch = EaseOut::new(5, Release::Positive);
        ch.command(0.7);
        let outputs: Vec<f32> = (0..7).map(|_| ch.release()).collect();
        assert_eq!(outputs, [0.7, 0.7, 0.7, 0.7, 0.7, 0.0, 0.0]);
        assert_eq!(ch.remaining(), 5, "budget refills after collapse");
        assert_eq!(ch.last(), 0.0);
    }

    #[test]
    fn fresh_command_refills_a_partly_spent_budget() {
        let mut ch = EaseOut::new(5, Release::Positive);
        ch.command(0.7);
        ch.release();
        ch.release();
        assert_eq!(ch.remaining(), 3);

        ch.command(0.35);
        assert_eq!(ch.remaining(), 5);
        let held = (0..5).filter(|_| ch.release() == 0.35).count();
        assert_eq!(held, 5);
        assert_eq!(ch.release(), 0.0);
    }

    #[test]
    fn zero_command_drops_the_held_value_immediately() {
        let mut ch = EaseOut::new(5, Release::Positive);
        ch.command(0.7);
        ch.command(0.0);
        assert_eq!(ch.release(), 0.0);
    }

    #[test]
    fn positive_release_ignores_negative_values() {
        let mut ch = EaseOut::new(5, Release::Positive);
        ch.command(-0.7);
        assert_eq!(ch.release(), 0.0);
    }

    #[test]
    fn nonzero_release_holds_negative_values() {
        let mut ch = EaseOut::new(2, Release::NonZero);
        ch.command(-30.0);
        assert_eq!(ch.release(), -30.0);
        assert_eq!(ch.release(), -30.0);
        assert_eq!(ch.release(), 0.0);
    }

    #[test]
    fn zero_repeat_count_collapses_on_first_release() {
        let mut ch = EaseOut::new(0, Release::NonZero);
        ch.command(1.0);
        assert_eq!(ch.release(), 0.0);
        assert_eq!(ch.last(), 0.0);
    }

    #[test]
    fn set_last_keeps_budget() {
        let mut ch = EaseOut::new(5, Release::NonZero);
        ch.command(60.0);
        ch.release();
        ch.set_last(47.0);
        assert_eq!(ch.remaining(), 4);
        assert_eq!(ch.release(), 47.0);
    }
}
