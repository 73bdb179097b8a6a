//! Per-tick step limiter for the steering setpoint.
//!
//! # Example
//!
//! ```rust
//! use simbridge_control::rate_limit;
//!
//! assert_eq!(rate_limit(0.0, 3.0, 0.5), 0.5);
//! assert_eq!(rate_limit(0.0, -3.0, 0.5), -0.5);
//! assert_eq!(rate_limit(1.0, 1.2, 0.5), 1.2);
//! ```

/// Clamp the move from `previous` to `proposed` to at most `max_step`.
///
/// Returns `previous ± max_step` when the proposal is further away than one
/// step, otherwise the proposal unchanged.
pub fn rate_limit(previous: f32, proposed: f32, max_step: f32) -> f32 {
    if proposed > previous + max_step {
        previous + max_step
    } else if proposed < previous - max_step {
        previous - max_step
    } else {
        proposed
    }
}
