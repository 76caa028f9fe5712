//! Exponential backoff helpers shared by the job-level retry (spec §4.6)
//! and the scheduler's re-arm delay. The step executor has its own copy of
//! this shape (`engine::models::RetryConfig::delay_for_attempt`) because
//! node-level retry is configured per-node, not globally — see DESIGN.md.

use std::time::Duration;

/// `min(initial * multiplier^(attempt-1), max)`, matching the shape of the
/// node-level backoff formula in spec §4.5 but parameterised for queue use.
pub fn exponential(initial: Duration, multiplier: f64, attempt: u32, max: Duration) -> Duration {
    let exp = multiplier.powi(attempt.saturating_sub(1) as i32);
    let millis = (initial.as_millis() as f64 * exp).min(max.as_millis() as f64);
    Duration::from_millis(millis.max(0.0) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_caps_at_max() {
        let d = exponential(Duration::from_millis(100), 2.0, 10, Duration::from_millis(500));
        assert_eq!(d, Duration::from_millis(500));
    }
}
