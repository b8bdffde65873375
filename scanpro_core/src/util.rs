//! Common time and unit helpers for scanpro_core.

use std::time::Duration;

/// Smallest sampling interval handed to the sampler thread.
pub const MIN_INTERVAL: Duration = Duration::from_micros(1);

/// Sampling interval for a rate in Hz. Non-finite or non-positive rates
/// clamp to one second; tiny intervals clamp to `MIN_INTERVAL`.
#[inline]
pub fn interval_for_rate(hz: f64) -> Duration {
    if !(hz.is_finite() && hz > 0.0) {
        return Duration::from_secs(1);
    }
    Duration::from_secs_f64(1.0 / hz).max(MIN_INTERVAL)
}

/// Whole steps covering `mm` (truncated toward zero, never negative).
#[inline]
pub fn steps_for_mm(mm: f64, steps_per_mm: f64) -> u32 {
    let s = (mm * steps_per_mm).floor();
    if s.is_finite() && s > 0.0 {
        s.min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// Distance over time in mm/s; `None` when no time elapsed.
#[inline]
pub fn velocity_mm_s(mm: f64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    (secs > 0.0).then(|| mm / secs)
}

#[inline]
pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        None
    } else {
        Some(xs.iter().sum::<f64>() / xs.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_matches_rate() {
        assert_eq!(interval_for_rate(100.0), Duration::from_millis(10));
        assert_eq!(interval_for_rate(0.0), Duration::from_secs(1));
        assert_eq!(interval_for_rate(f64::NAN), Duration::from_secs(1));
        assert_eq!(interval_for_rate(1e12), MIN_INTERVAL);
    }

    #[test]
    fn steps_truncate() {
        let spmm = 200.0 / (2.0 * 3.14 * 10.0);
        assert_eq!(steps_for_mm(110.0, spmm), 350);
        assert_eq!(steps_for_mm(130.0, spmm), 414);
        assert_eq!(steps_for_mm(105.0, spmm), 334);
        assert_eq!(steps_for_mm(-1.0, spmm), 0);
    }

    #[test]
    fn velocity_needs_elapsed_time() {
        assert_eq!(velocity_mm_s(10.0, Duration::ZERO), None);
        assert_eq!(velocity_mm_s(10.0, Duration::from_secs(2)), Some(5.0));
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 3.0]), Some(2.0));
    }
}
