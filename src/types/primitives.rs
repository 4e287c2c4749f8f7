//! Primitive type definitions and the strip time base.
//!
//! All engine times are expressed in *strip units*: one unit is one millimetre
//! of paper at the standard 25 mm/s, i.e. 40 ms. This keeps the numbers that
//! clinicians read off a strip ("one small box") directly usable in code.

/// Default floating point type used throughout the engine.
pub type Real = f64;

/// A point in simulated time, in strip units.
pub type Time = Real;

/// An instantaneous trace value, in millivolt-like relative units.
pub type Voltage = Real;

/// Heart rate in beats per minute.
pub type Bpm = Real;

/// Strip units elapsed per second of simulated time.
pub const UNITS_PER_SECOND: Real = 25.0;

/// Strip units elapsed per minute of simulated time.
pub const UNITS_PER_MINUTE: Real = UNITS_PER_SECOND * 60.0;

/// Shortest beat duration the scheduler will ever produce (strip units).
pub const MIN_DURATION: Time = 1.0;

/// Epsilon for floating point comparisons.
pub const EPSILON: Real = 1e-9;

/// Returns the nominal inter-beat interval for a rate, in strip units.
///
/// Non-positive or non-finite rates map to [`MIN_DURATION`].
#[must_use]
pub fn interval_for_rate(bpm: Bpm) -> Time {
    if !bpm.is_finite() || bpm <= 0.0 {
        return MIN_DURATION;
    }
    (UNITS_PER_MINUTE / bpm).max(MIN_DURATION)
}

/// Returns the heart rate implied by an inter-beat interval.
#[must_use]
pub fn rate_for_interval(interval: Time) -> Bpm {
    if !interval.is_finite() || interval <= 0.0 {
        return 0.0;
    }
    UNITS_PER_MINUTE / interval
}

/// Replaces NaN and infinities with zero.
#[inline]
#[must_use]
pub fn finite_or_zero(value: Real) -> Real {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
