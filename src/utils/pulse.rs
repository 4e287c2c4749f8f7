//! Waveform primitives used to build each deflection of a beat.

use crate::types::Real;
use std::f64::consts::TAU;

/// Gaussian bell: `peak * exp(-0.5 * ((t - center) / width)^2)`.
///
/// A zero or negative width yields 0 rather than a division blow-up.
#[inline]
#[must_use]
pub fn pulse(t: Real, peak: Real, center: Real, width: Real) -> Real {
    if width <= 0.0 {
        return 0.0;
    }
    let x = (t - center) / width;
    peak * (-0.5 * x * x).exp()
}

/// Two opposite-signed bells back to back, positive lobe first.
#[inline]
#[must_use]
pub fn biphasic(t: Real, peak: Real, center: Real, width: Real) -> Real {
    pulse(t, peak, center - width, width) - pulse(t, 0.6 * peak, center + width, width)
}

/// Linear ramp from 0 at `start` to `height` at `end`, zero outside.
#[inline]
#[must_use]
pub fn ramp(t: Real, height: Real, start: Real, end: Real) -> Real {
    if end <= start || t < start || t > end {
        return 0.0;
    }
    height * (t - start) / (end - start)
}

/// Saw-tooth in [-1, 1]: slow descent, then a fast return.
///
/// `phase` is in cycles; only its fractional part matters. The first
/// `rise` fraction of every cycle is the rapid upstroke.
#[inline]
#[must_use]
pub fn sawtooth(phase: Real, rise: Real) -> Real {
    let frac = phase.rem_euclid(1.0);
    let rise = rise.clamp(0.01, 0.99);
    if frac < rise {
        -1.0 + 2.0 * frac / rise
    } else {
        1.0 - 2.0 * (frac - rise) / (1.0 - rise)
    }
}

/// Sine with frequency in cycles per strip unit and phase in radians.
#[inline]
#[must_use]
pub fn sinusoid(t: Real, amplitude: Real, frequency: Real, phase: Real) -> Real {
    amplitude * (TAU * frequency * t + phase).sin()
}
