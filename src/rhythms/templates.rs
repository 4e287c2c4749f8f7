//! One-beat waveform tables for template-mode study strips.

use crate::types::{Real, Voltage};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Narrow-complex sinus beat sampled at 40 evenly spaced points.
pub const NORMAL_BEAT: [Real; 40] = [
    0.0, 0.0, 0.0, 0.0, 0.02, 0.08, 0.14, 0.15, 0.10, 0.03, //
    0.0, 0.0, 0.0, -0.05, -0.10, 1.00, -0.25, -0.05, 0.0, 0.0, //
    0.01, 0.03, 0.07, 0.13, 0.22, 0.29, 0.30, 0.24, 0.14, 0.06, //
    0.02, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

/// Wide ventricular complex with a discordant T wave.
pub const WIDE_BEAT: [Real; 40] = [
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
    0.10, 0.40, 0.90, 1.30, 1.10, 0.50, -0.20, -0.40, -0.30, -0.10, //
    0.0, -0.10, -0.20, -0.30, -0.35, -0.30, -0.20, -0.10, 0.0, 0.0, //
    0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
];

/// Relative amplitudes for one full beat, evenly spaced over progress 0..=1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WaveformTemplate {
    samples: Vec<Real>,
}

impl WaveformTemplate {
    /// Creates a template from amplitude samples.
    pub fn new(samples: impl Into<Vec<Real>>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    /// The raw amplitude table.
    pub fn samples(&self) -> &[Real] {
        &self.samples
    }

    /// Checks the table can be interpolated.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.samples.len() < 2 {
            return Err(format!(
                "needs at least 2 samples, got {}",
                self.samples.len()
            ));
        }
        if let Some(idx) = self.samples.iter().position(|v| !v.is_finite()) {
            return Err(format!("sample {} is not finite", idx));
        }
        Ok(())
    }

    /// Linearly interpolated amplitude at a beat progress in [0, 1].
    ///
    /// Returns `None` for a template that fails [`validate`](Self::validate).
    pub fn sample_at(&self, progress: Real) -> Option<Voltage> {
        self.validate().ok()?;

        let last = self.samples.len() - 1;
        let pos = progress.clamp(0.0, 1.0) * last as Real;
        let idx = (pos.floor() as usize).min(last);
        if idx == last {
            return Some(self.samples[last]);
        }
        let frac = pos - idx as Real;
        Some(self.samples[idx] * (1.0 - frac) + self.samples[idx + 1] * frac)
    }
}
