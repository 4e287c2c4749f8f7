//! Voltage synthesis from rhythm definition and cycle state.

use crate::engine::layout::{atrial_p_wave, BeatLayout, PWave, QrsComplex};
use crate::engine::scheduler::CycleState;
use crate::rhythms::{BlockKind, PWaveShape, RhythmClass, RhythmDefinition};
use crate::types::{finite_or_zero, Real, Time, Voltage};
use crate::utils::pulse::{biphasic, pulse, ramp, sawtooth, sinusoid};
use crate::utils::Random;

/// Amplitude of the flutter saw-tooth.
pub const FLUTTER_AMPLITUDE: Real = 0.18;

/// Fraction of each flutter wave spent on the fast upstroke.
pub const FLUTTER_RISE: Real = 0.25;

/// Noise samples per strip unit; noise is constant within one slot.
const NOISE_RESOLUTION: Real = 1000.0;

const WOBBLE_FREQUENCY_SCALE: Real = 0.25;
const WOBBLE_AMPLITUDE: Real = 0.04;

/// Stateless voltage generator.
///
/// `sample` is a pure function of its inputs: the same time, definition
/// and state always produce the same voltage.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoltageSynthesizer;

impl VoltageSynthesizer {
    /// Trace voltage at `time`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sinoatrial::prelude::*;
    ///
    /// let catalog = RhythmCatalog::builtin();
    /// let def = catalog.get("NSR").unwrap();
    /// let scheduler = CycleScheduler::new(def, 0.0, Random::new(1), SchedulerTuning::default());
    /// let state = scheduler.state();
    ///
    /// let r_peak = VoltageSynthesizer::sample(state.duration() * 0.36, def, state);
    /// let baseline = VoltageSynthesizer::sample(state.duration() * 0.05, def, state);
    /// assert!(r_peak > 0.8);
    /// assert!(baseline.abs() < 0.05);
    /// ```
    pub fn sample(time: Time, def: &RhythmDefinition, state: &CycleState) -> Voltage {
        let value = match def.class {
            RhythmClass::Chaos => Self::fibrillation(time, state),
            _ => {
                let progress = state.progress(time);
                let layout = BeatLayout::for_beat(def, state);
                Self::beat(progress, &layout) + Self::atrial_activity(time, def, state)
            }
        };

        finite_or_zero(value + Self::baseline(time, def, state))
    }

    /// Template-mode voltage: the definition's one-beat table interpolated
    /// across the current beat, plus baseline noise.
    ///
    /// Returns `None` when the definition has no usable template. Dropped
    /// beats are flat.
    pub fn sample_template(time: Time, def: &RhythmDefinition, state: &CycleState) -> Option<Voltage> {
        let template = def.template.as_ref()?;
        let value = if state.is_dropped() {
            0.0
        } else {
            template.sample_at(state.progress(time))?
        };
        Some(finite_or_zero(value + Self::baseline(time, def, state)))
    }

    /// Sum of every deflection in the layout at a beat progress.
    pub fn beat(progress: Real, layout: &BeatLayout) -> Voltage {
        let mut v = 0.0;
        if let Some(p) = &layout.p {
            v += p_wave(progress, p);
        }
        if let Some(qrs) = &layout.qrs {
            v += qrs_complex(progress, qrs);
        }
        if let Some(t) = &layout.t {
            v += pulse(progress, t.peak, t.center, t.width);
        }
        v
    }

    fn atrial_activity(time: Time, def: &RhythmDefinition, state: &CycleState) -> Voltage {
        match def.class {
            RhythmClass::Flutter { .. } if state.atrial_period() > 0.0 => {
                let phase = (time - state.atrial_start()) / state.atrial_period();
                -FLUTTER_AMPLITUDE * sawtooth(phase, FLUTTER_RISE)
            }
            RhythmClass::Block {
                kind: BlockKind::Complete { .. },
            } if def.morphology.has_p => p_wave(state.atrial_progress(time), &atrial_p_wave()),
            _ => 0.0,
        }
    }

    fn fibrillation(time: Time, state: &CycleState) -> Voltage {
        let components = state.fibrillation();
        let envelope = 0.75 + 0.25 * sinusoid(time, 1.0, components[0].frequency * 0.1, 0.0);
        let sum: Real = components
            .iter()
            .map(|c| sinusoid(time, c.amplitude, c.frequency, c.phase))
            .sum();
        envelope * sum
    }

    fn baseline(time: Time, def: &RhythmDefinition, state: &CycleState) -> Voltage {
        let mut v = 0.0;
        if def.timing.noise > 0.0 {
            let slot = (time * NOISE_RESOLUTION).round() as i64 as u64;
            v += def.timing.noise * Random::hash_unit(state.noise_seed(), slot);
        }
        if !def.regular && !matches!(def.class, RhythmClass::Chaos) {
            v += state
                .fibrillation()
                .iter()
                .map(|c| {
                    sinusoid(
                        time,
                        WOBBLE_AMPLITUDE * c.amplitude,
                        c.frequency * WOBBLE_FREQUENCY_SCALE,
                        c.phase,
                    )
                })
                .sum::<Real>();
        }
        v
    }
}

fn p_wave(t: Real, p: &PWave) -> Voltage {
    match p.shape {
        PWaveShape::Normal | PWaveShape::Inverted | PWaveShape::Peaked => {
            pulse(t, p.peak, p.center, p.width)
        }
        PWaveShape::Biphasic => biphasic(t, p.peak, p.center, p.width * 0.6),
        PWaveShape::Bifid => {
            let lobe = p.width * 0.6;
            pulse(t, p.peak, p.center - 0.9 * p.width, lobe)
                + pulse(t, p.peak, p.center + 0.9 * p.width, lobe)
        }
    }
}

fn qrs_complex(t: Real, q: &QrsComplex) -> Voltage {
    let mut v: Voltage = q.lobes().iter().map(|lobe| lobe.value(t)).sum();
    if q.delta_wave {
        v += ramp(t, 0.25 * q.height * q.polarity, q.delta_start(), q.center - q.width);
    }
    v
}
