//! Sample delivery: finite study strips, the live display FIFO, and sinks.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::engine::config::{EctopySettings, SchedulerTuning};
use crate::engine::phase::PhaseClassifier;
use crate::engine::scheduler::CycleScheduler;
use crate::engine::synthesizer::VoltageSynthesizer;
use crate::error::SinoatrialError;
use crate::rhythms::RhythmDefinition;
use crate::types::{PhaseEvent, SamplePoint, Time};
use crate::utils::Random;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Consumer of the engine's two output streams.
///
/// Any renderer (canvas, SVG, terminal plot) or animation collaborator can
/// implement this.
pub trait StripSink {
    /// Receives the next visible sample.
    fn push_sample(&mut self, sample: SamplePoint);

    /// Receives the phase event for the same instant as the last sample.
    fn push_phase(&mut self, event: PhaseEvent);
}

impl<S: StripSink + ?Sized> StripSink for &mut S {
    fn push_sample(&mut self, sample: SamplePoint) {
        (**self).push_sample(sample);
    }

    fn push_phase(&mut self, event: PhaseEvent) {
        (**self).push_phase(event);
    }
}

/// Sink that keeps everything it receives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSink {
    /// Samples in arrival order.
    pub samples: Vec<SamplePoint>,
    /// Phase events in arrival order.
    pub phases: Vec<PhaseEvent>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of samples received.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether nothing has been received.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Drops everything received so far.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.phases.clear();
    }
}

impl StripSink for RecordingSink {
    fn push_sample(&mut self, sample: SamplePoint) {
        self.samples.push(sample);
    }

    fn push_phase(&mut self, event: PhaseEvent) {
        self.phases.push(event);
    }
}

/// How a study strip computes voltages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WaveSource {
    /// Gaussian pulse stacking.
    #[default]
    Synthesized,
    /// Interpolated one-beat template.
    Template,
}

/// Parameters of a study-strip generation run.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StudyParams {
    /// Random seed; negative draws one from the system.
    pub seed: i64,
    /// Voltage source.
    pub source: WaveSource,
    /// Ectopic-beat selection.
    pub ectopy: EctopySettings,
    /// Scheduler tuning.
    pub tuning: SchedulerTuning,
}

impl StudyParams {
    /// Default parameters with the given seed.
    pub fn seeded(seed: i64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }
}

/// A finite, replayable strip of samples and phase events.
///
/// # Example
///
/// ```rust
/// use sinoatrial::prelude::*;
///
/// let catalog = RhythmCatalog::builtin();
/// let strip = StudyStrip::generate(catalog.get("NSR").unwrap(), 125.0, 0.125, &StudyParams::seeded(1));
///
/// assert_eq!(strip.len(), 1000);
/// assert!(strip.samples().iter().all(|s| s.voltage.is_finite()));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StudyStrip {
    samples: Vec<SamplePoint>,
    phases: Vec<PhaseEvent>,
    #[cfg_attr(feature = "serde", serde(skip))]
    cursor: usize,
}

impl StudyStrip {
    /// Generates exactly `round(duration / step)` samples starting at time 0.
    ///
    /// A non-positive or non-finite step or duration yields an empty strip.
    pub fn generate(def: &RhythmDefinition, duration: Time, step: Time, params: &StudyParams) -> Self {
        if !(step.is_finite() && step > 0.0 && duration.is_finite() && duration >= 0.0) {
            warn!(duration, step, rhythm = %def.id, "invalid strip geometry, generating empty strip");
            return Self::default();
        }
        let count = (duration / step).round() as usize;
        Self::run(def, step, params, |index, _| index < count)
    }

    /// Generates samples until `beats` beat boundaries have elapsed.
    pub fn beats(def: &RhythmDefinition, beats: u64, step: Time, params: &StudyParams) -> Self {
        if !(step.is_finite() && step > 0.0) {
            warn!(step, rhythm = %def.id, "invalid strip step, generating empty strip");
            return Self::default();
        }
        Self::run(def, step, params, |_, scheduler| scheduler.state().beats_seen() < beats)
    }

    fn run<F>(def: &RhythmDefinition, step: Time, params: &StudyParams, mut keep_going: F) -> Self
    where
        F: FnMut(usize, &CycleScheduler) -> bool,
    {
        let mut scheduler = CycleScheduler::new(def, 0.0, Random::new(params.seed), params.tuning);
        let mut strip = Self::default();
        let mut template_failed = false;

        let mut index = 0;
        loop {
            let time = index as Time * step;
            scheduler.advance(time, def, &params.ectopy);
            if !keep_going(index, &scheduler) {
                break;
            }

            let state = scheduler.state();
            let voltage = match params.source {
                WaveSource::Synthesized => VoltageSynthesizer::sample(time, def, state),
                WaveSource::Template => {
                    VoltageSynthesizer::sample_template(time, def, state).unwrap_or_else(|| {
                        if !template_failed {
                            let err = SinoatrialError::GenerationError(format!(
                                "rhythm '{}' has no usable waveform template",
                                def.id
                            ));
                            warn!(%err, "drawing flat trace");
                            template_failed = true;
                        }
                        0.0
                    })
                }
            };

            strip.samples.push(SamplePoint::new(time, voltage));
            strip.phases.push(PhaseClassifier::classify(time, def, state));
            index += 1;
        }

        debug!(rhythm = %def.id, samples = strip.samples.len(), "generated study strip");
        strip
    }

    /// All samples.
    pub fn samples(&self) -> &[SamplePoint] {
        &self.samples
    }

    /// All phase events, one per sample.
    pub fn phases(&self) -> &[PhaseEvent] {
        &self.phases
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the strip holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterates over (sample, phase) pairs without moving the cursor.
    pub fn iter(&self) -> impl Iterator<Item = (&SamplePoint, &PhaseEvent)> {
        self.samples.iter().zip(self.phases.iter())
    }

    /// Next pair at the replay cursor, or `None` at the end.
    pub fn next_frame(&mut self) -> Option<(SamplePoint, PhaseEvent)> {
        let sample = *self.samples.get(self.cursor)?;
        let phase = *self.phases.get(self.cursor)?;
        self.cursor += 1;
        Some((sample, phase))
    }

    /// Rewinds the replay cursor.
    pub fn restart(&mut self) {
        self.cursor = 0;
    }

    /// Feeds the whole strip into a sink.
    pub fn replay_into<S: StripSink>(&self, mut sink: S) {
        for (sample, phase) in self.iter() {
            sink.push_sample(*sample);
            sink.push_phase(*phase);
        }
    }
}

/// Display delay line: holds the samples generated but not yet on screen.
///
/// A renderer trails the synthesizer by the width of its window; phase
/// events travel through the same FIFO so the animation matches the
/// visible sample rather than the newest one.
#[derive(Debug, Clone, Default)]
pub struct LiveStream {
    fifo: VecDeque<(SamplePoint, PhaseEvent)>,
    window: usize,
}

impl LiveStream {
    /// Creates a FIFO holding `window` pairs. A zero window passes pairs through.
    pub fn new(window: usize) -> Self {
        Self {
            fifo: VecDeque::with_capacity(window + 1),
            window,
        }
    }

    /// Capacity of the delay line.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Pairs currently buffered.
    pub fn len(&self) -> usize {
        self.fifo.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.fifo.is_empty()
    }

    /// Buffers a freshly generated pair and returns the one leaving the window.
    pub fn push(&mut self, sample: SamplePoint, event: PhaseEvent) -> Option<(SamplePoint, PhaseEvent)> {
        self.fifo.push_back((sample, event));
        if self.fifo.len() > self.window {
            self.fifo.pop_front()
        } else {
            None
        }
    }

    /// Releases every buffered pair, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = (SamplePoint, PhaseEvent)> + '_ {
        self.fifo.drain(..)
    }

    /// Discards buffered pairs.
    pub fn clear(&mut self) {
        self.fifo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{PrematureGroup, PrematurePattern};
    use crate::rhythms::RhythmCatalog;
    use crate::types::CardiacPhase;

    #[test]
    fn test_sample_count_exactness() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("SINUS_BRADY").unwrap();
        for (duration, step) in [(125.0, 0.125), (10.0, 0.3), (1.0, 0.5), (0.0, 0.1)] {
            let strip = StudyStrip::generate(def, duration, step, &StudyParams::seeded(1));
            assert_eq!(strip.len(), (duration / step).round() as usize);
            assert_eq!(strip.phases().len(), strip.len());
        }
    }

    #[test]
    fn test_invalid_step_is_empty() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("NSR").unwrap();
        assert!(StudyStrip::generate(def, 10.0, 0.0, &StudyParams::default()).is_empty());
        assert!(StudyStrip::generate(def, 10.0, Time::NAN, &StudyParams::default()).is_empty());
        assert!(StudyStrip::beats(def, 3, -1.0, &StudyParams::default()).is_empty());
    }

    #[test]
    fn test_beats_covers_requested_boundaries() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("NSR").unwrap();
        let strip = StudyStrip::beats(def, 4, 0.125, &StudyParams::seeded(3));
        let span = strip.samples().last().unwrap().time;
        assert!(span > def.nominal_interval() * 3.5);
        assert!(span < def.nominal_interval() * 4.5);
    }

    #[test]
    fn test_template_source_without_template_is_flat() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("AV1").unwrap();
        assert!(def.template.is_none());
        let params = StudyParams {
            source: WaveSource::Template,
            ..StudyParams::seeded(1)
        };
        let strip = StudyStrip::generate(def, 20.0, 0.5, &params);
        assert_eq!(strip.len(), 40);
        assert!(strip.samples().iter().all(|s| s.voltage == 0.0));
    }

    #[test]
    fn test_replay() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("PVC_MONO").unwrap();
        let params = StudyParams {
            ectopy: EctopySettings::new(PrematurePattern::Bigeminy, PrematureGroup::Single),
            ..StudyParams::seeded(4)
        };
        let mut strip = StudyStrip::generate(def, 50.0, 0.25, &params);
        assert!(strip.phases().iter().any(|p| p.is_premature));

        let first = strip.next_frame().unwrap();
        strip.next_frame();
        strip.restart();
        assert_eq!(strip.next_frame(), Some(first));

        let mut sink = RecordingSink::new();
        strip.replay_into(&mut sink);
        assert_eq!(sink.samples, strip.samples());
        assert_eq!(sink.phases, strip.phases());
    }

    #[test]
    fn test_same_seed_same_strip() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("AFIB").unwrap();
        let a = StudyStrip::generate(def, 60.0, 0.125, &StudyParams::seeded(10));
        let b = StudyStrip::generate(def, 60.0, 0.125, &StudyParams::seeded(10));
        assert_eq!(a, b);
    }

    #[test]
    fn test_live_stream_delays_in_lock_step() {
        let mut stream = LiveStream::new(3);
        let mut released = Vec::new();
        for i in 0..6 {
            let t = i as Time;
            let event = PhaseEvent {
                time: t,
                phase: CardiacPhase::Qrs,
                ..Default::default()
            };
            if let Some(pair) = stream.push(SamplePoint::new(t, 0.0), event) {
                released.push(pair);
            }
        }
        assert_eq!(released.len(), 3);
        for (i, (sample, event)) in released.iter().enumerate() {
            assert_eq!(sample.time, i as Time);
            assert_eq!(event.time, sample.time);
        }
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.drain().count(), 3);
        assert!(stream.is_empty());
    }

    #[test]
    fn test_zero_window_passes_through() {
        let mut stream = LiveStream::new(0);
        let out = stream.push(SamplePoint::new(1.0, 2.0), PhaseEvent::default());
        assert_eq!(out.map(|(s, _)| s.voltage), Some(2.0));
    }
}
