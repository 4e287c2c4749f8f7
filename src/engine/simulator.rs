//! Tick-driven live simulation.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::config::{SimulationConfig, SimulatorParams};
use crate::engine::phase::PhaseClassifier;
use crate::engine::scheduler::{CycleScheduler, CycleState};
use crate::engine::stream::{LiveStream, StripSink};
use crate::engine::synthesizer::VoltageSynthesizer;
use crate::rhythms::{RhythmCatalog, RhythmClass, RhythmDefinition};
use crate::types::{SamplePoint, Time};
use crate::utils::{RateMeter, Random};

/// Live simulation owned by a host loop.
///
/// The host calls [`tick`](Self::tick) (or [`frame`](Self::frame)) with the
/// elapsed step; configuration changes are staged with
/// [`configure`](Self::configure) and applied whole at the start of the
/// next tick.
#[derive(Debug)]
pub struct Simulator {
    catalog: Arc<RhythmCatalog>,
    config: SimulationConfig,
    pending: Option<SimulationConfig>,
    definition: RhythmDefinition,
    scheduler: CycleScheduler,
    stream: LiveStream,
    meter: RateMeter,
    params: SimulatorParams,
    now: Time,
}

impl Simulator {
    /// Creates a simulator at time 0.
    ///
    /// An unknown rhythm id falls back to the catalog default.
    pub fn new(catalog: Arc<RhythmCatalog>, config: SimulationConfig, params: SimulatorParams) -> Self {
        let definition = catalog.get_or_default(&config.rhythm_id).clone();
        let config = SimulationConfig {
            rhythm_id: definition.id.clone(),
            ..config
        };
        let scheduler = CycleScheduler::new(&definition, 0.0, Random::new(params.seed), params.tuning);
        debug!(rhythm = %definition.id, class = definition.class.tag(), "simulator created");

        Self {
            catalog,
            config,
            pending: None,
            definition,
            scheduler,
            stream: LiveStream::new(params.window_samples),
            meter: RateMeter::new(params.rate_window),
            params,
            now: 0.0,
        }
    }

    /// Stages a configuration; it takes effect at the next tick.
    pub fn configure(&mut self, config: SimulationConfig) {
        self.pending = Some(config);
    }

    /// Stages a rhythm change, keeping every other option.
    pub fn select_rhythm(&mut self, rhythm_id: &str) {
        let mut next = self.pending.take().unwrap_or_else(|| self.config.clone());
        next.rhythm_id = rhythm_id.to_string();
        self.pending = Some(next);
    }

    fn apply_pending(&mut self) {
        let Some(next) = self.pending.take() else {
            return;
        };

        let rhythm_changed = !next.rhythm_id.eq_ignore_ascii_case(&self.config.rhythm_id);
        let mut next = next;
        if rhythm_changed {
            let definition = self.catalog.get_or_default(&next.rhythm_id).clone();
            next.rhythm_id = definition.id.clone();
            if definition.id != self.definition.id {
                self.scheduler.reset(&definition, self.now);
                self.meter.clear();
                debug!(
                    from = %self.definition.id,
                    to = %definition.id,
                    class = definition.class.tag(),
                    "rhythm changed, scheduler reset"
                );
                self.definition = definition;
            }
        }

        debug!(
            paper_speed = next.paper_speed.mm_per_second(),
            scroll_speed = ?next.scroll_speed,
            pattern = ?next.ectopy.pattern,
            group = ?next.ectopy.group,
            "configuration applied"
        );
        self.config = next;
    }

    /// Advances the simulation by `dt` (before paper-speed scaling) and
    /// emits at most one sample/phase pair to `sink`.
    ///
    /// Returns `true` if a pair left the display window.
    pub fn tick<S: StripSink>(&mut self, dt: Time, mut sink: S) -> bool {
        self.apply_pending();

        let step = dt * self.config.paper_speed.step_scale();
        if !step.is_finite() || step < 0.0 {
            warn!(dt, "ignoring invalid tick step");
            return false;
        }

        self.now += step;
        let crossed = self.scheduler.advance(self.now, &self.definition, &self.config.ectopy);
        let state = self.scheduler.state();
        if crossed > 0 && !state.is_dropped() && !matches!(self.definition.class, RhythmClass::Chaos) {
            self.meter.record_beat(state.cycle_start());
        }

        let sample = SamplePoint::new(self.now, VoltageSynthesizer::sample(self.now, &self.definition, state));
        let event = PhaseClassifier::classify(self.now, &self.definition, state);

        match self.stream.push(sample, event) {
            Some((sample, event)) => {
                sink.push_sample(sample);
                sink.push_phase(event);
                true
            }
            None => false,
        }
    }

    /// Runs one animation frame: as many ticks as the scroll speed asks for.
    ///
    /// Returns the number of pairs emitted.
    pub fn frame<S: StripSink>(&mut self, dt: Time, mut sink: S) -> usize {
        self.apply_pending();
        let ticks = self.config.scroll_speed.ticks_per_frame();
        (0..ticks).filter(|_| self.tick(dt, &mut sink)).count()
    }

    /// Simulated time of the newest generated sample.
    pub fn now(&self) -> Time {
        self.now
    }

    /// Rhythm currently simulated.
    pub fn definition(&self) -> &RhythmDefinition {
        &self.definition
    }

    /// Scheduler state of the beat in progress.
    pub fn state(&self) -> &CycleState {
        self.scheduler.state()
    }

    /// Configuration in effect (staged changes excluded).
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Construction parameters.
    pub fn params(&self) -> &SimulatorParams {
        &self.params
    }

    /// Pairs generated but not yet visible.
    pub fn buffered(&self) -> usize {
        self.stream.len()
    }

    /// Textual current-rate label, e.g. `"72 bpm"`; `"---"` when no rate
    /// can be measured.
    pub fn bpm_label(&self) -> String {
        if matches!(self.definition.class, RhythmClass::Chaos) {
            return "---".to_string();
        }
        self.meter.label()
    }
}
