//! Beat-boundary state machine.
//!
//! The scheduler owns the only mutable simulation state. Everything
//! downstream (layout, synthesis, phase classification) reads a
//! [`CycleState`] and never writes to it.

use std::f64::consts::TAU;

use tracing::{trace, warn};

use crate::engine::config::{EctopySettings, SchedulerTuning};
use crate::rhythms::{BlockKind, EctopicKind, RhythmClass, RhythmDefinition};
use crate::types::{interval_for_rate, Real, Time, MIN_DURATION};
use crate::utils::Random;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sinusoids summed to draw ventricular fibrillation.
pub const FIB_COMPONENTS: usize = 5;

/// Number of beats in one Wenckebach cycle (three conducted, one dropped).
pub const WENCKEBACH_CYCLE: u8 = 4;

/// One randomly drawn sinusoid of a fibrillation trace.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FibComponent {
    /// Cycles per strip unit.
    pub frequency: Real,
    /// Peak amplitude.
    pub amplitude: Real,
    /// Phase offset in radians.
    pub phase: Real,
}

impl FibComponent {
    fn draw(rng: &mut Random) -> Self {
        Self {
            frequency: rng.get_real64_range(0.16, 0.30),
            amplitude: rng.get_real64_range(0.2, 0.4),
            phase: rng.get_real64_range(0.0, TAU),
        }
    }
}

/// Mutable per-rhythm simulation state.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CycleState {
    pub(crate) cycle_start: Time,
    pub(crate) duration: Time,
    pub(crate) beats_seen: u64,
    pub(crate) wenckebach_count: u8,
    pub(crate) mobitz_drops: u64,
    pub(crate) normal_run: u32,
    pub(crate) group_remaining: u8,
    pub(crate) is_premature: bool,
    pub(crate) is_dropped: bool,
    pub(crate) is_paused: bool,
    pub(crate) pr_extension: Real,
    pub(crate) morphology_seed: u64,
    pub(crate) atrial_start: Time,
    pub(crate) atrial_period: Time,
    pub(crate) atrial_beats: u64,
    pub(crate) fibrillation: [FibComponent; FIB_COMPONENTS],
    pub(crate) noise_seed: u64,
}

impl CycleState {
    /// Start time of the beat in progress.
    pub fn cycle_start(&self) -> Time {
        self.cycle_start
    }

    /// Duration of the beat in progress.
    pub fn duration(&self) -> Time {
        self.duration
    }

    /// Fraction of the current beat elapsed at `time`, clamped to [0, 1].
    pub fn progress(&self, time: Time) -> Real {
        if self.duration <= 0.0 {
            return 0.0;
        }
        let p = (time - self.cycle_start) / self.duration;
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Beat boundaries crossed since the last reset.
    pub fn beats_seen(&self) -> u64 {
        self.beats_seen
    }

    /// Position within the Wenckebach cycle (0-3).
    pub fn wenckebach_count(&self) -> u8 {
        self.wenckebach_count
    }

    /// Mobitz II beats dropped since the last reset.
    pub fn mobitz_drops(&self) -> u64 {
        self.mobitz_drops
    }

    /// Normal beats since the last ectopic group.
    pub fn normal_run(&self) -> u32 {
        self.normal_run
    }

    /// Forced premature beats still to come in the current group.
    pub fn group_remaining(&self) -> u8 {
        self.group_remaining
    }

    /// Current beat arrived early.
    pub fn is_premature(&self) -> bool {
        self.is_premature
    }

    /// Current beat has no ventricular response.
    pub fn is_dropped(&self) -> bool {
        self.is_dropped
    }

    /// Current beat is a sinus pause.
    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    /// PR prolongation of the current beat, as a beat fraction.
    pub fn pr_extension(&self) -> Real {
        self.pr_extension
    }

    /// Seed selecting the shape of ventricular ectopic beats.
    pub fn morphology_seed(&self) -> u64 {
        self.morphology_seed
    }

    /// Start of the current atrial cycle (complete block and flutter).
    pub fn atrial_start(&self) -> Time {
        self.atrial_start
    }

    /// Period of the independent atrial clock.
    pub fn atrial_period(&self) -> Time {
        self.atrial_period
    }

    /// Atrial cycles completed since the last reset.
    pub fn atrial_beats(&self) -> u64 {
        self.atrial_beats
    }

    /// Fraction of the current atrial cycle elapsed at `time`.
    pub fn atrial_progress(&self, time: Time) -> Real {
        if self.atrial_period <= 0.0 {
            return 0.0;
        }
        let p = (time - self.atrial_start) / self.atrial_period;
        if p.is_finite() {
            p.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Sinusoids drawn at reset for fibrillation and irregular baseline wobble.
    pub fn fibrillation(&self) -> &[FibComponent; FIB_COMPONENTS] {
        &self.fibrillation
    }

    /// Seed of the hashed baseline noise.
    pub fn noise_seed(&self) -> u64 {
        self.noise_seed
    }
}

/// Decides, at each beat boundary, what the next beat is and how long it lasts.
///
/// # Example
///
/// ```rust
/// use sinoatrial::prelude::*;
///
/// let catalog = RhythmCatalog::builtin();
/// let def = catalog.get("AV2_WENCKEBACH").unwrap();
/// let ectopy = EctopySettings::default();
///
/// let mut scheduler = CycleScheduler::new(def, 0.0, Random::new(1), SchedulerTuning::default());
/// let mut dropped = 0;
/// let mut now = 0.0;
/// for _ in 0..8 {
///     now += scheduler.state().duration();
///     scheduler.advance(now, def, &ectopy);
///     if scheduler.state().is_dropped() {
///         dropped += 1;
///     }
/// }
/// assert_eq!(dropped, 2);
/// ```
#[derive(Debug, Clone)]
pub struct CycleScheduler {
    state: CycleState,
    rng: Random,
    tuning: SchedulerTuning,
}

impl CycleScheduler {
    /// Creates a scheduler whose first beat starts at `now`.
    pub fn new(def: &RhythmDefinition, now: Time, rng: Random, tuning: SchedulerTuning) -> Self {
        let mut scheduler = Self {
            state: CycleState::default(),
            rng,
            tuning,
        };
        scheduler.reset(def, now);
        scheduler
    }

    /// Current state, read-only.
    pub fn state(&self) -> &CycleState {
        &self.state
    }

    /// Active tuning.
    pub fn tuning(&self) -> &SchedulerTuning {
        &self.tuning
    }

    /// Replaces the tuning; affects future boundaries only.
    pub fn set_tuning(&mut self, tuning: SchedulerTuning) {
        self.tuning = tuning;
    }

    /// The random source, for inspecting seed and step count.
    pub fn rng(&self) -> &Random {
        &self.rng
    }

    /// Zeroes every counter and starts a fresh beat at `now`.
    pub fn reset(&mut self, def: &RhythmDefinition, now: Time) {
        let now = if now.is_finite() { now } else { 0.0 };
        let mut fibrillation = [FibComponent::default(); FIB_COMPONENTS];
        for component in fibrillation.iter_mut() {
            *component = FibComponent::draw(&mut self.rng);
        }

        self.state = CycleState {
            cycle_start: now,
            atrial_start: now,
            atrial_period: atrial_period(def),
            fibrillation,
            noise_seed: self.rng.get_uint64(),
            morphology_seed: self.rng.get_uint64(),
            ..CycleState::default()
        };
        let duration = self.base_duration(def);
        self.state.duration = sanitize_duration(duration, def);
        if let RhythmClass::Block {
            kind: BlockKind::FirstDegree { pr_delay },
        } = def.class
        {
            self.state.pr_extension = pr_delay;
        }
    }

    /// Runs every beat boundary that elapsed before `now`.
    ///
    /// Returns the number of boundaries crossed. After
    /// `tuning.max_catch_up` boundaries in one call the cycle start snaps to
    /// `now` so a long host stall cannot spin the loop.
    pub fn advance(&mut self, now: Time, def: &RhythmDefinition, ectopy: &EctopySettings) -> u32 {
        if !now.is_finite() {
            warn!(now, "ignoring non-finite simulation time");
            return 0;
        }

        self.advance_atrial_clock(now);

        let mut crossed = 0;
        while now - self.state.cycle_start >= self.state.duration {
            if crossed >= self.tuning.max_catch_up {
                warn!(crossed, now, "beat catch-up limit reached, snapping cycle start");
                self.state.cycle_start = now;
                break;
            }
            self.state.cycle_start += self.state.duration;
            self.boundary(def, ectopy);
            crossed += 1;
        }
        crossed
    }

    fn advance_atrial_clock(&mut self, now: Time) {
        let period = self.state.atrial_period;
        if period <= 0.0 {
            return;
        }
        let mut steps = 0;
        while now - self.state.atrial_start >= period {
            if steps >= self.tuning.max_catch_up {
                self.state.atrial_start = now;
                break;
            }
            self.state.atrial_start += period;
            self.state.atrial_beats += 1;
            steps += 1;
        }
    }

    fn boundary(&mut self, def: &RhythmDefinition, ectopy: &EctopySettings) {
        let was_premature = self.state.is_premature;
        let state = &mut self.state;
        state.is_dropped = false;
        state.is_paused = false;
        state.is_premature = false;
        state.pr_extension = 0.0;
        state.beats_seen += 1;

        let mut duration = self.base_duration(def);

        match def.class {
            RhythmClass::Ectopic { kind } => {
                if self.premature_due(was_premature, ectopy) {
                    self.state.is_premature = true;
                    duration = def.nominal_interval() * self.tuning.premature_coupling;
                    if kind == EctopicKind::PvcPoly {
                        self.state.morphology_seed = self.rng.get_uint64();
                    }
                }
            }
            RhythmClass::Block { kind } => match kind {
                BlockKind::FirstDegree { pr_delay } => {
                    self.state.pr_extension = pr_delay;
                }
                BlockKind::Wenckebach { pr_step } => {
                    let count = (self.state.wenckebach_count + 1) % WENCKEBACH_CYCLE;
                    self.state.wenckebach_count = count;
                    if count == WENCKEBACH_CYCLE - 1 {
                        self.state.is_dropped = true;
                    } else {
                        self.state.pr_extension = count as Real * pr_step;
                    }
                }
                BlockKind::MobitzII => {
                    if self.rng.get_bool_with_prob(self.tuning.mobitz_drop_probability) {
                        self.state.is_dropped = true;
                        self.state.mobitz_drops += 1;
                    }
                }
                // The atrial clock runs on its own in `advance_atrial_clock`.
                BlockKind::Complete { .. } => {}
            },
            RhythmClass::SickSinus => {
                if self.rng.get_bool_with_prob(self.tuning.sinus_pause_probability) {
                    self.state.is_paused = true;
                    duration *= self.tuning.sinus_pause_factor;
                }
            }
            RhythmClass::Normal | RhythmClass::Chaos | RhythmClass::Flutter { .. } => {}
        }

        self.state.duration = sanitize_duration(duration, def);

        trace!(
            rhythm = %def.id,
            beat = self.state.beats_seen,
            duration = self.state.duration,
            premature = self.state.is_premature,
            dropped = self.state.is_dropped,
            paused = self.state.is_paused,
            "beat boundary"
        );
    }

    /// Applies the ectopic pattern rule and updates the group counters.
    fn premature_due(&mut self, was_premature: bool, ectopy: &EctopySettings) -> bool {
        if !was_premature {
            self.state.normal_run = self.state.normal_run.saturating_add(1);
        }

        if self.state.group_remaining > 0 {
            self.state.group_remaining -= 1;
            return true;
        }

        let triggered = match ectopy.pattern.normal_beats_between() {
            None => self
                .rng
                .get_bool_with_prob(self.tuning.random_premature_probability),
            Some(between) => self.state.normal_run >= between,
        };

        if triggered {
            self.state.normal_run = 0;
            self.state.group_remaining = ectopy.group.size().saturating_sub(1);
        }
        triggered
    }

    /// Duration of an ordinary beat: jittered nominal, or a whole number of
    /// flutter waves.
    fn base_duration(&mut self, def: &RhythmDefinition) -> Time {
        let nominal = def.nominal_interval();

        if let RhythmClass::Flutter { conduction_ratio } = def.class {
            let ratio = conduction_ratio.max(2);
            let waves = if def.regular {
                ratio
            } else {
                let low = ratio.saturating_sub(1).max(2);
                let high = ratio.saturating_add(1);
                let span = u64::from(high) - u64::from(low) + 1;
                low + (self.rng.get_uint64() % span) as u32
            };
            return self.state.atrial_period * waves as Real;
        }

        let mut jitter = def.timing.jitter;
        if !def.regular {
            jitter = (jitter * self.tuning.irregular_jitter_scale).min(0.9);
        }
        if jitter <= 0.0 {
            return nominal;
        }
        nominal * (1.0 + jitter * self.rng.signed_unit())
    }
}

fn atrial_period(def: &RhythmDefinition) -> Time {
    match def.class {
        RhythmClass::Block {
            kind: BlockKind::Complete { atrial_rate },
        } => interval_for_rate(atrial_rate),
        RhythmClass::Flutter { conduction_ratio } => {
            def.nominal_interval() / conduction_ratio.max(2) as Real
        }
        _ => 0.0,
    }
}

fn sanitize_duration(duration: Time, def: &RhythmDefinition) -> Time {
    if duration.is_finite() {
        duration.max(MIN_DURATION)
    } else {
        warn!(rhythm = %def.id, "non-finite beat duration, using nominal interval");
        def.nominal_interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::{PrematureGroup, PrematurePattern};
    use crate::rhythms::RhythmCatalog;

    fn run(id: &str, ectopy: EctopySettings, beats: usize, seed: i64) -> Vec<CycleState> {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get(id).unwrap();
        let mut scheduler = CycleScheduler::new(def, 0.0, Random::new(seed), SchedulerTuning::default());
        let mut states = vec![scheduler.state().clone()];
        for _ in 1..beats {
            let next = scheduler.state().cycle_start() + scheduler.state().duration();
            assert_eq!(scheduler.advance(next, def, &ectopy), 1);
            states.push(scheduler.state().clone());
        }
        states
    }

    #[test]
    fn test_bigeminy_alternates() {
        let ectopy = EctopySettings::new(PrematurePattern::Bigeminy, PrematureGroup::Single);
        let states = run("PVC_MONO", ectopy, 20, 3);
        for (i, state) in states.iter().enumerate() {
            assert_eq!(state.is_premature(), i % 2 == 1, "beat {}", i);
        }
    }

    #[test]
    fn test_trigeminy_couplet_cadence() {
        let ectopy = EctopySettings::new(PrematurePattern::Trigeminy, PrematureGroup::Couplet);
        let flags: Vec<bool> = run("PAC_HIGH", ectopy, 12, 5)
            .iter()
            .map(CycleState::is_premature)
            .collect();
        // N N P P N N P P ...
        let expected: Vec<bool> = (0..12).map(|i| i % 4 >= 2).collect();
        assert_eq!(flags, expected);
    }

    #[test]
    fn test_premature_beats_are_shortened() {
        let ectopy = EctopySettings::new(PrematurePattern::Bigeminy, PrematureGroup::Single);
        let states = run("PAC_MID", ectopy, 6, 9);
        let nominal = interval_for_rate(72.0);
        for state in states.iter().filter(|s| s.is_premature()) {
            assert!((state.duration() - nominal * 0.6).abs() < 1e-9);
        }
    }

    #[test]
    fn test_polymorphic_pvcs_reseed() {
        let ectopy = EctopySettings::new(PrematurePattern::Bigeminy, PrematureGroup::Single);
        let seeds: Vec<u64> = run("PVC_POLY", ectopy, 10, 11)
            .iter()
            .filter(|s| s.is_premature())
            .map(CycleState::morphology_seed)
            .collect();
        assert!(seeds.windows(2).any(|w| w[0] != w[1]));

        let mono: Vec<u64> = run("PVC_MONO", ectopy, 10, 11)
            .iter()
            .map(CycleState::morphology_seed)
            .collect();
        assert!(mono.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn test_wenckebach_cycle() {
        let states = run("AV2_WENCKEBACH", EctopySettings::default(), 12, 1);
        for window in states.windows(4) {
            assert_eq!(window.iter().filter(|s| s.is_dropped()).count(), 1);
        }
        for cycle in states.chunks(4) {
            assert!(cycle[0].pr_extension() < cycle[1].pr_extension());
            assert!(cycle[1].pr_extension() < cycle[2].pr_extension());
            assert!(cycle[3].is_dropped());
        }
    }

    #[test]
    fn test_first_degree_constant_pr() {
        let states = run("AV1", EctopySettings::default(), 5, 1);
        assert!(states.iter().all(|s| (s.pr_extension() - 0.08).abs() < 1e-12));
        assert!(states.iter().all(|s| !s.is_dropped()));
    }

    #[test]
    fn test_mobitz_drops_counted() {
        let states = run("AV2_MOBITZ", EctopySettings::default(), 200, 4);
        let dropped = states.iter().filter(|s| s.is_dropped()).count() as u64;
        assert_eq!(states.last().unwrap().mobitz_drops(), dropped);
        assert!(dropped > 20 && dropped < 100);
        assert!(states.iter().all(|s| s.pr_extension() == 0.0));
    }

    #[test]
    fn test_regular_jitter_bound() {
        let states = run("NSR", EctopySettings::default(), 100, 8);
        let nominal = interval_for_rate(70.0);
        for state in &states {
            assert!((state.duration() - nominal).abs() <= nominal * 0.02 + 1e-9);
        }
    }

    #[test]
    fn test_regular_flutter_locks_to_waves() {
        let states = run("AFL", EctopySettings::default(), 10, 2);
        for state in &states {
            assert!((state.duration() / state.atrial_period() - 3.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_irregular_flutter_varies_ratio() {
        let def = RhythmDefinition::new("AFL_VAR", "Variable Flutter", 100.0, RhythmClass::Flutter { conduction_ratio: 4 })
            .irregular();
        def.validate().unwrap();
        let mut scheduler = CycleScheduler::new(&def, 0.0, Random::new(6), SchedulerTuning::default());
        let mut ratios = Vec::new();
        for _ in 0..60 {
            let state = scheduler.state();
            let waves = state.duration() / state.atrial_period();
            assert!((waves - waves.round()).abs() < 1e-9);
            ratios.push(waves.round() as u32);
            let next = state.cycle_start() + state.duration();
            scheduler.advance(next, &def, &EctopySettings::default());
        }
        assert!(ratios.iter().all(|r| (3..=5).contains(r)));
        assert!(ratios.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_unvalidated_flutter_ratio_does_not_overflow() {
        let def = RhythmDefinition::new("AFL_X", "Flutter", 100.0, RhythmClass::Flutter { conduction_ratio: u32::MAX })
            .irregular();
        let mut scheduler = CycleScheduler::new(&def, 0.0, Random::new(4), SchedulerTuning::default());
        for i in 1..20 {
            scheduler.advance(i as Time * 10.0, &def, &EctopySettings::default());
            let duration = scheduler.state().duration();
            assert!(duration.is_finite());
            assert!(duration >= MIN_DURATION);
        }
    }

    #[test]
    fn test_complete_block_atrial_clock() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("AV3").unwrap();
        let mut scheduler = CycleScheduler::new(def, 0.0, Random::new(1), SchedulerTuning::default());
        let period = interval_for_rate(80.0);
        assert!((scheduler.state().atrial_period() - period).abs() < 1e-12);

        scheduler.advance(period * 10.5, def, &EctopySettings::default());
        assert_eq!(scheduler.state().atrial_beats(), 10);
        assert!((scheduler.state().atrial_start() - period * 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_sinus_pause_always_fires_when_certain() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("SSS").unwrap();
        let tuning = SchedulerTuning {
            sinus_pause_probability: 1.0,
            ..Default::default()
        };
        let mut scheduler = CycleScheduler::new(def, 0.0, Random::new(1), tuning);
        let next = scheduler.state().duration();
        scheduler.advance(next, def, &EctopySettings::default());
        assert!(scheduler.state().is_paused());
        assert!(scheduler.state().duration() > def.nominal_interval() * 2.0);
    }

    #[test]
    fn test_catch_up_is_bounded() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("NSR").unwrap();
        let mut scheduler = CycleScheduler::new(def, 0.0, Random::new(1), SchedulerTuning::default());
        let crossed = scheduler.advance(1.0e7, def, &EctopySettings::default());
        assert_eq!(crossed, 64);
        assert_eq!(scheduler.state().cycle_start(), 1.0e7);
        assert_eq!(scheduler.advance(Real::NAN, def, &EctopySettings::default()), 0);
    }

    #[test]
    fn test_progress_is_clamped() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("NSR").unwrap();
        let scheduler = CycleScheduler::new(def, 10.0, Random::new(1), SchedulerTuning::default());
        let state = scheduler.state();
        assert_eq!(state.progress(5.0), 0.0);
        assert_eq!(state.progress(1.0e6), 1.0);
        let mid = state.progress(10.0 + state.duration() / 2.0);
        assert!((mid - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_reset_zeroes_counters() {
        let catalog = RhythmCatalog::builtin();
        let def = catalog.get("AV2_WENCKEBACH").unwrap();
        let mut scheduler = CycleScheduler::new(def, 0.0, Random::new(1), SchedulerTuning::default());
        scheduler.advance(100.0, def, &EctopySettings::default());
        assert!(scheduler.state().beats_seen() > 0);

        scheduler.reset(def, 100.0);
        assert_eq!(scheduler.state().beats_seen(), 0);
        assert_eq!(scheduler.state().wenckebach_count(), 0);
        assert_eq!(scheduler.state().cycle_start(), 100.0);
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let a: Vec<Time> = run("AFIB", EctopySettings::default(), 30, 77)
            .iter()
            .map(CycleState::duration)
            .collect();
        let b: Vec<Time> = run("AFIB", EctopySettings::default(), 30, 77)
            .iter()
            .map(CycleState::duration)
            .collect();
        assert_eq!(a, b);
    }
}
