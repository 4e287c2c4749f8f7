//! Host-facing behavior of the tick-driven simulator.
//!
//! Run with: `cargo test --test simulator_behaviour`

use sinoatrial::prelude::*;
use std::sync::Arc;

fn simulator(rhythm: &str, window: usize, seed: i64) -> Simulator {
    Simulator::new(
        Arc::new(RhythmCatalog::builtin()),
        SimulationConfig::for_rhythm(rhythm),
        SimulatorParams {
            seed,
            window_samples: window,
            ..Default::default()
        },
    )
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_paper_speed_change_only_affects_later_samples() {
    let mut sim = simulator("NSR", 0, 1);
    let mut sink = RecordingSink::new();
    for _ in 0..100 {
        sim.tick(0.125, &mut sink);
    }
    let before = sink.samples.clone();

    sim.configure(SimulationConfig {
        paper_speed: PaperSpeed::Mm100,
        ..sim.config().clone()
    });
    for _ in 0..100 {
        sim.tick(0.125, &mut sink);
    }

    assert_eq!(&sink.samples[..100], &before[..]);
    for pair in sink.samples[..100].windows(2) {
        assert!((pair[1].time - pair[0].time - 0.125).abs() < 1e-9);
    }
    for pair in sink.samples[100..].windows(2) {
        assert!((pair[1].time - pair[0].time - 0.03125).abs() < 1e-9);
    }
}

#[test]
fn test_string_options_fall_back_to_defaults() {
    let config = SimulationConfig::from_strings("PVC_MONO", "75", "turbo", "pentageminy", "dozen");
    assert_eq!(config.paper_speed, PaperSpeed::Mm25);
    assert_eq!(config.scroll_speed, ScrollSpeed::Slow);
    assert_eq!(config.ectopy.pattern, PrematurePattern::Random);
    assert_eq!(config.ectopy.group, PrematureGroup::Single);

    let config = SimulationConfig::from_strings("PVC_MONO", "50", "fast", "bigeminy", "couplet");
    assert_eq!(config.paper_speed, PaperSpeed::Mm50);
    assert_eq!(config.scroll_speed, ScrollSpeed::Fast);
    assert_eq!(config.ectopy.pattern, PrematurePattern::Bigeminy);
    assert_eq!(config.ectopy.group, PrematureGroup::Couplet);
}

#[test]
fn test_unknown_rhythm_selection_keeps_running() {
    let mut sim = simulator("AFIB", 0, 2);
    let mut sink = RecordingSink::new();
    sim.select_rhythm("NOT_A_RHYTHM");
    for _ in 0..50 {
        sim.tick(0.125, &mut sink);
    }
    assert_eq!(sim.definition().id, "NSR");
    assert_eq!(sink.len(), 50);
    assert!(sink.samples.iter().all(|s| s.voltage.is_finite()));
}

#[test]
fn test_pattern_change_applies_to_future_beats() {
    let mut sim = simulator("PVC_MONO", 0, 5);
    let mut sink = RecordingSink::new();
    sim.configure(SimulationConfig {
        ectopy: EctopySettings::new(PrematurePattern::Bigeminy, PrematureGroup::Single),
        ..SimulationConfig::for_rhythm("PVC_MONO")
    });

    let mut flags = Vec::new();
    let mut last_beat = sim.state().beats_seen();
    for _ in 0..2000 {
        sim.tick(0.125, &mut sink);
        if sim.state().beats_seen() != last_beat {
            last_beat = sim.state().beats_seen();
            flags.push(sim.state().is_premature());
        }
    }

    assert!(flags.len() > 10);
    for pair in flags.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}

// =============================================================================
// OUTPUT STREAM
// =============================================================================

#[test]
fn test_phase_events_match_visible_samples() {
    let mut sim = simulator("AV2_WENCKEBACH", 600, 3);
    let mut sink = RecordingSink::new();
    for _ in 0..1600 {
        sim.tick(0.125, &mut sink);
    }

    assert_eq!(sink.samples.len(), 1000);
    assert_eq!(sink.phases.len(), 1000);
    assert_eq!(sim.buffered(), 600);
    for (sample, phase) in sink.samples.iter().zip(&sink.phases) {
        assert_eq!(sample.time, phase.time);
    }
    // The newest visible sample trails the simulation clock by the window.
    let newest = sink.samples.last().unwrap().time;
    assert!((sim.now() - newest - 600.0 * 0.125).abs() < 1e-6);
    assert!(sink.phases.iter().any(|p| p.is_dropped));
}

#[test]
fn test_study_strip_replays_into_any_sink() {
    struct PhaseCounter {
        qrs: usize,
        samples: usize,
    }

    impl StripSink for PhaseCounter {
        fn push_sample(&mut self, _sample: SamplePoint) {
            self.samples += 1;
        }

        fn push_phase(&mut self, event: PhaseEvent) {
            if event.phase == CardiacPhase::Qrs {
                self.qrs += 1;
            }
        }
    }

    let catalog = RhythmCatalog::builtin();
    let strip = StudyStrip::beats(catalog.get("SINUS_TACHY").unwrap(), 6, 0.125, &StudyParams::seeded(8));
    let mut counter = PhaseCounter { qrs: 0, samples: 0 };
    strip.replay_into(&mut counter);

    assert_eq!(counter.samples, strip.len());
    assert!(counter.qrs > 0);
}

// =============================================================================
// RATE LABEL
// =============================================================================

#[test]
fn test_bpm_label_tracks_rhythm_rate() {
    for (id, rate) in [("NSR", 70.0), ("SINUS_BRADY", 45.0), ("VTACH", 170.0)] {
        let mut sim = simulator(id, 0, 9);
        let mut sink = RecordingSink::new();
        for _ in 0..3000 {
            sim.tick(0.125, &mut sink);
        }
        let label = sim.bpm_label();
        let bpm: f64 = label.trim_end_matches(" bpm").parse().unwrap();
        assert!((bpm - rate).abs() <= rate * 0.03 + 1.0, "{}: {}", id, label);
    }
}

#[test]
fn test_bpm_label_resets_on_rhythm_change() {
    let mut sim = simulator("NSR", 0, 9);
    let mut sink = RecordingSink::new();
    for _ in 0..1000 {
        sim.tick(0.125, &mut sink);
    }
    assert_ne!(sim.bpm_label(), "---");

    sim.select_rhythm("SINUS_TACHY");
    sim.tick(0.125, &mut sink);
    assert_eq!(sim.bpm_label(), "---");
}
