//! Simulation engine: scheduling, synthesis, phase classification and
//! sample delivery.
//!
//! Data flows one way. The [`CycleScheduler`] owns the only mutable state
//! and updates it at beat boundaries; [`BeatLayout`], [`VoltageSynthesizer`]
//! and [`PhaseClassifier`] are pure reads of that state; [`StudyStrip`] and
//! [`Simulator`] drive the loop and hand results to a [`StripSink`].

mod config;
mod layout;
mod phase;
mod scheduler;
mod simulator;
mod stream;
mod synthesizer;

pub use config::{
    parse_lenient, EctopySettings, PaperSpeed, PrematureGroup, PrematurePattern, SchedulerTuning,
    ScrollSpeed, SimulationConfig, SimulatorParams, DEFAULT_IRREGULAR_JITTER_SCALE,
    DEFAULT_MOBITZ_DROP_PROBABILITY, DEFAULT_PREMATURE_COUPLING,
    DEFAULT_RANDOM_PREMATURE_PROBABILITY, DEFAULT_SINUS_PAUSE_FACTOR,
    DEFAULT_SINUS_PAUSE_PROBABILITY, DEFAULT_TICK_STEP,
};
pub use layout::{atrial_p_wave, BeatLayout, Lobe, PWave, QrsComplex, TWave};
pub use phase::PhaseClassifier;
pub use scheduler::{CycleScheduler, CycleState, FibComponent, FIB_COMPONENTS, WENCKEBACH_CYCLE};
pub use simulator::Simulator;
pub use stream::{LiveStream, RecordingSink, StripSink, StudyParams, StudyStrip, WaveSource};
pub use synthesizer::{VoltageSynthesizer, FLUTTER_AMPLITUDE, FLUTTER_RISE};
