//! Rhythm definitions and the catalog that holds them.
//!
//! A [`RhythmDefinition`] is immutable data: rate, regularity, waveform
//! morphology and a [`RhythmClass`] tag that tells the scheduler which beat
//! rules apply. Definitions are validated once, when a [`RhythmCatalog`] is
//! built, never at simulation time.
//!
//! # Available Classes
//!
//! - [`RhythmClass::Normal`]: sinus rhythms, bundle-branch blocks, pre-excitation, AFib
//! - [`RhythmClass::Block`]: first-degree, Wenckebach, Mobitz II and complete AV block
//! - [`RhythmClass::Ectopic`]: premature atrial and ventricular contractions
//! - [`RhythmClass::Chaos`]: ventricular fibrillation
//! - [`RhythmClass::Flutter`]: atrial flutter
//! - [`RhythmClass::SickSinus`]: sick-sinus syndrome

mod catalog;
mod definition;
mod templates;

pub use catalog::{builtin_definitions, RhythmCatalog, DEFAULT_RHYTHM};
pub use definition::{
    BlockKind, ConductionDelay, EctopicKind, Morphology, PWaveShape, QrsNotch, RhythmClass,
    RhythmDefinition, Timing, FALLBACK_LOCALE, MAX_CONDUCTION_RATIO, MAX_PR_EXTENSION,
};
pub use templates::{WaveformTemplate, NORMAL_BEAT, WIDE_BEAT};
