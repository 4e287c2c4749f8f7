//! # Sinoatrial - Cardiac Rhythm Simulation in Rust
//!
//! Sinoatrial is a stylized ECG strip synthesizer for teaching. It produces
//! physiologically-styled voltage traces for named rhythms (sinus rhythms,
//! fibrillation, flutter, AV blocks, bundle-branch blocks, ectopic beats,
//! sick-sinus syndrome) together with phase metadata that a companion
//! animation can follow.
//!
//! ## Overview
//!
//! The engine is built from small, single-purpose pieces:
//!
//! - **Rhythm catalog**: immutable, validated [`RhythmDefinition`](rhythms::RhythmDefinition) records
//! - **Cycle scheduler**: decides at each beat boundary whether the next beat is
//!   normal, premature, dropped or a pause, and how long it lasts
//! - **Voltage synthesizer**: a pure function of time, definition and scheduler state
//! - **Phase classifier**: names the active part of the cardiac cycle
//! - **Sample streams**: finite study strips and a delayed live stream
//! - **Simulator**: the tick-driven facade a host loop talks to
//!
//! It does not model real electrophysiology and makes no diagnostic claims.
//!
//! ## Quick Start
//!
//! ```rust
//! use sinoatrial::prelude::*;
//! use std::sync::Arc;
//!
//! let catalog = Arc::new(RhythmCatalog::builtin());
//! let mut sim = Simulator::new(
//!     catalog,
//!     SimulationConfig::for_rhythm("AV2_WENCKEBACH"),
//!     SimulatorParams { seed: 7, window_samples: 0, ..Default::default() },
//! );
//!
//! let mut sink = RecordingSink::default();
//! for _ in 0..400 {
//!     sim.tick(0.125, &mut sink);
//! }
//! assert_eq!(sink.samples.len(), 400);
//! assert!(sink.samples.iter().all(|s| s.voltage.is_finite()));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization of definitions, catalogs, configs and strips

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]

pub mod engine;
pub mod rhythms;
pub mod types;
pub mod utils;

#[cfg(feature = "serde")]
pub mod serialization;

/// Re-export of commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::engine::{
        BeatLayout, CycleScheduler, CycleState, EctopySettings, LiveStream, PaperSpeed,
        PhaseClassifier, PrematureGroup, PrematurePattern, RecordingSink, SchedulerTuning,
        ScrollSpeed, SimulationConfig, Simulator, SimulatorParams, StripSink, StudyParams,
        StudyStrip, VoltageSynthesizer, WaveSource,
    };
    pub use crate::rhythms::{
        BlockKind, ConductionDelay, EctopicKind, Morphology, PWaveShape, QrsNotch,
        RhythmCatalog, RhythmClass, RhythmDefinition, Timing, WaveformTemplate,
    };
    pub use crate::types::{
        Bpm, CardiacPhase, PhaseEvent, Real, SamplePoint, Time, Voltage, UNITS_PER_MINUTE,
        UNITS_PER_SECOND,
    };
    pub use crate::utils::{Random, RateMeter, TraceStats};

    #[cfg(feature = "serde")]
    pub use crate::serialization::{Serializable, SerializableFormat};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library.
pub mod error {
    use thiserror::Error;

    /// Main error type for sinoatrial operations.
    ///
    /// Only catalog construction and explicit strict parsing surface these to
    /// callers; the tick path recovers locally and logs instead.
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum SinoatrialError {
        /// No rhythm with this id exists in the catalog.
        #[error("Unknown rhythm '{0}'")]
        UnknownRhythm(String),

        /// Two definitions share an id.
        #[error("Duplicate rhythm id '{0}'")]
        DuplicateRhythm(String),

        /// A rhythm definition failed validation.
        #[error("Invalid rhythm definition '{id}': field '{field}' {message}")]
        InvalidDefinition {
            /// Id of the offending definition.
            id: String,
            /// Name of the invalid field.
            field: &'static str,
            /// Description of the problem.
            message: String,
        },

        /// A catalog was built from an empty definition list.
        #[error("Catalog contains no rhythm definitions")]
        EmptyCatalog,

        /// A configuration option had an unrecognized value.
        #[error("Unknown value '{value}' for option '{option}'")]
        UnknownOption {
            /// Option name.
            option: &'static str,
            /// The rejected value.
            value: String,
        },

        /// Waveform generation could not use the requested source.
        #[error("Generation error: {0}")]
        GenerationError(String),

        /// Serialization error.
        #[cfg(feature = "serde")]
        #[error("Serialization error: {message}")]
        SerializationError {
            /// Description of the serialization error.
            message: String,
        },

        /// I/O error.
        #[error("I/O error: {message}")]
        IoError {
            /// Description of the I/O error.
            message: String,
        },
    }

    /// Result type alias using SinoatrialError.
    pub type Result<T> = std::result::Result<T, SinoatrialError>;
}

pub use error::{Result, SinoatrialError};
