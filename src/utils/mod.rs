//! Utility modules for the rhythm engine.
//!
//! This module contains the seedable random source, the waveform primitives
//! the synthesizer stacks, and metrics used for the BPM label and tests.

mod metrics;
pub mod pulse;
mod random;

pub use metrics::{detect_peaks, mean_spacing, RateMeter, TraceStats};
pub use random::Random;
