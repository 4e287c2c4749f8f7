//! Core types for the rhythm engine.
//!
//! This module contains the scalar aliases, the strip time base and the value
//! objects (samples and phase events) produced on every tick.

mod events;
mod primitives;

pub use events::*;
pub use primitives::*;
