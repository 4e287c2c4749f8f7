//! Per-tick value objects emitted by the engine.

use super::primitives::{Time, Voltage};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One trace sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SamplePoint {
    /// Simulated time in strip units.
    pub time: Time,
    /// Trace value at `time`.
    pub voltage: Voltage,
}

impl SamplePoint {
    /// Creates a new sample.
    #[must_use]
    pub const fn new(time: Time, voltage: Voltage) -> Self {
        Self { time, voltage }
    }
}

/// Named part of the cardiac cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CardiacPhase {
    /// Atrial depolarization.
    PWave,
    /// Conduction delay between P and QRS.
    PrSegment,
    /// Ventricular depolarization.
    Qrs,
    /// Plateau between QRS and T.
    StSegment,
    /// Ventricular repolarization.
    TWave,
    /// Electrical diastole.
    #[default]
    Rest,
}

impl CardiacPhase {
    /// Returns all phases in cycle order.
    pub fn all() -> &'static [CardiacPhase] {
        &[
            CardiacPhase::PWave,
            CardiacPhase::PrSegment,
            CardiacPhase::Qrs,
            CardiacPhase::StSegment,
            CardiacPhase::TWave,
            CardiacPhase::Rest,
        ]
    }

    /// Returns the snake_case name used by animation collaborators.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardiacPhase::PWave => "p_wave",
            CardiacPhase::PrSegment => "pr_segment",
            CardiacPhase::Qrs => "qrs",
            CardiacPhase::StSegment => "st_segment",
            CardiacPhase::TWave => "t_wave",
            CardiacPhase::Rest => "rest",
        }
    }

    /// Whether the ventricles are depolarizing or repolarizing.
    pub fn is_ventricular(&self) -> bool {
        matches!(
            self,
            CardiacPhase::Qrs | CardiacPhase::StSegment | CardiacPhase::TWave
        )
    }
}

impl std::fmt::Display for CardiacPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase metadata for one tick, consumed by the anatomical animation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseEvent {
    /// Time of the sample this event describes.
    pub time: Time,
    /// Active phase.
    pub phase: CardiacPhase,
    /// Current beat arrived early from an ectopic focus.
    pub is_premature: bool,
    /// Current beat has no ventricular response.
    pub is_dropped: bool,
    /// Position within the Wenckebach 4-beat cycle (0-3).
    pub wenckebach_count: u8,
    /// Current beat is a sinus pause.
    pub pause: bool,
}
