//! Host-facing configuration: runtime options and tuning constants.

use std::str::FromStr;

use tracing::warn;

use crate::error::{Result, SinoatrialError};
use crate::rhythms::DEFAULT_RHYTHM;
use crate::types::{Real, Time};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Probability that a beat turns premature under the `random` pattern.
pub const DEFAULT_RANDOM_PREMATURE_PROBABILITY: Real = 0.2;

/// Premature-beat duration as a fraction of the nominal interval.
pub const DEFAULT_PREMATURE_COUPLING: Real = 0.6;

/// Independent per-beat drop probability for Mobitz II.
pub const DEFAULT_MOBITZ_DROP_PROBABILITY: Real = 0.3;

/// Per-beat probability of a sinus pause in sick-sinus syndrome.
pub const DEFAULT_SINUS_PAUSE_PROBABILITY: Real = 0.005;

/// Duration multiplier applied to a sinus pause.
pub const DEFAULT_SINUS_PAUSE_FACTOR: Real = 2.5;

/// Jitter multiplier for rhythms declared irregular.
pub const DEFAULT_IRREGULAR_JITTER_SCALE: Real = 1.5;

/// Strip-chart paper speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PaperSpeed {
    /// 25 mm/s, the clinical standard.
    #[default]
    Mm25,
    /// 50 mm/s.
    Mm50,
    /// 100 mm/s.
    Mm100,
}

impl PaperSpeed {
    /// Millimetres per second.
    pub fn mm_per_second(&self) -> u32 {
        match self {
            PaperSpeed::Mm25 => 25,
            PaperSpeed::Mm50 => 50,
            PaperSpeed::Mm100 => 100,
        }
    }

    /// Factor applied to the host's tick step; faster paper means finer steps.
    pub fn step_scale(&self) -> Real {
        25.0 / self.mm_per_second() as Real
    }

    /// Maps a mm/s value, returning `None` for unsupported speeds.
    pub fn from_mm(mm: u32) -> Option<Self> {
        match mm {
            25 => Some(PaperSpeed::Mm25),
            50 => Some(PaperSpeed::Mm50),
            100 => Some(PaperSpeed::Mm100),
            _ => None,
        }
    }
}

impl FromStr for PaperSpeed {
    type Err = SinoatrialError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches("mm/s").trim();
        trimmed
            .parse::<u32>()
            .ok()
            .and_then(PaperSpeed::from_mm)
            .ok_or_else(|| unknown("paper_speed", s))
    }
}

/// How many engine ticks the host pulls per animation frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScrollSpeed {
    /// One tick per frame.
    #[default]
    Slow,
    /// Two ticks per frame.
    Fast,
}

impl ScrollSpeed {
    /// Frame-skip factor.
    pub fn ticks_per_frame(&self) -> usize {
        match self {
            ScrollSpeed::Slow => 1,
            ScrollSpeed::Fast => 2,
        }
    }
}

impl FromStr for ScrollSpeed {
    type Err = SinoatrialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow" => Ok(ScrollSpeed::Slow),
            "fast" => Ok(ScrollSpeed::Fast),
            _ => Err(unknown("scroll_speed", s)),
        }
    }
}

/// Rule selecting which beats turn premature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PrematurePattern {
    /// Independent probability draw per beat.
    #[default]
    Random,
    /// Every 2nd beat.
    Bigeminy,
    /// Every 3rd beat.
    Trigeminy,
    /// Every 4th beat.
    Quadrigeminy,
}

impl PrematurePattern {
    /// Normal beats between ectopic groups, or `None` for `Random`.
    pub fn normal_beats_between(&self) -> Option<u32> {
        match self {
            PrematurePattern::Random => None,
            PrematurePattern::Bigeminy => Some(1),
            PrematurePattern::Trigeminy => Some(2),
            PrematurePattern::Quadrigeminy => Some(3),
        }
    }
}

impl FromStr for PrematurePattern {
    type Err = SinoatrialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(PrematurePattern::Random),
            "bigeminy" => Ok(PrematurePattern::Bigeminy),
            "trigeminy" => Ok(PrematurePattern::Trigeminy),
            "quadrigeminy" => Ok(PrematurePattern::Quadrigeminy),
            _ => Err(unknown("premature_pattern", s)),
        }
    }
}

/// Number of consecutive premature beats once triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PrematureGroup {
    /// One beat.
    #[default]
    Single,
    /// Two beats.
    Couplet,
    /// Three beats.
    Triplet,
    /// Four beats.
    Quadruplet,
}

impl PrematureGroup {
    /// Beats in the group.
    pub fn size(&self) -> u8 {
        match self {
            PrematureGroup::Single => 1,
            PrematureGroup::Couplet => 2,
            PrematureGroup::Triplet => 3,
            PrematureGroup::Quadruplet => 4,
        }
    }
}

impl FromStr for PrematureGroup {
    type Err = SinoatrialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(PrematureGroup::Single),
            "couplet" => Ok(PrematureGroup::Couplet),
            "triplet" => Ok(PrematureGroup::Triplet),
            "quadruplet" => Ok(PrematureGroup::Quadruplet),
            _ => Err(unknown("premature_group", s)),
        }
    }
}

fn unknown(option: &'static str, value: &str) -> SinoatrialError {
    SinoatrialError::UnknownOption {
        option,
        value: value.to_string(),
    }
}

/// Parses an option, falling back to its default and logging on failure.
///
/// ```rust
/// use sinoatrial::engine::{parse_lenient, PrematureGroup, PrematurePattern};
///
/// assert_eq!(parse_lenient::<PrematurePattern>("trigeminy"), PrematurePattern::Trigeminy);
/// assert_eq!(parse_lenient::<PrematureGroup>("sextuplet"), PrematureGroup::Single);
/// ```
pub fn parse_lenient<T>(value: &str) -> T
where
    T: FromStr<Err = SinoatrialError> + Default + std::fmt::Debug,
{
    value.parse().unwrap_or_else(|err: SinoatrialError| {
        let fallback = T::default();
        warn!(%err, ?fallback, "using default option value");
        fallback
    })
}

/// Ectopic-beat selection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EctopySettings {
    /// Which beats turn premature.
    pub pattern: PrematurePattern,
    /// How many consecutive premature beats fire.
    pub group: PrematureGroup,
}

impl EctopySettings {
    /// Settings from the given pattern and group.
    pub fn new(pattern: PrematurePattern, group: PrematureGroup) -> Self {
        Self { pattern, group }
    }
}

/// Options the host may change at any time; applied whole at the next tick.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// Selected rhythm id.
    pub rhythm_id: String,
    /// Paper speed.
    pub paper_speed: PaperSpeed,
    /// Host pull rate.
    pub scroll_speed: ScrollSpeed,
    /// Ectopic-beat selection.
    pub ectopy: EctopySettings,
}

impl SimulationConfig {
    /// Default options for a rhythm.
    pub fn for_rhythm(rhythm_id: impl Into<String>) -> Self {
        Self {
            rhythm_id: rhythm_id.into(),
            ..Default::default()
        }
    }

    /// Builds a config from untrusted strings; unknown values become defaults.
    pub fn from_strings(
        rhythm_id: &str,
        paper_speed: &str,
        scroll_speed: &str,
        premature_pattern: &str,
        premature_group: &str,
    ) -> Self {
        Self {
            rhythm_id: rhythm_id.trim().to_string(),
            paper_speed: parse_lenient(paper_speed),
            scroll_speed: parse_lenient(scroll_speed),
            ectopy: EctopySettings {
                pattern: parse_lenient(premature_pattern),
                group: parse_lenient(premature_group),
            },
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rhythm_id: DEFAULT_RHYTHM.to_string(),
            paper_speed: PaperSpeed::default(),
            scroll_speed: ScrollSpeed::default(),
            ectopy: EctopySettings::default(),
        }
    }
}

/// Tuned constants behind the scheduler's random decisions.
///
/// The defaults were chosen for visual pacing, not derived from clinical
/// data; hosts may override them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerTuning {
    /// Probability of a premature beat under the `random` pattern.
    pub random_premature_probability: Real,
    /// Premature-beat duration as a fraction of the nominal interval.
    pub premature_coupling: Real,
    /// Independent Mobitz II drop probability.
    pub mobitz_drop_probability: Real,
    /// Sick-sinus pause probability per beat.
    pub sinus_pause_probability: Real,
    /// Duration multiplier of a sinus pause.
    pub sinus_pause_factor: Real,
    /// Widens the jitter band of irregular rhythms.
    pub irregular_jitter_scale: Real,
    /// Boundaries processed per `advance` before the cycle snaps to `now`.
    pub max_catch_up: u32,
}

impl Default for SchedulerTuning {
    fn default() -> Self {
        Self {
            random_premature_probability: DEFAULT_RANDOM_PREMATURE_PROBABILITY,
            premature_coupling: DEFAULT_PREMATURE_COUPLING,
            mobitz_drop_probability: DEFAULT_MOBITZ_DROP_PROBABILITY,
            sinus_pause_probability: DEFAULT_SINUS_PAUSE_PROBABILITY,
            sinus_pause_factor: DEFAULT_SINUS_PAUSE_FACTOR,
            irregular_jitter_scale: DEFAULT_IRREGULAR_JITTER_SCALE,
            max_catch_up: 64,
        }
    }
}

/// Construction-time parameters of a [`Simulator`](crate::engine::Simulator).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulatorParams {
    /// Random seed; negative draws one from the system.
    pub seed: i64,
    /// Samples held in the display delay FIFO (0 = no delay).
    pub window_samples: usize,
    /// Intervals averaged by the BPM label.
    pub rate_window: usize,
    /// Scheduler tuning.
    pub tuning: SchedulerTuning,
}

impl Default for SimulatorParams {
    fn default() -> Self {
        Self {
            seed: 0,
            window_samples: 600,
            rate_window: 8,
            tuning: SchedulerTuning::default(),
        }
    }
}

/// Suggested host tick step at 25 mm/s (5 ms).
pub const DEFAULT_TICK_STEP: Time = 0.125;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_speed_scaling() {
        assert_eq!(PaperSpeed::Mm25.step_scale(), 1.0);
        assert_eq!(PaperSpeed::Mm50.step_scale(), 0.5);
        assert_eq!(PaperSpeed::Mm100.step_scale(), 0.25);
        assert_eq!("50".parse::<PaperSpeed>().unwrap(), PaperSpeed::Mm50);
        assert_eq!("100mm/s".parse::<PaperSpeed>().unwrap(), PaperSpeed::Mm100);
        assert!("33".parse::<PaperSpeed>().is_err());
    }

    #[test]
    fn test_strict_parsing() {
        assert_eq!(" Bigeminy ".parse::<PrematurePattern>().unwrap(), PrematurePattern::Bigeminy);
        assert_eq!("TRIPLET".parse::<PrematureGroup>().unwrap(), PrematureGroup::Triplet);
        assert_eq!("fast".parse::<ScrollSpeed>().unwrap(), ScrollSpeed::Fast);

        let err = "pentageminy".parse::<PrematurePattern>().unwrap_err();
        assert_eq!(
            err,
            SinoatrialError::UnknownOption {
                option: "premature_pattern",
                value: "pentageminy".into()
            }
        );
    }

    #[test]
    fn test_lenient_fallbacks() {
        let config = SimulationConfig::from_strings("AV1", "42", "warp", "often", "dozen");
        assert_eq!(config.rhythm_id, "AV1");
        assert_eq!(config.paper_speed, PaperSpeed::Mm25);
        assert_eq!(config.scroll_speed, ScrollSpeed::Slow);
        assert_eq!(config.ectopy.pattern, PrematurePattern::Random);
        assert_eq!(config.ectopy.group, PrematureGroup::Single);
    }

    #[test]
    fn test_pattern_and_group_sizes() {
        assert_eq!(PrematurePattern::Random.normal_beats_between(), None);
        assert_eq!(PrematurePattern::Quadrigeminy.normal_beats_between(), Some(3));
        assert_eq!(PrematureGroup::Couplet.size(), 2);
        assert_eq!(ScrollSpeed::Fast.ticks_per_frame(), 2);
    }

    #[test]
    fn test_tuning_defaults() {
        let tuning = SchedulerTuning::default();
        assert_eq!(tuning.mobitz_drop_probability, 0.3);
        assert_eq!(tuning.sinus_pause_probability, 0.005);
        assert_eq!(tuning.random_premature_probability, 0.2);
    }
}
