//! Rhythm definitions: identity, rate, morphology and class.

use std::collections::BTreeMap;

use crate::error::{Result, SinoatrialError};
use crate::rhythms::WaveformTemplate;
use crate::types::{interval_for_rate, Bpm, Real, Time};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Locale every definition must carry a display name for.
pub const FALLBACK_LOCALE: &str = "en";

/// Largest PR prolongation (as a beat fraction) that still keeps the QRS
/// and T wave inside the beat.
pub const MAX_PR_EXTENSION: Real = 0.2;

/// Largest number of flutter waves per conducted QRS.
pub const MAX_CONDUCTION_RATIO: u32 = 8;

/// Shape of the P wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PWaveShape {
    /// Single rounded bell.
    #[default]
    Normal,
    /// Positive then negative lobe.
    Biphasic,
    /// Negative bell (retrograde atrial activation).
    Inverted,
    /// Two humps (P mitrale).
    Bifid,
    /// Tall and narrow (P pulmonale).
    Peaked,
}

/// Notching of the QRS complex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum QrsNotch {
    /// Single R wave.
    #[default]
    None,
    /// Broad M-shaped R.
    Notched,
    /// rSR' ("rabbit ears").
    Rsr,
}

/// Which side of the conduction system is delayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConductionDelay {
    /// No delay.
    #[default]
    None,
    /// Left bundle: septal Q wave lost.
    Left,
    /// Right bundle: broad terminal S wave.
    Right,
    /// Left atrium: widened P wave.
    LeftAtrium,
}

/// Waveform shape flags of a rhythm.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Morphology {
    /// Whether sinus P waves are present.
    pub has_p: bool,
    /// QRS width multiplier (1.0 = narrow).
    pub qrs_width: Real,
    /// Pre-excitation delta wave before the QRS.
    pub delta_wave: bool,
    /// Accessory (Kent) pathway: shortens the PR interval.
    pub kent: bool,
    /// QRS notching.
    pub qrs_notch: QrsNotch,
    /// P wave shape.
    pub p_shape: PWaveShape,
    /// Conduction-delay side.
    pub conduction_delay: ConductionDelay,
}

impl Default for Morphology {
    fn default() -> Self {
        Self {
            has_p: true,
            qrs_width: 1.0,
            delta_wave: false,
            kent: false,
            qrs_notch: QrsNotch::None,
            p_shape: PWaveShape::Normal,
            conduction_delay: ConductionDelay::None,
        }
    }
}

/// Kind of atrioventricular block.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BlockKind {
    /// Constant PR prolongation, every beat conducted.
    FirstDegree {
        /// PR prolongation as a fraction of the beat.
        pr_delay: Real,
    },
    /// Mobitz I: PR lengthens over three beats, the fourth is dropped.
    Wenckebach {
        /// PR increment per conducted beat, as a fraction of the beat.
        pr_step: Real,
    },
    /// Mobitz II: beats dropped at random without PR change.
    MobitzII,
    /// Third degree: atria and ventricles on independent clocks.
    Complete {
        /// Atrial rate of the independent P-wave clock.
        atrial_rate: Bpm,
    },
}

/// Origin of an ectopic beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EctopicKind {
    /// Premature atrial contraction, high atrial focus.
    PacHigh,
    /// Premature atrial contraction, mid atrial focus.
    PacMid,
    /// Premature atrial contraction, low atrial focus.
    PacLow,
    /// Premature ventricular contraction, one shape.
    PvcMono,
    /// Premature ventricular contraction, shape varies per beat.
    PvcPoly,
}

impl EctopicKind {
    /// Whether the focus is ventricular (no P wave on the premature beat).
    pub fn is_ventricular(&self) -> bool {
        matches!(self, EctopicKind::PvcMono | EctopicKind::PvcPoly)
    }
}

/// Behavioral class of a rhythm. Each variant carries only what it needs.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RhythmClass {
    /// Plain beat-to-beat rhythm.
    #[default]
    Normal,
    /// AV conduction block.
    Block {
        /// Kind of block.
        kind: BlockKind,
    },
    /// Sinus rhythm interrupted by premature beats.
    Ectopic {
        /// Origin of the premature beats.
        kind: EctopicKind,
    },
    /// Ventricular fibrillation: no organized activity.
    Chaos,
    /// Atrial flutter: saw-tooth atrial waves with periodic conduction.
    Flutter {
        /// Flutter waves per conducted QRS.
        conduction_ratio: u32,
    },
    /// Sick-sinus syndrome: occasional sinus pauses.
    SickSinus,
}

impl RhythmClass {
    /// Short tag used in logs.
    pub fn tag(&self) -> &'static str {
        match self {
            RhythmClass::Normal => "normal",
            RhythmClass::Block { .. } => "block",
            RhythmClass::Ectopic { .. } => "ectopic",
            RhythmClass::Chaos => "chaos",
            RhythmClass::Flutter { .. } => "flutter",
            RhythmClass::SickSinus => "sss",
        }
    }
}

/// Interval randomization and baseline noise.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Timing {
    /// Bound on interval jitter as a fraction of the nominal interval.
    pub jitter: Real,
    /// Baseline noise amplitude.
    pub noise: Real,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            jitter: 0.02,
            noise: 0.01,
        }
    }
}

/// One named rhythm.
///
/// # Example
///
/// ```rust
/// use sinoatrial::rhythms::{BlockKind, RhythmClass, RhythmDefinition};
///
/// let def = RhythmDefinition::new(
///     "AV2_WENCKEBACH",
///     "Second-Degree AV Block, Mobitz I",
///     75.0,
///     RhythmClass::Block { kind: BlockKind::Wenckebach { pr_step: 0.04 } },
/// )
/// .with_name("ja", "II度房室ブロック(ウェンケバッハ型)");
///
/// assert!(def.validate().is_ok());
/// assert_eq!(def.nominal_interval(), 20.0);
/// assert_eq!(def.display_name("fr"), "Second-Degree AV Block, Mobitz I");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RhythmDefinition {
    /// Catalog key.
    pub id: String,
    /// Display names keyed by locale tag.
    pub names: BTreeMap<String, String>,
    /// Nominal ventricular rate.
    pub rate_bpm: Bpm,
    /// Fixed versus randomly perturbed beat-to-beat interval.
    pub regular: bool,
    /// Waveform shape flags.
    #[cfg_attr(feature = "serde", serde(default))]
    pub morphology: Morphology,
    /// Behavioral class.
    pub class: RhythmClass,
    /// Interval jitter and noise.
    #[cfg_attr(feature = "serde", serde(default))]
    pub timing: Timing,
    /// Optional one-beat template used by template-mode study strips.
    #[cfg_attr(feature = "serde", serde(default))]
    pub template: Option<WaveformTemplate>,
}

impl RhythmDefinition {
    /// Creates a regular definition with default morphology and timing.
    pub fn new(id: impl Into<String>, english_name: impl Into<String>, rate_bpm: Bpm, class: RhythmClass) -> Self {
        let mut names = BTreeMap::new();
        names.insert(FALLBACK_LOCALE.to_string(), english_name.into());
        Self {
            id: id.into(),
            names,
            rate_bpm,
            regular: true,
            morphology: Morphology::default(),
            class,
            timing: Timing::default(),
            template: None,
        }
    }

    /// Adds a display name for a locale.
    #[must_use]
    pub fn with_name(mut self, locale: &str, name: impl Into<String>) -> Self {
        self.names.insert(locale.to_string(), name.into());
        self
    }

    /// Replaces the morphology.
    #[must_use]
    pub fn with_morphology(mut self, morphology: Morphology) -> Self {
        self.morphology = morphology;
        self
    }

    /// Replaces the timing parameters.
    #[must_use]
    pub fn with_timing(mut self, jitter: Real, noise: Real) -> Self {
        self.timing = Timing { jitter, noise };
        self
    }

    /// Marks the rhythm as irregular.
    #[must_use]
    pub fn irregular(mut self) -> Self {
        self.regular = false;
        self
    }

    /// Attaches a one-beat waveform template.
    #[must_use]
    pub fn with_template(mut self, template: WaveformTemplate) -> Self {
        self.template = Some(template);
        self
    }

    /// Nominal inter-beat interval in strip units.
    pub fn nominal_interval(&self) -> Time {
        interval_for_rate(self.rate_bpm)
    }

    /// Display name for a locale, falling back to English, then to the id.
    pub fn display_name(&self, locale: &str) -> &str {
        self.names
            .get(locale)
            .or_else(|| self.names.get(FALLBACK_LOCALE))
            .map_or(self.id.as_str(), String::as_str)
    }

    /// Whether premature beats of this rhythm come from the ventricles.
    pub fn has_ventricular_ectopy(&self) -> bool {
        matches!(self.class, RhythmClass::Ectopic { kind } if kind.is_ventricular())
    }

    fn invalid(&self, field: &'static str, message: impl Into<String>) -> SinoatrialError {
        SinoatrialError::InvalidDefinition {
            id: self.id.clone(),
            field,
            message: message.into(),
        }
    }

    /// Checks that every field required by the declared class is usable.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(self.invalid("id", "must not be empty"));
        }

        if !self.names.contains_key(FALLBACK_LOCALE) {
            return Err(self.invalid("names", format!("missing '{}' display name", FALLBACK_LOCALE)));
        }

        if !self.rate_bpm.is_finite() || self.rate_bpm <= 0.0 {
            return Err(self.invalid("rate_bpm", "must be a positive number"));
        }

        let m = &self.morphology;
        if !m.qrs_width.is_finite() || m.qrs_width < 1.0 {
            return Err(self.invalid("qrs_width", "must be >= 1.0"));
        }

        let t = &self.timing;
        if !t.jitter.is_finite() || !(0.0..0.5).contains(&t.jitter) {
            return Err(self.invalid("jitter", "must be in [0, 0.5)"));
        }
        if !t.noise.is_finite() || t.noise < 0.0 {
            return Err(self.invalid("noise", "must be >= 0"));
        }

        match self.class {
            RhythmClass::Block { kind } => match kind {
                BlockKind::FirstDegree { pr_delay } => {
                    if !pr_delay.is_finite() || pr_delay <= 0.0 || pr_delay > MAX_PR_EXTENSION {
                        return Err(self.invalid(
                            "pr_delay",
                            format!("must be in (0, {}]", MAX_PR_EXTENSION),
                        ));
                    }
                }
                BlockKind::Wenckebach { pr_step } => {
                    if !pr_step.is_finite() || pr_step <= 0.0 || 3.0 * pr_step > MAX_PR_EXTENSION {
                        return Err(self.invalid(
                            "pr_step",
                            format!("must be in (0, {}]", MAX_PR_EXTENSION / 3.0),
                        ));
                    }
                }
                BlockKind::MobitzII => {}
                BlockKind::Complete { atrial_rate } => {
                    if !atrial_rate.is_finite() || atrial_rate <= 0.0 {
                        return Err(self.invalid("atrial_rate", "must be a positive number"));
                    }
                    if (atrial_rate - self.rate_bpm).abs() < 1.0 {
                        return Err(self.invalid(
                            "atrial_rate",
                            "must differ from the ventricular rate",
                        ));
                    }
                }
            },
            RhythmClass::Ectopic { .. } => {
                if !m.has_p {
                    return Err(self.invalid("has_p", "ectopic rhythms need an underlying sinus P wave"));
                }
            }
            RhythmClass::Flutter { conduction_ratio } => {
                if !(2..=MAX_CONDUCTION_RATIO).contains(&conduction_ratio) {
                    return Err(self.invalid("conduction_ratio", "must be between 2 and 8"));
                }
            }
            RhythmClass::Normal | RhythmClass::Chaos | RhythmClass::SickSinus => {}
        }

        if let Some(template) = &self.template {
            template
                .validate()
                .map_err(|message| self.invalid("template", message))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wenckebach(pr_step: Real) -> RhythmDefinition {
        RhythmDefinition::new(
            "W",
            "Wenckebach",
            75.0,
            RhythmClass::Block {
                kind: BlockKind::Wenckebach { pr_step },
            },
        )
    }

    #[test]
    fn test_valid_definition() {
        assert!(wenckebach(0.04).validate().is_ok());
    }

    #[test]
    fn test_wenckebach_requires_positive_step() {
        let err = wenckebach(0.0).validate().unwrap_err();
        assert!(matches!(
            err,
            SinoatrialError::InvalidDefinition { field: "pr_step", .. }
        ));
        assert!(wenckebach(Real::NAN).validate().is_err());
        assert!(wenckebach(0.1).validate().is_err());
    }

    #[test]
    fn test_ectopic_requires_p_wave() {
        let def = RhythmDefinition::new(
            "PVC",
            "PVC",
            72.0,
            RhythmClass::Ectopic {
                kind: EctopicKind::PvcMono,
            },
        )
        .with_morphology(Morphology {
            has_p: false,
            ..Default::default()
        });

        let err = def.validate().unwrap_err();
        assert!(matches!(
            err,
            SinoatrialError::InvalidDefinition { field: "has_p", .. }
        ));
    }

    #[test]
    fn test_rate_and_timing_bounds() {
        let base = RhythmDefinition::new("X", "X", 70.0, RhythmClass::Normal);
        assert!(base.clone().with_timing(0.5, 0.0).validate().is_err());
        assert!(base.clone().with_timing(0.1, -1.0).validate().is_err());

        let mut slow = base.clone();
        slow.rate_bpm = 0.0;
        assert!(slow.validate().is_err());

        let mut narrow = base;
        narrow.morphology.qrs_width = 0.5;
        assert!(narrow.validate().is_err());
    }

    #[test]
    fn test_complete_block_needs_distinct_rates() {
        let def = RhythmDefinition::new(
            "AV3",
            "Complete",
            40.0,
            RhythmClass::Block {
                kind: BlockKind::Complete { atrial_rate: 40.0 },
            },
        );
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_flutter_ratio() {
        let def = RhythmDefinition::new(
            "AFL",
            "Flutter",
            100.0,
            RhythmClass::Flutter {
                conduction_ratio: 1,
            },
        );
        assert!(def.validate().is_err());

        for ratio in [MAX_CONDUCTION_RATIO + 1, u32::MAX] {
            let def = RhythmDefinition::new("AFL", "Flutter", 100.0, RhythmClass::Flutter { conduction_ratio: ratio })
                .irregular();
            let err = def.validate().unwrap_err();
            assert!(err.to_string().contains("conduction_ratio"));
        }

        let def = RhythmDefinition::new(
            "AFL",
            "Flutter",
            100.0,
            RhythmClass::Flutter {
                conduction_ratio: MAX_CONDUCTION_RATIO,
            },
        );
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_missing_english_name() {
        let mut def = RhythmDefinition::new("X", "X", 70.0, RhythmClass::Normal);
        def.names.clear();
        def.names.insert("ja".into(), "テスト".into());
        assert!(def.validate().is_err());
        assert_eq!(def.display_name("en"), "X");
        assert_eq!(def.display_name("ja"), "テスト");
    }

    #[test]
    fn test_ventricular_ectopy() {
        let pvc = RhythmDefinition::new(
            "PVC",
            "PVC",
            72.0,
            RhythmClass::Ectopic {
                kind: EctopicKind::PvcPoly,
            },
        );
        assert!(pvc.has_ventricular_ectopy());
        assert!(!wenckebach(0.04).has_ventricular_ectopy());
    }
}
