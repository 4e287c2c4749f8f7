//! The rhythm catalog: validated definitions plus id lookup.

use ahash::AHashMap;
use tracing::warn;

use crate::error::{Result, SinoatrialError};
use crate::rhythms::templates::{NORMAL_BEAT, WIDE_BEAT};
use crate::rhythms::{
    BlockKind, ConductionDelay, EctopicKind, Morphology, PWaveShape, QrsNotch, RhythmClass,
    RhythmDefinition, WaveformTemplate,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Id of the rhythm substituted for unknown ids.
pub const DEFAULT_RHYTHM: &str = "NSR";

/// Immutable registry of rhythm definitions.
///
/// Every definition is validated when the catalog is built, so lookups never
/// hand out a definition the engine cannot simulate. Ids are matched
/// case-insensitively.
///
/// # Example
///
/// ```rust
/// use sinoatrial::rhythms::RhythmCatalog;
///
/// let catalog = RhythmCatalog::builtin();
/// let nsr = catalog.get("NSR").unwrap();
/// assert_eq!(nsr.rate_bpm, 70.0);
///
/// assert!(catalog.get("NOPE").is_err());
/// assert_eq!(catalog.get_or_default("NOPE").id, "NSR");
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<RhythmDefinition>", into = "Vec<RhythmDefinition>")
)]
pub struct RhythmCatalog {
    definitions: Vec<RhythmDefinition>,
    index: AHashMap<String, usize>,
}

impl RhythmCatalog {
    /// Builds a catalog, validating every definition.
    ///
    /// Fails on the first invalid definition, on duplicate ids, or on an
    /// empty list.
    pub fn from_definitions(definitions: Vec<RhythmDefinition>) -> Result<Self> {
        if definitions.is_empty() {
            return Err(SinoatrialError::EmptyCatalog);
        }

        let mut index = AHashMap::with_capacity(definitions.len());
        for (idx, def) in definitions.iter().enumerate() {
            def.validate()?;
            if index.insert(def.id.to_ascii_uppercase(), idx).is_some() {
                return Err(SinoatrialError::DuplicateRhythm(def.id.clone()));
            }
        }

        Ok(Self { definitions, index })
    }

    /// The built-in teaching catalog.
    pub fn builtin() -> Self {
        Self::from_definitions(builtin_definitions())
            .expect("built-in rhythm table must pass validation")
    }

    /// Looks up a definition by id.
    pub fn get(&self, id: &str) -> Result<&RhythmDefinition> {
        self.index
            .get(&id.to_ascii_uppercase())
            .map(|&idx| &self.definitions[idx])
            .ok_or_else(|| SinoatrialError::UnknownRhythm(id.to_string()))
    }

    /// Looks up a definition, substituting [`DEFAULT_RHYTHM`] (or the first
    /// definition if the catalog has no such entry) for unknown ids.
    pub fn get_or_default(&self, id: &str) -> &RhythmDefinition {
        match self.get(id) {
            Ok(def) => def,
            Err(err) => {
                let fallback = self
                    .get(DEFAULT_RHYTHM)
                    .unwrap_or(&self.definitions[0]);
                warn!(%err, fallback = %fallback.id, "substituting default rhythm");
                fallback
            }
        }
    }

    /// Whether an id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(&id.to_ascii_uppercase())
    }

    /// Ids in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.id.as_str())
    }

    /// Definitions in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, RhythmDefinition> {
        self.definitions.iter()
    }

    /// All definitions.
    pub fn definitions(&self) -> &[RhythmDefinition] {
        &self.definitions
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl Default for RhythmCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<Vec<RhythmDefinition>> for RhythmCatalog {
    type Error = SinoatrialError;

    fn try_from(definitions: Vec<RhythmDefinition>) -> Result<Self> {
        Self::from_definitions(definitions)
    }
}

impl From<RhythmCatalog> for Vec<RhythmDefinition> {
    fn from(catalog: RhythmCatalog) -> Self {
        catalog.definitions
    }
}

impl<'a> IntoIterator for &'a RhythmCatalog {
    type Item = &'a RhythmDefinition;
    type IntoIter = std::slice::Iter<'a, RhythmDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn narrow_template() -> WaveformTemplate {
    WaveformTemplate::new(NORMAL_BEAT)
}

fn block(kind: BlockKind) -> RhythmClass {
    RhythmClass::Block { kind }
}

fn ectopic(kind: EctopicKind) -> RhythmClass {
    RhythmClass::Ectopic { kind }
}

fn without_p() -> Morphology {
    Morphology {
        has_p: false,
        ..Default::default()
    }
}

/// The built-in rhythm table.
pub fn builtin_definitions() -> Vec<RhythmDefinition> {
    vec![
        // Sinus rhythms
        RhythmDefinition::new("NSR", "Normal Sinus Rhythm", 70.0, RhythmClass::Normal)
            .with_name("ja", "正常洞調律")
            .with_template(narrow_template()),
        RhythmDefinition::new("SINUS_TACHY", "Sinus Tachycardia", 120.0, RhythmClass::Normal)
            .with_name("ja", "洞性頻脈")
            .with_template(narrow_template()),
        RhythmDefinition::new("SINUS_BRADY", "Sinus Bradycardia", 45.0, RhythmClass::Normal)
            .with_name("ja", "洞性徐脈")
            .with_template(narrow_template()),
        RhythmDefinition::new("JUNCTIONAL", "Junctional Rhythm", 50.0, RhythmClass::Normal)
            .with_name("ja", "接合部調律")
            .with_morphology(Morphology {
                p_shape: PWaveShape::Inverted,
                ..Default::default()
            }),
        // Atrial enlargement
        RhythmDefinition::new("LAE", "Left Atrial Enlargement (P Mitrale)", 72.0, RhythmClass::Normal)
            .with_name("ja", "左房負荷")
            .with_morphology(Morphology {
                p_shape: PWaveShape::Bifid,
                conduction_delay: ConductionDelay::LeftAtrium,
                ..Default::default()
            }),
        RhythmDefinition::new("RAE", "Right Atrial Enlargement (P Pulmonale)", 72.0, RhythmClass::Normal)
            .with_name("ja", "右房負荷")
            .with_morphology(Morphology {
                p_shape: PWaveShape::Peaked,
                ..Default::default()
            }),
        // Supraventricular and ventricular arrhythmias
        RhythmDefinition::new("AFIB", "Atrial Fibrillation", 110.0, RhythmClass::Normal)
            .with_name("ja", "心房細動")
            .with_morphology(without_p())
            .with_timing(0.3, 0.02)
            .irregular(),
        RhythmDefinition::new(
            "AFL",
            "Atrial Flutter",
            100.0,
            RhythmClass::Flutter {
                conduction_ratio: 3,
            },
        )
        .with_name("ja", "心房粗動")
        .with_morphology(without_p())
        .with_timing(0.0, 0.01),
        RhythmDefinition::new("VTACH", "Ventricular Tachycardia", 170.0, RhythmClass::Normal)
            .with_name("ja", "心室頻拍")
            .with_morphology(Morphology {
                has_p: false,
                qrs_width: 2.5,
                ..Default::default()
            })
            .with_template(WaveformTemplate::new(WIDE_BEAT)),
        RhythmDefinition::new("VFIB", "Ventricular Fibrillation", 300.0, RhythmClass::Chaos)
            .with_name("ja", "心室細動")
            .with_morphology(without_p())
            .with_timing(0.2, 0.03)
            .irregular(),
        // AV blocks
        RhythmDefinition::new(
            "AV1",
            "First-Degree AV Block",
            70.0,
            block(BlockKind::FirstDegree { pr_delay: 0.08 }),
        )
        .with_name("ja", "I度房室ブロック"),
        RhythmDefinition::new(
            "AV2_WENCKEBACH",
            "Second-Degree AV Block, Mobitz I (Wenckebach)",
            75.0,
            block(BlockKind::Wenckebach { pr_step: 0.04 }),
        )
        .with_name("ja", "II度房室ブロック(ウェンケバッハ型)"),
        RhythmDefinition::new(
            "AV2_MOBITZ",
            "Second-Degree AV Block, Mobitz II",
            75.0,
            block(BlockKind::MobitzII),
        )
        .with_name("ja", "II度房室ブロック(モビッツII型)"),
        RhythmDefinition::new(
            "AV3",
            "Third-Degree (Complete) AV Block",
            38.0,
            block(BlockKind::Complete { atrial_rate: 80.0 }),
        )
        .with_name("ja", "III度房室ブロック")
        .with_morphology(Morphology {
            qrs_width: 1.6,
            ..Default::default()
        }),
        // Intraventricular conduction
        RhythmDefinition::new("RBBB", "Right Bundle Branch Block", 72.0, RhythmClass::Normal)
            .with_name("ja", "右脚ブロック")
            .with_morphology(Morphology {
                qrs_width: 1.8,
                qrs_notch: QrsNotch::Rsr,
                conduction_delay: ConductionDelay::Right,
                ..Default::default()
            }),
        RhythmDefinition::new("LBBB", "Left Bundle Branch Block", 72.0, RhythmClass::Normal)
            .with_name("ja", "左脚ブロック")
            .with_morphology(Morphology {
                qrs_width: 2.0,
                qrs_notch: QrsNotch::Notched,
                conduction_delay: ConductionDelay::Left,
                ..Default::default()
            }),
        RhythmDefinition::new("WPW", "Wolff-Parkinson-White Pattern", 75.0, RhythmClass::Normal)
            .with_name("ja", "WPW症候群")
            .with_morphology(Morphology {
                qrs_width: 1.4,
                delta_wave: true,
                kent: true,
                ..Default::default()
            }),
        // Ectopy
        RhythmDefinition::new("PAC_HIGH", "Premature Atrial Contraction (High Focus)", 72.0, ectopic(EctopicKind::PacHigh))
            .with_name("ja", "心房期外収縮(高位)"),
        RhythmDefinition::new("PAC_MID", "Premature Atrial Contraction (Mid Focus)", 72.0, ectopic(EctopicKind::PacMid))
            .with_name("ja", "心房期外収縮(中位)"),
        RhythmDefinition::new("PAC_LOW", "Premature Atrial Contraction (Low Focus)", 72.0, ectopic(EctopicKind::PacLow))
            .with_name("ja", "心房期外収縮(低位)"),
        RhythmDefinition::new("PVC_MONO", "Premature Ventricular Contraction (Monomorphic)", 72.0, ectopic(EctopicKind::PvcMono))
            .with_name("ja", "心室期外収縮(単形性)"),
        RhythmDefinition::new("PVC_POLY", "Premature Ventricular Contraction (Polymorphic)", 72.0, ectopic(EctopicKind::PvcPoly))
            .with_name("ja", "心室期外収縮(多形性)"),
        // Sinus node dysfunction
        RhythmDefinition::new("SSS", "Sick Sinus Syndrome", 55.0, RhythmClass::SickSinus)
            .with_name("ja", "洞不全症候群")
            .with_timing(0.08, 0.01),
    ]
}
