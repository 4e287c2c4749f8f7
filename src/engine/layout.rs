//! Where each deflection of a beat sits, as a fraction of the beat.
//!
//! The synthesizer and the phase classifier both read positions from the
//! same [`BeatLayout`], so the trace and the reported phase cannot drift
//! apart.

use smallvec::SmallVec;

use crate::engine::scheduler::CycleState;
use crate::rhythms::{
    BlockKind, ConductionDelay, EctopicKind, PWaveShape, QrsNotch, RhythmClass, RhythmDefinition,
};
use crate::types::Real;
use crate::utils::pulse::pulse;

/// Normal P wave center.
pub const P_CENTER: Real = 0.175;
/// Normal P wave width (one standard deviation).
pub const P_WIDTH: Real = 0.025;
/// Normal P wave peak.
pub const P_PEAK: Real = 0.15;
/// QRS center of a normally conducted beat.
pub const QRS_CENTER: Real = 0.36;
/// Narrow QRS width; scaled by the rhythm's `qrs_width`.
pub const QRS_WIDTH: Real = 0.012;
/// R wave height of a normally conducted beat.
pub const QRS_HEIGHT: Real = 1.0;
/// Distance from the QRS center to the T wave center.
pub const QT_OFFSET: Real = 0.26;
/// T wave width.
pub const T_WIDTH: Real = 0.05;
/// Concordant T wave peak.
pub const T_PEAK: Real = 0.3;
/// PR shortening caused by an accessory pathway.
pub const KENT_SHORTENING: Real = 0.04;
/// How far the delta wave starts ahead of the QRS onset.
pub const DELTA_LEAD: Real = 0.035;
/// Widths beyond this multiplier are treated as wide complexes.
pub const WIDE_QRS_THRESHOLD: Real = 1.2;

const PVC_CENTER: Real = 0.26;
const PVC_WIDTH_FACTOR: Real = 2.6;
const ATRIAL_P_CENTER: Real = 0.5;
const ATRIAL_P_WIDTH: Real = 0.03;
const ST_GAP: Real = 0.02;
const WINDOW_SIGMAS: Real = 3.0;

/// P wave position and shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PWave {
    /// Center, as a beat fraction.
    pub center: Real,
    /// Width (standard deviation).
    pub width: Real,
    /// Peak amplitude; negative for inverted waves.
    pub peak: Real,
    /// Shape.
    pub shape: PWaveShape,
}

impl PWave {
    /// Start and end of the wave.
    pub fn window(&self) -> (Real, Real) {
        let half = WINDOW_SIGMAS * self.width;
        (self.center - half, self.center + half)
    }
}

/// QRS complex position and shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QrsComplex {
    /// Center of the dominant deflection.
    pub center: Real,
    /// Width of each lobe.
    pub width: Real,
    /// Height of the dominant deflection.
    pub height: Real,
    /// +1 for an upright complex, -1 for a downward one.
    pub polarity: Real,
    /// Notching.
    pub notch: QrsNotch,
    /// Bundle-branch delay.
    pub delay: ConductionDelay,
    /// Delta wave slurring into the upstroke.
    pub delta_wave: bool,
    /// Beat originates in the ventricles.
    pub ventricular: bool,
    /// Extra offset of a ventricular beat's terminal lobe, in widths.
    pub skew: Real,
}

impl QrsComplex {
    /// Gaussian lobes making up the complex, delta wave excluded.
    pub fn lobes(&self) -> SmallVec<[Lobe; 6]> {
        let (c, w, h) = (self.center, self.width, self.height * self.polarity);
        let mut lobes = SmallVec::new();

        if self.ventricular {
            // Broad, slurred complex with a terminal lobe of opposite sign.
            lobes.push(Lobe::new(h, c, w));
            lobes.push(Lobe::new(-0.3 * h, c + (1.5 + self.skew) * w, 1.2 * w));
            return lobes;
        }

        match self.notch {
            QrsNotch::None => lobes.push(Lobe::new(h, c, w)),
            QrsNotch::Notched => {
                lobes.push(Lobe::new(0.85 * h, c - 0.75 * w, w));
                lobes.push(Lobe::new(0.85 * h, c + 0.75 * w, w));
            }
            QrsNotch::Rsr => {
                lobes.push(Lobe::new(0.6 * h, c, w));
                lobes.push(Lobe::new(-0.35 * h, c + 1.75 * w, w));
                lobes.push(Lobe::new(0.85 * h, c + 3.5 * w, w));
            }
        }

        // Septal Q wave, lost when the left bundle is blocked.
        if self.delay != ConductionDelay::Left {
            lobes.push(Lobe::new(-0.1 * h, c - 1.8 * w, 0.6 * w));
        }

        match self.delay {
            ConductionDelay::Right => lobes.push(Lobe::new(-0.3 * h, c + 2.5 * w, 1.4 * w)),
            _ if self.notch == QrsNotch::None => lobes.push(Lobe::new(-0.25 * h, c + 1.8 * w, 0.7 * w)),
            _ => {}
        }
        lobes
    }

    /// Start of the delta-wave ramp.
    pub fn delta_start(&self) -> Real {
        self.center - WINDOW_SIGMAS * self.width - DELTA_LEAD
    }

    /// Start and end of the complex, including delta wave and trailing lobes.
    pub fn window(&self) -> (Real, Real) {
        let (mut start, end) = self.lobes().iter().fold((Real::MAX, Real::MIN), |(lo, hi), lobe| {
            let (s, e) = lobe.window();
            (lo.min(s), hi.max(e))
        });
        if self.delta_wave {
            start = start.min(self.delta_start());
        }
        (start, end)
    }
}

/// One Gaussian component of a complex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lobe {
    /// Signed peak amplitude.
    pub peak: Real,
    /// Center, as a beat fraction.
    pub center: Real,
    /// Width (standard deviation).
    pub width: Real,
}

impl Lobe {
    fn new(peak: Real, center: Real, width: Real) -> Self {
        Self { peak, center, width }
    }

    /// Value at a beat progress.
    pub fn value(&self, progress: Real) -> Real {
        pulse(progress, self.peak, self.center, self.width)
    }

    fn window(&self) -> (Real, Real) {
        let half = WINDOW_SIGMAS * self.width;
        (self.center - half, self.center + half)
    }
}

/// T wave position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TWave {
    /// Center, as a beat fraction.
    pub center: Real,
    /// Width (standard deviation).
    pub width: Real,
    /// Peak amplitude; negative for a discordant T.
    pub peak: Real,
}

impl TWave {
    /// Start and end of the wave.
    pub fn window(&self) -> (Real, Real) {
        let half = WINDOW_SIGMAS * self.width;
        (self.center - half, self.center + half)
    }
}

/// Positions of every deflection in the beat in progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeatLayout {
    /// Coupled P wave, if any.
    pub p: Option<PWave>,
    /// Ventricular complex, if conducted.
    pub qrs: Option<QrsComplex>,
    /// Repolarization wave, if conducted.
    pub t: Option<TWave>,
}

impl BeatLayout {
    /// Lays out the beat described by `state` for rhythm `def`.
    pub fn for_beat(def: &RhythmDefinition, state: &CycleState) -> Self {
        if matches!(def.class, RhythmClass::Chaos) {
            return Self::default();
        }

        let ectopic = match def.class {
            RhythmClass::Ectopic { kind } if state.is_premature() => Some(kind),
            _ => None,
        };

        let p = Self::p_wave(def, ectopic);

        if state.is_dropped() {
            return Self { p, qrs: None, t: None };
        }

        let qrs = match ectopic {
            Some(kind) if kind.is_ventricular() => Self::ventricular_qrs(def, state.morphology_seed()),
            _ => Self::conducted_qrs(def, state.pr_extension()),
        };
        let t = Some(Self::t_wave(&qrs, def.morphology.qrs_width));

        Self { p, qrs: Some(qrs), t }
    }

    fn p_wave(def: &RhythmDefinition, ectopic: Option<EctopicKind>) -> Option<PWave> {
        if !def.morphology.has_p {
            return None;
        }
        // Complete block draws its P waves from the atrial clock instead.
        if let RhythmClass::Block {
            kind: BlockKind::Complete { .. },
        } = def.class
        {
            return None;
        }

        let mut wave = PWave {
            center: P_CENTER,
            width: P_WIDTH,
            peak: P_PEAK,
            shape: def.morphology.p_shape,
        };

        match ectopic {
            Some(EctopicKind::PacHigh) => {
                wave.center = 0.15;
                wave.shape = PWaveShape::Normal;
            }
            Some(EctopicKind::PacMid) => {
                wave.center = 0.13;
                wave.peak = 0.12;
                wave.shape = PWaveShape::Biphasic;
            }
            Some(EctopicKind::PacLow) => {
                wave.center = 0.11;
                wave.peak = -0.12;
                wave.shape = PWaveShape::Inverted;
            }
            Some(EctopicKind::PvcMono | EctopicKind::PvcPoly) => return None,
            None => match wave.shape {
                PWaveShape::Normal => {}
                PWaveShape::Biphasic => wave.peak = 0.12,
                PWaveShape::Inverted => wave.peak = -0.12,
                PWaveShape::Bifid => wave.peak = 0.12,
                PWaveShape::Peaked => {
                    wave.peak = 0.25;
                    wave.width = P_WIDTH * 0.8;
                }
            },
        }

        if def.morphology.conduction_delay == ConductionDelay::LeftAtrium {
            wave.width *= 1.3;
        }
        Some(wave)
    }

    fn conducted_qrs(def: &RhythmDefinition, pr_extension: Real) -> QrsComplex {
        let m = &def.morphology;
        let mut center = QRS_CENTER + pr_extension;
        if m.kent {
            center -= KENT_SHORTENING;
        }
        QrsComplex {
            center,
            width: QRS_WIDTH * m.qrs_width,
            height: QRS_HEIGHT,
            polarity: 1.0,
            notch: m.qrs_notch,
            delay: m.conduction_delay,
            delta_wave: m.delta_wave,
            ventricular: false,
            skew: 0.0,
        }
    }

    fn ventricular_qrs(def: &RhythmDefinition, seed: u64) -> QrsComplex {
        let polarity = if seed & 1 == 0 { 1.0 } else { -1.0 };
        let height = 1.3 + 0.4 * ((seed >> 8) & 0xff) as Real / 255.0;
        let skew = 0.5 * ((seed >> 16) & 0xff) as Real / 255.0;
        QrsComplex {
            center: PVC_CENTER,
            width: QRS_WIDTH * PVC_WIDTH_FACTOR * def.morphology.qrs_width,
            height,
            polarity,
            notch: QrsNotch::None,
            delay: ConductionDelay::None,
            delta_wave: false,
            ventricular: true,
            skew,
        }
    }

    fn t_wave(qrs: &QrsComplex, qrs_width: Real) -> TWave {
        let (_, qrs_end) = qrs.window();
        let center = (qrs.center + QT_OFFSET).max(qrs_end + WINDOW_SIGMAS * T_WIDTH + ST_GAP);
        let peak = if qrs.ventricular {
            -0.45 * qrs.polarity
        } else if qrs_width > WIDE_QRS_THRESHOLD {
            -0.35 * qrs.polarity
        } else {
            T_PEAK
        };
        TWave {
            center,
            width: T_WIDTH,
            peak,
        }
    }

    /// PR interval (P center to QRS center) of a conducted beat.
    pub fn pr_interval(&self) -> Option<Real> {
        Some(self.qrs?.center - self.p?.center)
    }

    /// P wave start and end.
    pub fn p_window(&self) -> Option<(Real, Real)> {
        self.p.map(|p| p.window())
    }

    /// QRS start and end.
    pub fn qrs_window(&self) -> Option<(Real, Real)> {
        self.qrs.map(|q| q.window())
    }

    /// T wave start and end.
    pub fn t_window(&self) -> Option<(Real, Real)> {
        self.t.map(|t| t.window())
    }
}

/// Position of the P wave on the independent atrial clock of complete block.
pub fn atrial_p_wave() -> PWave {
    PWave {
        center: ATRIAL_P_CENTER,
        width: ATRIAL_P_WIDTH,
        peak: P_PEAK,
        shape: PWaveShape::Normal,
    }
}
