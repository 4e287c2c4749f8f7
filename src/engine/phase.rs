//! Maps beat progress to a named cardiac phase.

use crate::engine::layout::{atrial_p_wave, BeatLayout};
use crate::engine::scheduler::CycleState;
use crate::rhythms::{BlockKind, RhythmClass, RhythmDefinition};
use crate::types::{CardiacPhase, PhaseEvent, Real, Time};

/// Reads the scheduler state and reports which phase a time falls in.
///
/// Classification never mutates the state, and uses the same
/// [`BeatLayout`] the synthesizer draws from.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseClassifier;

impl PhaseClassifier {
    /// Phase event for `time`, with the beat flags copied from `state`.
    pub fn classify(time: Time, def: &RhythmDefinition, state: &CycleState) -> PhaseEvent {
        PhaseEvent {
            time,
            phase: Self::phase(time, def, state),
            is_premature: state.is_premature(),
            is_dropped: state.is_dropped(),
            wenckebach_count: state.wenckebach_count(),
            pause: state.is_paused(),
        }
    }

    /// Phase only.
    pub fn phase(time: Time, def: &RhythmDefinition, state: &CycleState) -> CardiacPhase {
        if matches!(def.class, RhythmClass::Chaos) {
            return CardiacPhase::Rest;
        }

        let layout = BeatLayout::for_beat(def, state);
        let ventricular = Self::phase_at(state.progress(time), &layout);

        match def.class {
            RhythmClass::Block {
                kind: BlockKind::Complete { .. },
            } if ventricular == CardiacPhase::Rest && def.morphology.has_p => {
                let (start, end) = atrial_p_wave().window();
                if within(state.atrial_progress(time), start, end) {
                    CardiacPhase::PWave
                } else {
                    CardiacPhase::Rest
                }
            }
            _ => ventricular,
        }
    }

    /// Phase at a beat progress for a given layout.
    pub fn phase_at(progress: Real, layout: &BeatLayout) -> CardiacPhase {
        let p = layout.p_window();
        let qrs = layout.qrs_window();
        let t = layout.t_window();

        if let Some((start, end)) = qrs {
            if within(progress, start, end) {
                return CardiacPhase::Qrs;
            }
        }
        if let Some((start, end)) = t {
            if within(progress, start, end) {
                return CardiacPhase::TWave;
            }
        }
        if let (Some((_, qrs_end)), Some((t_start, _))) = (qrs, t) {
            if progress > qrs_end && progress < t_start {
                return CardiacPhase::StSegment;
            }
        }
        if let Some((start, end)) = p {
            if within(progress, start, end) {
                return CardiacPhase::PWave;
            }
            if let Some((qrs_start, _)) = qrs {
                if progress > end && progress < qrs_start {
                    return CardiacPhase::PrSegment;
                }
            }
        }
        CardiacPhase::Rest
    }
}

fn within(x: Real, start: Real, end: Real) -> bool {
    x >= start && x <= end
}
