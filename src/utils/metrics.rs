//! Strip metrics: trace statistics, R-peak detection and the rate meter.

use std::collections::VecDeque;

use crate::types::{rate_for_interval, Bpm, Real, SamplePoint, Time};

/// Summary statistics over a window of samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceStats {
    /// Number of samples.
    pub count: usize,
    /// Maximum voltage.
    pub max: Real,
    /// Minimum voltage.
    pub min: Real,
    /// Mean voltage.
    pub mean: Real,
    /// Population variance.
    pub variance: Real,
}

impl TraceStats {
    /// Computes statistics from samples.
    pub fn from_samples(samples: &[SamplePoint]) -> Self {
        if samples.is_empty() {
            return Self {
                count: 0,
                max: 0.0,
                min: 0.0,
                mean: 0.0,
                variance: 0.0,
            };
        }

        let n = samples.len() as Real;
        let mean = samples.iter().map(|s| s.voltage).sum::<Real>() / n;
        let max = samples.iter().map(|s| s.voltage).fold(Real::MIN, Real::max);
        let min = samples.iter().map(|s| s.voltage).fold(Real::MAX, Real::min);
        let variance = samples
            .iter()
            .map(|s| (s.voltage - mean).powi(2))
            .sum::<Real>()
            / n;

        Self {
            count: samples.len(),
            max,
            min,
            mean,
            variance,
        }
    }

    /// Standard deviation.
    pub fn std_dev(&self) -> Real {
        self.variance.sqrt()
    }

    /// Peak-to-peak amplitude.
    pub fn range(&self) -> Real {
        self.max - self.min
    }
}

/// Finds R-peak times: local maxima above `threshold`, at least `refractory`
/// strip units apart. When two candidates collide the taller one wins.
pub fn detect_peaks(samples: &[SamplePoint], threshold: Real, refractory: Time) -> Vec<Time> {
    let mut peaks: Vec<SamplePoint> = Vec::new();

    for window in samples.windows(3) {
        let (prev, cur, next) = (window[0], window[1], window[2]);
        if cur.voltage < threshold || cur.voltage < prev.voltage || cur.voltage <= next.voltage {
            continue;
        }
        match peaks.last_mut() {
            Some(last) if cur.time - last.time < refractory => {
                if cur.voltage > last.voltage {
                    *last = cur;
                }
            }
            _ => peaks.push(cur),
        }
    }

    peaks.into_iter().map(|p| p.time).collect()
}

/// Mean spacing between consecutive times, if there are at least two.
pub fn mean_spacing(times: &[Time]) -> Option<Time> {
    if times.len() < 2 {
        return None;
    }
    let total: Time = times.windows(2).map(|w| w[1] - w[0]).sum();
    Some(total / (times.len() - 1) as Time)
}

/// Rolling ventricular rate estimate behind the "current BPM" label.
#[derive(Debug, Clone)]
pub struct RateMeter {
    intervals: VecDeque<Time>,
    capacity: usize,
    last_beat: Option<Time>,
}

impl RateMeter {
    /// Creates a meter averaging over the last `capacity` intervals.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            intervals: VecDeque::with_capacity(capacity),
            capacity,
            last_beat: None,
        }
    }

    /// Records a conducted ventricular beat at `time`.
    pub fn record_beat(&mut self, time: Time) {
        if let Some(last) = self.last_beat {
            let interval = time - last;
            if interval > 0.0 {
                if self.intervals.len() == self.capacity {
                    self.intervals.pop_front();
                }
                self.intervals.push_back(interval);
            }
        }
        self.last_beat = Some(time);
    }

    /// Forgets all history.
    pub fn clear(&mut self) {
        self.intervals.clear();
        self.last_beat = None;
    }

    /// Average rate over the recorded intervals.
    pub fn bpm(&self) -> Option<Bpm> {
        if self.intervals.is_empty() {
            return None;
        }
        let mean = self.intervals.iter().sum::<Time>() / self.intervals.len() as Time;
        Some(rate_for_interval(mean))
    }

    /// Text label such as `"72 bpm"`, or `"---"` when no rate is known.
    pub fn label(&self) -> String {
        match self.bpm() {
            Some(bpm) => format!("{} bpm", bpm.round() as i64),
            None => "---".to_string(),
        }
    }
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(8)
    }
}
