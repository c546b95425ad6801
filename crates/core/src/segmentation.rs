//! Repetition segmentation from a tracking signal.
//!
//! Both tracking signals (hip angle for squats, hip-to-shoulder vertical
//! displacement for hinges) fall at the bottom of the lift. Each rep is
//! centred on one valley of the conditioned signal and bounded by the
//! highest sample between it and the neighbouring valley (or the edge of
//! the gap-free segment).

use serde::{Deserialize, Serialize};

use crate::exercise::{ExerciseType, MovementPattern};
use crate::movement::MovementSummary;
use crate::series::MetricSeries;
use crate::signal::{self, HampelConfig};
use crate::types::SamplePos;

// ---------------------------------------------------------------------------
// Per-exercise parameters
// ---------------------------------------------------------------------------

/// Squat smoothing window, seconds.
pub const SQUAT_SMOOTHING_SECS: f64 = 0.2;
/// Minimum hip-angle swing for a squat rep, degrees.
pub const SQUAT_MIN_PROMINENCE_DEG: f64 = 20.0;
/// Minimum time between squat bottoms, seconds.
pub const SQUAT_MIN_SEPARATION_SECS: f64 = 1.0;

/// Hinge smoothing window, seconds.
pub const HINGE_SMOOTHING_SECS: f64 = 0.3;
/// Minimum hip-to-shoulder vertical swing for a hinge rep, normalized image units.
pub const HINGE_MIN_PROMINENCE: f64 = 0.04;
/// Minimum time between hinge bottoms, seconds.
pub const HINGE_MIN_SEPARATION_SECS: f64 = 1.5;

/// Hampel half-window in samples, shared by both patterns.
pub const DESPIKE_HALF_WINDOW: usize = 2;
/// Hampel outlier threshold in sigmas.
pub const DESPIKE_THRESHOLD: f64 = 3.0;
/// Shortest accepted rep, in samples (inclusive of both boundaries).
pub const MIN_REP_SAMPLES: usize = 3;

/// Assumed sample interval when the series has no usable timestamps (30 fps).
const FALLBACK_SAMPLE_INTERVAL_SECS: f64 = 1.0 / 30.0;

/// Signal conditioning and detection parameters for one exercise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationParams {
    pub smoothing_secs: f64,
    pub despike: HampelConfig,
    pub min_prominence: f64,
    pub min_separation_secs: f64,
    pub min_rep_samples: usize,
}

impl SegmentationParams {
    pub fn for_exercise(exercise: ExerciseType) -> Self {
        let despike = HampelConfig {
            half_window: DESPIKE_HALF_WINDOW,
            threshold: DESPIKE_THRESHOLD,
        };
        match exercise.pattern() {
            MovementPattern::Squat => Self {
                smoothing_secs: SQUAT_SMOOTHING_SECS,
                despike,
                min_prominence: SQUAT_MIN_PROMINENCE_DEG,
                min_separation_secs: SQUAT_MIN_SEPARATION_SECS,
                min_rep_samples: MIN_REP_SAMPLES,
            },
            MovementPattern::Hinge => Self {
                smoothing_secs: HINGE_SMOOTHING_SECS,
                despike,
                min_prominence: HINGE_MIN_PROMINENCE,
                min_separation_secs: HINGE_MIN_SEPARATION_SECS,
                min_rep_samples: MIN_REP_SAMPLES,
            },
        }
    }

    /// Smoothing window in samples (odd) for a given sample interval.
    pub fn smoothing_window(&self, interval_secs: f64) -> usize {
        signal::odd_window(secs_to_samples(self.smoothing_secs, interval_secs))
    }

    /// Minimum separation in samples (at least 1) for a given sample interval.
    pub fn min_separation(&self, interval_secs: f64) -> usize {
        secs_to_samples(self.min_separation_secs, interval_secs).max(1)
    }
}

fn secs_to_samples(secs: f64, interval_secs: f64) -> usize {
    if interval_secs <= 0.0 || !interval_secs.is_finite() {
        return 1;
    }
    (secs / interval_secs).round().max(0.0) as usize
}

// ---------------------------------------------------------------------------
// Reps
// ---------------------------------------------------------------------------

/// One repetition, in positions of the usable pose-frame sequence.
///
/// `start..=end` is inclusive. Consecutive reps may share their boundary
/// sample (`end` of one equals `start` of the next) but never overlap
/// beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rep {
    pub start: SamplePos,
    pub end: SamplePos,
    pub extremum: SamplePos,
    /// Conditioned tracking-signal value at the extremum.
    pub extremum_value: f64,
}

impl Rep {
    pub fn sample_count(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, pos: SamplePos) -> bool {
        (self.start..=self.end).contains(&pos)
    }
}

/// Segmentation output, including diagnostics for the empty case.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub reps: Vec<Rep>,
    /// Valleys that cleared prominence and separation, before rep-length
    /// filtering.
    pub candidate_extrema: usize,
    pub segments_analyzed: usize,
}

/// What was measured before segmentation came up empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialMetrics {
    pub tracking_signal: String,
    pub usable_samples: usize,
    pub measured_samples: usize,
    pub signal_range: Option<(f64, f64)>,
    pub candidate_extrema: usize,
    pub movement: Option<MovementSummary>,
}

impl PartialMetrics {
    pub fn new(series: &MetricSeries, segmentation: &Segmentation) -> Self {
        Self {
            tracking_signal: series.name.clone(),
            usable_samples: series.len(),
            measured_samples: series.measured_count(),
            signal_range: series.range(),
            candidate_extrema: segmentation.candidate_extrema,
            movement: None,
        }
    }

    pub fn with_movement(mut self, movement: Option<MovementSummary>) -> Self {
        self.movement = movement;
        self
    }
}

// ---------------------------------------------------------------------------
// Segmentation
// ---------------------------------------------------------------------------

/// Detect reps in a tracking series. Returns an empty rep list (not an
/// error) when the signal is flat, too short, or too gappy; the caller
/// decides how to classify that.
pub fn segment(series: &MetricSeries, params: &SegmentationParams) -> Segmentation {
    let interval = series
        .median_interval()
        .unwrap_or(FALLBACK_SAMPLE_INTERVAL_SECS);
    let window = params.smoothing_window(interval);
    let separation = params.min_separation(interval);

    let mut reps = Vec::new();
    let mut candidate_extrema = 0;
    let segments = series.contiguous_segments();

    for seg in &segments {
        let despiked = signal::hampel_filter(&seg.values, &params.despike);
        let smoothed = signal::moving_average(&despiked, window);
        let valleys = signal::find_valleys(&smoothed, params.min_prominence, separation);
        candidate_extrema += valleys.len();

        let centres: Vec<usize> = valleys.iter().map(|v| v.index).collect();
        for (k, &centre) in centres.iter().enumerate() {
            let start = match k {
                0 => argmax(&smoothed, 0, centre),
                _ => argmax(&smoothed, centres[k - 1], centre),
            };
            let end = match centres.get(k + 1) {
                Some(&next) => argmax(&smoothed, centre, next),
                None => argmax(&smoothed, centre, smoothed.len() - 1),
            };
            if end - start + 1 < params.min_rep_samples {
                continue;
            }
            reps.push(Rep {
                start: seg.offset + start,
                end: seg.offset + end,
                extremum: seg.offset + centre,
                extremum_value: smoothed[centre],
            });
        }
    }

    Segmentation {
        reps,
        candidate_extrema,
        segments_analyzed: segments.len(),
    }
}

/// Index of the largest value in `values[from..=to]`, earliest on ties.
fn argmax(values: &[f64], from: usize, to: usize) -> usize {
    let mut best = from;
    for i in from..=to {
        if values[i] > values[best] {
            best = i;
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn series_from(values: Vec<Option<f64>>, fps: f64) -> MetricSeries {
        MetricSeries {
            name: "hip_angle".into(),
            timestamps: (0..values.len()).map(|i| i as f64 / fps).collect(),
            values,
        }
    }

    fn cosine_params() -> SegmentationParams {
        SegmentationParams {
            smoothing_secs: 5.0 / 30.0,
            despike: HampelConfig::default(),
            min_prominence: 0.5,
            min_separation_secs: 10.0 / 30.0,
            min_rep_samples: MIN_REP_SAMPLES,
        }
    }

    // -- segment -------------------------------------------------------------

    #[test]
    fn three_cosine_cycles_give_three_reps() {
        let values = (0..91)
            .map(|i| Some((2.0 * PI * i as f64 / 30.0).cos()))
            .collect();
        let seg = segment(&series_from(values, 30.0), &cosine_params());
        let bounds: Vec<(usize, usize, usize)> = seg
            .reps
            .iter()
            .map(|r| (r.start, r.extremum, r.end))
            .collect();
        assert_eq!(bounds, vec![(0, 15, 30), (30, 45, 60), (60, 75, 90)]);
    }

    #[test]
    fn reps_are_ordered_and_non_overlapping() {
        let values = (0..200)
            .map(|i| Some(140.0 + 40.0 * (2.0 * PI * i as f64 / 45.0).cos()))
            .collect();
        let params = SegmentationParams::for_exercise(ExerciseType::BackSquat);
        let seg = segment(&series_from(values, 30.0), &params);
        assert_eq!(seg.reps.len(), 4);
        for pair in seg.reps.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert!(seg.reps.iter().all(|r| r.end < 200 && r.contains(r.extremum)));
    }

    #[test]
    fn flat_signal_has_no_reps() {
        let seg = segment(&series_from(vec![Some(170.0); 120], 30.0), &cosine_params());
        assert!(seg.reps.is_empty());
        assert_eq!(seg.candidate_extrema, 0);
    }

    #[test]
    fn empty_series_has_no_reps() {
        let seg = segment(&series_from(Vec::new(), 30.0), &cosine_params());
        assert!(seg.reps.is_empty());
        assert_eq!(seg.segments_analyzed, 0);
    }

    #[test]
    fn reps_keep_positions_across_gap_split() {
        let mut values: Vec<Option<f64>> = (0..91)
            .map(|i| Some((2.0 * PI * i as f64 / 30.0).cos()))
            .collect();
        // Four missing samples at the top of the second cycle split the series.
        for v in values.iter_mut().skip(28).take(4) {
            *v = None;
        }
        let seg = segment(&series_from(values, 30.0), &cosine_params());
        assert_eq!(seg.segments_analyzed, 2);
        let extrema: Vec<usize> = seg.reps.iter().map(|r| r.extremum).collect();
        assert_eq!(extrema, vec![15, 45, 75]);
    }

    #[test]
    fn single_spike_does_not_create_a_rep() {
        let mut values = vec![Some(170.0); 90];
        values[40] = Some(60.0);
        let params = SegmentationParams::for_exercise(ExerciseType::FrontSquat);
        assert!(segment(&series_from(values, 30.0), &params).reps.is_empty());
    }

    // -- params --------------------------------------------------------------

    #[test]
    fn params_convert_seconds_to_samples() {
        let params = SegmentationParams::for_exercise(ExerciseType::BackSquat);
        assert_eq!(params.smoothing_window(1.0 / 30.0), 7);
        assert_eq!(params.min_separation(1.0 / 30.0), 30);
        assert_eq!(params.smoothing_window(1.0), 1);
        assert_eq!(params.min_separation(1.0), 1);
    }

    #[test]
    fn hinge_params_use_displacement_units() {
        let params = SegmentationParams::for_exercise(ExerciseType::ConventionalDeadlift);
        assert_eq!(params.min_prominence, HINGE_MIN_PROMINENCE);
        assert!(params.min_separation_secs > SQUAT_MIN_SEPARATION_SECS);
    }
}
