//! Metric series over the usable pose-frame sequence and gap handling.
//!
//! A [`MetricSeries`] has exactly one entry per usable [`PoseFrame`]. Frames
//! where the underlying landmarks were not visible enough hold `None`; gaps
//! are explicit and never silently zero.

use serde::{Deserialize, Serialize};

use crate::reliability::PoseFrame;
use crate::types::SamplePos;

/// Interior gaps up to this many samples are linearly interpolated.
pub const MAX_INTERPOLATED_GAP: usize = 2;

/// Contiguous runs shorter than this are discarded.
pub const MIN_SEGMENT_SAMPLES: usize = 3;

/// A named signal sampled once per usable pose frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub name: String,
    pub timestamps: Vec<f64>,
    pub values: Vec<Option<f64>>,
}

/// A gap-free stretch of a series, positioned within the usable sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSegment {
    /// Position of `values[0]` in the usable sequence.
    pub offset: SamplePos,
    pub values: Vec<f64>,
}

impl SeriesSegment {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl MetricSeries {
    /// Evaluate `measure` on every frame. Non-finite measurements become `None`.
    pub fn from_frames<F>(name: &str, frames: &[PoseFrame], measure: F) -> Self
    where
        F: Fn(&PoseFrame) -> Option<f64>,
    {
        Self {
            name: name.to_string(),
            timestamps: frames.iter().map(|f| f.timestamp_secs).collect(),
            values: frames
                .iter()
                .map(|f| measure(f).filter(|v| v.is_finite()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn measured_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// `(min, max)` over measured values.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values.iter().flatten().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Median spacing between consecutive timestamps, in seconds.
    pub fn median_interval(&self) -> Option<f64> {
        let mut deltas: Vec<f64> = self
            .timestamps
            .windows(2)
            .map(|w| w[1] - w[0])
            .filter(|d| d.is_finite() && *d > 0.0)
            .collect();
        if deltas.is_empty() {
            return None;
        }
        deltas.sort_by(f64::total_cmp);
        Some(deltas[deltas.len() / 2])
    }

    /// Split the series into gap-free segments.
    ///
    /// Interior gaps of at most [`MAX_INTERPOLATED_GAP`] samples are filled
    /// by interpolating linearly in time between the neighbouring values;
    /// longer gaps split the series. Leading and trailing gaps are dropped,
    /// as are segments shorter than [`MIN_SEGMENT_SAMPLES`].
    pub fn contiguous_segments(&self) -> Vec<SeriesSegment> {
        let mut segments = Vec::new();
        let mut current: Option<SeriesSegment> = None;
        let mut last_measured: Option<SamplePos> = None;

        for (pos, value) in self.values.iter().enumerate() {
            let Some(v) = *value else {
                continue;
            };

            let bridged = match (current.as_mut(), last_measured) {
                (Some(seg), Some(prev)) if pos - prev - 1 <= MAX_INTERPOLATED_GAP => {
                    let prev_value = self.values[prev].unwrap_or(v);
                    for gap_pos in prev + 1..pos {
                        seg.values
                            .push(self.interpolate(prev, prev_value, pos, v, gap_pos));
                    }
                    seg.values.push(v);
                    true
                }
                _ => false,
            };
            if !bridged {
                if let Some(done) = current.take() {
                    segments.push(done);
                }
                current = Some(SeriesSegment {
                    offset: pos,
                    values: vec![v],
                });
            }
            last_measured = Some(pos);
        }
        if let Some(done) = current {
            segments.push(done);
        }

        segments.retain(|s| s.len() >= MIN_SEGMENT_SAMPLES);
        segments
    }

    fn interpolate(&self, p0: usize, v0: f64, p1: usize, v1: f64, at: usize) -> f64 {
        let (t0, t1, t) = (self.timestamps[p0], self.timestamps[p1], self.timestamps[at]);
        let span = t1 - t0;
        let frac = if span.abs() > f64::EPSILON {
            (t - t0) / span
        } else {
            (at - p0) as f64 / (p1 - p0) as f64
        };
        v0 + (v1 - v0) * frac
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
