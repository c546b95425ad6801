//! Movement-window detection.
//!
//! Separates the working set from setup and rest: the mean speed of the
//! twelve major joints between consecutive usable frames is thresholded,
//! and the longest sufficiently long run of motion is the main movement
//! period. Purely informational; it never changes scoring.

use serde::{Deserialize, Serialize};

use crate::config::MovementConfig;
use crate::geometry::{self, Point};
use crate::landmarks::BodyPart;
use crate::reliability::PoseFrame;
use crate::types::SamplePos;

/// A contiguous run of motion, in usable-sequence positions (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementPeriod {
    pub start: SamplePos,
    pub end: SamplePos,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl MovementPeriod {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// Where the lifter was actually moving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementSummary {
    /// Longest movement period, if any run qualified.
    pub main_period: Option<MovementPeriod>,
    pub period_count: usize,
    /// Usable frames before the main period.
    pub setup_samples: usize,
    /// Usable frames after the main period.
    pub rest_samples: usize,
    /// Mean joint speed over the whole clip, normalized units per second.
    pub mean_motion: f64,
    pub peak_motion: f64,
}

impl MovementSummary {
    pub fn movement_detected(&self) -> bool {
        self.main_period.is_some()
    }
}

/// Summarize motion over the usable frame sequence.
pub fn summarize(frames: &[PoseFrame], config: &MovementConfig) -> MovementSummary {
    let rates = motion_rates(frames, config.joint_confidence);
    let periods = movement_periods(frames, &rates, config);

    let main_period = periods.iter().copied().fold(None, |best: Option<MovementPeriod>, p| {
        match best {
            Some(b) if b.duration_secs() >= p.duration_secs() => Some(b),
            _ => Some(p),
        }
    });

    let (setup_samples, rest_samples) = match main_period {
        Some(p) => (p.start, frames.len().saturating_sub(p.end + 1)),
        None => (0, 0),
    };

    let mean_motion = if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64
    };

    MovementSummary {
        main_period,
        period_count: periods.len(),
        setup_samples,
        rest_samples,
        mean_motion,
        peak_motion: rates.iter().copied().fold(0.0, f64::max),
    }
}

/// Joint speed between each pair of consecutive frames (`len - 1` entries).
fn motion_rates(frames: &[PoseFrame], min_confidence: f64) -> Vec<f64> {
    frames
        .windows(2)
        .map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            let dt = curr.timestamp_secs - prev.timestamp_secs;
            if dt <= 0.0 || !dt.is_finite() {
                return 0.0;
            }

            let mut total = 0.0;
            let mut joints = 0usize;
            for part in BodyPart::MAJOR_JOINTS {
                let (Some(a), Some(b)) = (
                    prev.landmarks.visible(part, min_confidence),
                    curr.landmarks.visible(part, min_confidence),
                ) else {
                    continue;
                };
                if let Ok(d) = geometry::distance(Point::new(a.x, a.y), Point::new(b.x, b.y)) {
                    total += d;
                    joints += 1;
                }
            }

            if joints == 0 {
                0.0
            } else {
                total / joints as f64 / dt
            }
        })
        .collect()
}

fn movement_periods(
    frames: &[PoseFrame],
    rates: &[f64],
    config: &MovementConfig,
) -> Vec<MovementPeriod> {
    let mut periods = Vec::new();
    let mut run_start: Option<usize> = None;

    // Rate k spans frames k..=k+1; a trailing sentinel closes an open run.
    for k in 0..=rates.len() {
        let moving = rates.get(k).is_some_and(|r| *r > config.motion_threshold);
        match (moving, run_start) {
            (true, None) => run_start = Some(k),
            (false, Some(first)) => {
                let period = MovementPeriod {
                    start: first,
                    end: k,
                    start_secs: frames[first].timestamp_secs,
                    end_secs: frames[k].timestamp_secs,
                };
                if period.duration_secs() >= config.min_movement_secs {
                    periods.push(period);
                }
                run_start = None;
            }
            _ => {}
        }
    }
    periods
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Landmark, LandmarkSet, LANDMARK_COUNT};

    /// Body shifted vertically by `offset`.
    fn frame(i: usize, fps: f64, offset: f64) -> PoseFrame {
        let raw = (0..LANDMARK_COUNT)
            .map(|k| Landmark::new(0.3 + k as f64 * 0.01, 0.2 + k as f64 * 0.02 + offset, 0.9))
            .collect();
        PoseFrame {
            frame_index: i as u64,
            timestamp_secs: i as f64 / fps,
            landmarks: LandmarkSet::new(raw).unwrap(),
            visible_count: LANDMARK_COUNT,
        }
    }

    #[test]
    fn still_then_moving_then_still() {
        // 1s still, 2s moving at 0.1 units/s, 1s still (30 fps).
        let frames: Vec<PoseFrame> = (0..120)
            .map(|i| {
                let t = i as f64 / 30.0;
                let offset = (t.clamp(1.0, 3.0) - 1.0) * 0.1;
                frame(i, 30.0, offset)
            })
            .collect();
        let summary = summarize(&frames, &MovementConfig::default());
        let period = summary.main_period.unwrap();
        assert_eq!(period.start, 30);
        assert_eq!(period.end, 90);
        assert_eq!(summary.setup_samples, 30);
        assert_eq!(summary.rest_samples, 29);
        assert!((summary.peak_motion - 0.1).abs() < 1e-6);
    }

    #[test]
    fn motionless_clip_has_no_period() {
        let frames: Vec<PoseFrame> = (0..60).map(|i| frame(i, 30.0, 0.0)).collect();
        let summary = summarize(&frames, &MovementConfig::default());
        assert!(!summary.movement_detected());
        assert_eq!(summary.mean_motion, 0.0);
    }

    #[test]
    fn brief_twitch_is_not_a_period() {
        let frames: Vec<PoseFrame> = (0..60)
            .map(|i| frame(i, 30.0, if (20..25).contains(&i) { 0.05 } else { 0.0 }))
            .collect();
        let summary = summarize(&frames, &MovementConfig::default());
        assert_eq!(summary.period_count, 0);
    }

    #[test]
    fn too_few_frames_is_empty() {
        let summary = summarize(&[frame(0, 30.0, 0.0)], &MovementConfig::default());
        assert!(summary.main_period.is_none());
        assert_eq!(summary.peak_motion, 0.0);
    }
}
