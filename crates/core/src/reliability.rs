//! Per-frame reliability accounting and the pose-signal gate.
//!
//! The extraction engine feeds every sampled frame through a
//! [`ReliabilityTracker`]. Frames whose pose has too few confident landmarks
//! are dropped from the usable sequence (never zero-filled) but still count
//! as sampled, so the success rate reflects what the detector actually saw.

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::diagnostic::FrameStatistics;
use crate::error::AnalysisError;
use crate::landmarks::LandmarkSet;
use crate::sampling::FrameRequest;

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

pub const RECOMMEND_FULL_BODY: &str =
    "Keep your full body in frame from head to feet for the whole set";
pub const RECOMMEND_LIGHTING: &str = "Increase lighting so your joints are clearly visible";
pub const RECOMMEND_SIDE_ANGLE: &str =
    "Record from a side angle about 2-3 meters away with the camera at hip height";
pub const RECOMMEND_PLAIN_BACKGROUND: &str =
    "Use a plain background and wear fitted clothing that contrasts with it";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A sampled frame whose pose passed the visibility threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub frame_index: u64,
    pub timestamp_secs: f64,
    pub landmarks: LandmarkSet,
    pub visible_count: usize,
}

/// Reasons the pose signal is unreliable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseIssueCode {
    NoPersonDetected,
    LowPoseSuccessRate,
    LowLandmarkVisibility,
}

impl PoseIssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoPersonDetected => "no_person_detected",
            Self::LowPoseSuccessRate => "low_pose_success_rate",
            Self::LowLandmarkVisibility => "low_landmark_visibility",
        }
    }
}

/// Frame statistics for one extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_frames_sampled: usize,
    /// Frames where the estimator returned any pose at all.
    pub frames_with_pose: usize,
    /// Frames that passed the visibility threshold.
    pub usable_frames: usize,
    /// `usable_frames / total_frames_sampled`, 0 when nothing was sampled.
    pub success_rate: f64,
    /// Mean visible-landmark count over frames where a pose was detected.
    pub avg_visible_landmarks: f64,
    pub issues: Vec<PoseIssueCode>,
    pub recommendations: Vec<String>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ReliabilityTracker
// ---------------------------------------------------------------------------

/// Accumulates per-frame results while frames are being sampled.
#[derive(Debug)]
pub struct ReliabilityTracker {
    min_confidence: f64,
    min_visible: usize,
    min_success_rate: f64,
    sampled: usize,
    detected: usize,
    visible_sum: usize,
    frames: Vec<PoseFrame>,
}

impl ReliabilityTracker {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            min_confidence: config.min_landmark_confidence,
            min_visible: config.min_visible_landmarks,
            min_success_rate: config.min_pose_success_rate,
            sampled: 0,
            detected: 0,
            visible_sum: 0,
            frames: Vec::new(),
        }
    }

    /// Record one sampled frame. `None` means no pose (detector miss or an
    /// undecodable frame). Returns whether the frame was usable.
    pub fn record(&mut self, request: FrameRequest, pose: Option<LandmarkSet>) -> bool {
        self.sampled += 1;
        let Some(landmarks) = pose else {
            return false;
        };

        self.detected += 1;
        let visible_count = landmarks.visible_count(self.min_confidence);
        self.visible_sum += visible_count;
        if visible_count < self.min_visible {
            return false;
        }

        self.frames.push(PoseFrame {
            frame_index: request.index,
            timestamp_secs: request.timestamp_secs,
            landmarks,
            visible_count,
        });
        true
    }

    pub fn sampled(&self) -> usize {
        self.sampled
    }

    pub fn usable(&self) -> usize {
        self.frames.len()
    }

    fn success_rate(&self) -> f64 {
        if self.sampled == 0 {
            0.0
        } else {
            self.frames.len() as f64 / self.sampled as f64
        }
    }

    fn avg_visible_landmarks(&self) -> f64 {
        if self.detected == 0 {
            0.0
        } else {
            self.visible_sum as f64 / self.detected as f64
        }
    }

    /// Running counters only; no issue classification.
    pub fn statistics(&self) -> FrameStatistics {
        FrameStatistics {
            total_frames_sampled: self.sampled,
            frames_with_pose: self.detected,
            usable_frames: self.frames.len(),
            success_rate: self.success_rate(),
            avg_visible_landmarks: self.avg_visible_landmarks(),
        }
    }

    /// Full report with issues and recommendations.
    pub fn report(&self) -> QualityReport {
        let success_rate = self.success_rate();
        let avg_visible_landmarks = self.avg_visible_landmarks();

        let mut issues = Vec::new();
        if self.detected == 0 {
            issues.push(PoseIssueCode::NoPersonDetected);
        }
        if success_rate < self.min_success_rate {
            issues.push(PoseIssueCode::LowPoseSuccessRate);
        }
        if avg_visible_landmarks < self.min_visible as f64 {
            issues.push(PoseIssueCode::LowLandmarkVisibility);
        }

        QualityReport {
            total_frames_sampled: self.sampled,
            frames_with_pose: self.detected,
            usable_frames: self.frames.len(),
            success_rate,
            avg_visible_landmarks,
            recommendations: recommendations_for(&issues),
            issues,
        }
    }

    /// Close the run: the usable frames and report, or
    /// [`AnalysisError::InsufficientPoseSignal`] when the gate fails.
    pub fn finish(self) -> Result<(Vec<PoseFrame>, QualityReport), AnalysisError> {
        let report = self.report();
        if report.passed() {
            Ok((self.frames, report))
        } else {
            Err(AnalysisError::InsufficientPoseSignal { report })
        }
    }
}

fn recommendations_for(issues: &[PoseIssueCode]) -> Vec<String> {
    let mut out: Vec<&str> = Vec::new();
    for issue in issues {
        let recs: &[&str] = match issue {
            PoseIssueCode::NoPersonDetected => &[RECOMMEND_FULL_BODY, RECOMMEND_SIDE_ANGLE],
            PoseIssueCode::LowPoseSuccessRate => &[RECOMMEND_FULL_BODY, RECOMMEND_LIGHTING],
            PoseIssueCode::LowLandmarkVisibility => {
                &[RECOMMEND_LIGHTING, RECOMMEND_PLAIN_BACKGROUND]
            }
        };
        for rec in recs {
            if !out.contains(rec) {
                out.push(rec);
            }
        }
    }
    out.into_iter().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{Landmark, LANDMARK_COUNT};
    use assert_matches::assert_matches;

    fn pose(visible: usize) -> LandmarkSet {
        let raw = (0..LANDMARK_COUNT)
            .map(|i| Landmark::new(0.5, 0.5, if i < visible { 0.9 } else { 0.1 }))
            .collect();
        LandmarkSet::new(raw).unwrap()
    }

    fn request(i: u64) -> FrameRequest {
        FrameRequest {
            index: i,
            timestamp_secs: i as f64 / 30.0,
        }
    }

    #[test]
    fn all_good_frames_pass() {
        let mut tracker = ReliabilityTracker::new(&ExtractionConfig::default());
        for i in 0..10 {
            assert!(tracker.record(request(i), Some(pose(25))));
        }
        let (frames, report) = tracker.finish().unwrap();
        assert_eq!(frames.len(), 10);
        assert_eq!(report.success_rate, 1.0);
        assert_eq!(report.avg_visible_landmarks, 25.0);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn half_success_rate_fails() {
        let mut tracker = ReliabilityTracker::new(&ExtractionConfig::default());
        for i in 0..10 {
            let p = if i % 2 == 0 { Some(pose(33)) } else { None };
            tracker.record(request(i), p);
        }
        let err = tracker.finish().unwrap_err();
        assert_matches!(
            err,
            AnalysisError::InsufficientPoseSignal { ref report }
                if report.success_rate == 0.5
                    && report.issues == vec![PoseIssueCode::LowPoseSuccessRate]
        );
    }

    #[test]
    fn sparse_frames_are_excluded_not_zero_filled() {
        let mut tracker = ReliabilityTracker::new(&ExtractionConfig::default());
        for i in 0..10 {
            let visible = if i == 3 { 19 } else { 25 };
            tracker.record(request(i), Some(pose(visible)));
        }
        let (frames, report) = tracker.finish().unwrap();
        assert_eq!(frames.len(), 9);
        assert!(frames.iter().all(|f| f.frame_index != 3));
        assert_eq!(report.frames_with_pose, 10);
        assert_eq!(report.usable_frames, 9);
    }

    #[test]
    fn low_average_visibility_fails() {
        let mut config = ExtractionConfig::default();
        config.min_pose_success_rate = 0.0;
        let mut tracker = ReliabilityTracker::new(&config);
        for i in 0..4 {
            tracker.record(request(i), Some(pose(if i == 0 { 25 } else { 10 })));
        }
        let report = tracker.report();
        assert_eq!(report.issues, vec![PoseIssueCode::LowLandmarkVisibility]);
        assert!(report
            .recommendations
            .contains(&RECOMMEND_LIGHTING.to_string()));
    }

    #[test]
    fn nothing_detected_reports_no_person() {
        let mut tracker = ReliabilityTracker::new(&ExtractionConfig::default());
        for i in 0..5 {
            tracker.record(request(i), None);
        }
        let report = tracker.report();
        assert_eq!(report.avg_visible_landmarks, 0.0);
        assert_eq!(report.issues[0], PoseIssueCode::NoPersonDetected);
        assert_eq!(
            report
                .recommendations
                .iter()
                .filter(|r| r.as_str() == RECOMMEND_FULL_BODY)
                .count(),
            1
        );
    }

    #[test]
    fn statistics_track_report_counters() {
        let mut tracker = ReliabilityTracker::new(&ExtractionConfig::default());
        assert_eq!(tracker.statistics().success_rate, 0.0);
        for i in 0..4 {
            let p = match i {
                0 => None,
                1 => Some(pose(10)),
                _ => Some(pose(30)),
            };
            tracker.record(request(i), p);
        }
        let stats = tracker.statistics();
        assert_eq!(stats.total_frames_sampled, 4);
        assert_eq!(stats.frames_with_pose, 3);
        assert_eq!(stats.usable_frames, 2);
        assert_eq!(stats.success_rate, 0.5);
        assert_eq!(stats.avg_visible_landmarks, 70.0 / 3.0);
        assert_eq!(stats, FrameStatistics::from(&tracker.report()));
    }

    #[test]
    fn empty_run_fails() {
        let tracker = ReliabilityTracker::new(&ExtractionConfig::default());
        assert!(tracker.finish().is_err());
    }
}
