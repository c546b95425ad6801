//! Diagnostic reporter: the terminal states of an analysis request.
//!
//! Every request ends in exactly one [`AnalysisOutcome`]. A failure is always
//! classified into a [`FailureCause`] and carries the context it was raised
//! with (gate findings, frame statistics, partial metrics, metadata echo)
//! plus concrete advice for the next recording.

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisResult;
use crate::error::AnalysisError;
use crate::metadata::RawVideoMetadata;
use crate::movement::MovementSummary;
use crate::quality_gate::{GateIssueCode, QualityGateOutcome};
use crate::reliability::{QualityReport, RECOMMEND_FULL_BODY, RECOMMEND_SIDE_ANGLE};
use crate::segmentation::PartialMetrics;

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

pub const RECOMMEND_MORE_REPS: &str =
    "Record more repetitions: at least 2 full reps with a controlled pace";
pub const RECOMMEND_NO_MOVEMENT: &str =
    "No movement was detected: start recording just before the first rep";
pub const RECOMMEND_FULL_RANGE: &str =
    "Perform each rep through its full range of motion so the bottom position is clear";
pub const RECOMMEND_RESOLUTION: &str = "Record at 720p or higher";
pub const RECOMMEND_LONGER_CLIP: &str = "Record a clip of 5-15 seconds covering 2-5 full repetitions";
pub const RECOMMEND_TRIM: &str = "Trim the video to just the working set (5-15 seconds is ideal)";
pub const RECOMMEND_FRAME_RATE: &str = "Record at 30 fps or higher";
pub const RECOMMEND_REEXPORT: &str = "Re-export the video as MP4 (H.264) and upload it again";
pub const RECOMMEND_SHORTER_CLIP: &str = "Upload a shorter clip so the analysis can finish in time";
pub const RECOMMEND_RETRY: &str = "Submit the video again when you are ready";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Why a request produced no analysis result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    QualityGateFailed,
    InsufficientPoseSignal,
    NoRepsDetected,
    /// The external per-request deadline elapsed.
    PipelineTimeout,
    /// The client went away before the request finished.
    Cancelled,
}

impl FailureCause {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QualityGateFailed => "quality_gate_failed",
            Self::InsufficientPoseSignal => "insufficient_pose_signal",
            Self::NoRepsDetected => "no_reps_detected",
            Self::PipelineTimeout => "pipeline_timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Pipeline stage, reported on timeout and cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    QualityGate,
    PoseExtraction,
    Analysis,
}

impl PipelineStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::QualityGate => "quality_gate",
            Self::PoseExtraction => "pose_extraction",
            Self::Analysis => "analysis",
        }
    }
}

/// Frame counters copied out of a [`QualityReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStatistics {
    pub total_frames_sampled: usize,
    pub frames_with_pose: usize,
    pub usable_frames: usize,
    pub success_rate: f64,
    pub avg_visible_landmarks: f64,
}

impl From<&QualityReport> for FrameStatistics {
    fn from(report: &QualityReport) -> Self {
        Self {
            total_frames_sampled: report.total_frames_sampled,
            frames_with_pose: report.frames_with_pose,
            usable_frames: report.usable_frames,
            success_rate: report.success_rate,
            avg_visible_landmarks: report.avg_visible_landmarks,
        }
    }
}

/// Structured, user-actionable failure report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub cause: FailureCause,
    pub message: String,
    /// Machine-readable issue codes.
    pub issues: Vec<String>,
    /// Human-readable explanation for each finding, in `issues` order where
    /// a message exists.
    pub issue_details: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_statistics: Option<FrameStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RawVideoMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_metrics: Option<PartialMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<PipelineStage>,
}

impl Diagnostic {
    fn empty(cause: FailureCause, message: String) -> Self {
        Self {
            cause,
            message,
            issues: Vec::new(),
            issue_details: Vec::new(),
            recommendations: Vec::new(),
            frame_statistics: None,
            metadata: None,
            quality_score: None,
            partial_metrics: None,
            stage: None,
        }
    }

    /// Classify a pipeline failure.
    pub fn from_error(error: &AnalysisError) -> Self {
        let mut diagnostic = Self::empty(error.cause(), error.to_string());
        match error {
            AnalysisError::QualityGateFailed { metadata, outcome } => {
                diagnostic.fill_gate(outcome);
                diagnostic.metadata = metadata.clone();
            }
            AnalysisError::InsufficientPoseSignal { report } => {
                diagnostic.fill_report(report);
                diagnostic.issues = report.issues.iter().map(|c| c.as_str().to_string()).collect();
                diagnostic.issue_details = vec![format!(
                    "Only {} of {} sampled frames had a usable pose ({:.0}% success, {:.1} landmarks visible on average)",
                    report.usable_frames,
                    report.total_frames_sampled,
                    report.success_rate * 100.0,
                    report.avg_visible_landmarks
                )];
                diagnostic.recommendations = report.recommendations.clone();
            }
            AnalysisError::NoRepsDetected { report, partial } => {
                diagnostic.fill_report(report);
                diagnostic.issues = vec![FailureCause::NoRepsDetected.as_str().to_string()];
                diagnostic.issue_details = vec![format!(
                    "No repetitions found in the {} signal ({} of {} usable frames measured)",
                    partial.tracking_signal, partial.measured_samples, partial.usable_samples
                )];
                diagnostic.recommendations = no_reps_recommendations(partial.movement.as_ref());
                diagnostic.partial_metrics = Some(partial.clone());
            }
        }
        diagnostic
    }

    /// The external deadline elapsed while `stage` was running.
    pub fn timeout(limit_secs: u64, stage: PipelineStage) -> Self {
        let mut diagnostic = Self::empty(
            FailureCause::PipelineTimeout,
            format!("Analysis exceeded the {limit_secs}s limit during {}", stage.as_str()),
        );
        diagnostic.issues = vec![FailureCause::PipelineTimeout.as_str().to_string()];
        diagnostic.recommendations = vec![RECOMMEND_SHORTER_CLIP.to_string()];
        diagnostic.stage = Some(stage);
        diagnostic
    }

    /// The request was cancelled while `stage` was running.
    pub fn cancelled(stage: PipelineStage) -> Self {
        let mut diagnostic = Self::empty(
            FailureCause::Cancelled,
            format!("Analysis cancelled during {}", stage.as_str()),
        );
        diagnostic.issues = vec![FailureCause::Cancelled.as_str().to_string()];
        diagnostic.recommendations = vec![RECOMMEND_RETRY.to_string()];
        diagnostic.stage = Some(stage);
        diagnostic
    }

    /// Echo the video metadata, if not already present.
    pub fn with_metadata(mut self, metadata: Option<RawVideoMetadata>) -> Self {
        if self.metadata.is_none() {
            self.metadata = metadata;
        }
        self
    }

    /// Attach frame statistics gathered before the failure, if not already
    /// present.
    pub fn with_frame_statistics(mut self, stats: Option<FrameStatistics>) -> Self {
        if self.frame_statistics.is_none() {
            self.frame_statistics = stats;
        }
        self
    }

    fn fill_gate(&mut self, outcome: &QualityGateOutcome) {
        let findings = outcome.issues.iter().chain(outcome.warnings.iter());
        for finding in findings {
            self.issues.push(finding.code.as_str().to_string());
            self.issue_details.push(finding.message.clone());
            let rec = gate_recommendation(finding.code);
            if !self.recommendations.iter().any(|r| r == rec) {
                self.recommendations.push(rec.to_string());
            }
        }
        self.quality_score = Some(outcome.quality_score);
    }

    fn fill_report(&mut self, report: &QualityReport) {
        self.frame_statistics = Some(FrameStatistics::from(report));
    }

    pub fn has_issue(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i == code)
    }
}

impl From<AnalysisError> for Diagnostic {
    fn from(error: AnalysisError) -> Self {
        Self::from_error(&error)
    }
}

fn gate_recommendation(code: GateIssueCode) -> &'static str {
    match code {
        GateIssueCode::UnreadableVideo => RECOMMEND_REEXPORT,
        GateIssueCode::ResolutionBelowMinimum | GateIssueCode::BelowRecommendedResolution => {
            RECOMMEND_RESOLUTION
        }
        GateIssueCode::DurationBelowMinimum | GateIssueCode::DurationBelowOptimal => {
            RECOMMEND_LONGER_CLIP
        }
        GateIssueCode::DurationExceedsMaximum | GateIssueCode::DurationAboveOptimal => {
            RECOMMEND_TRIM
        }
        GateIssueCode::FrameRateBelowMinimum => RECOMMEND_FRAME_RATE,
    }
}

fn no_reps_recommendations(movement: Option<&MovementSummary>) -> Vec<String> {
    let mut recs = Vec::new();
    if movement.is_some_and(|m| !m.movement_detected()) {
        recs.push(RECOMMEND_NO_MOVEMENT);
    }
    recs.extend([RECOMMEND_MORE_REPS, RECOMMEND_FULL_RANGE, RECOMMEND_SIDE_ANGLE, RECOMMEND_FULL_BODY]);
    recs.into_iter().map(str::to_string).collect()
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Terminal state of one request. Success is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    Success(AnalysisResult),
    Failure(Diagnostic),
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            Self::Success(result) => Some(result),
            Self::Failure(_) => None,
        }
    }

    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Success(_) => None,
            Self::Failure(diagnostic) => Some(diagnostic),
        }
    }

    pub fn failure_cause(&self) -> Option<FailureCause> {
        self.diagnostic().map(|d| d.cause)
    }
}

impl From<Result<AnalysisResult, AnalysisError>> for AnalysisOutcome {
    fn from(result: Result<AnalysisResult, AnalysisError>) -> Self {
        match result {
            Ok(result) => Self::Success(result),
            Err(error) => Self::Failure(Diagnostic::from(error)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
