//! Metadata quality gate.
//!
//! Runs before any frame is decoded. A failing outcome short-circuits the
//! request straight to the diagnostic reporter, so an unusable upload never
//! costs a single pose-estimation call.

use serde::{Deserialize, Serialize};

use crate::config::QualityGateConfig;
use crate::error::AnalysisError;
use crate::metadata::RawVideoMetadata;

// ---------------------------------------------------------------------------
// Score deductions
// ---------------------------------------------------------------------------

/// Deducted from the quality score when resolution is below minimum.
pub const RESOLUTION_PENALTY: u32 = 30;
/// Deducted when the clip is too short.
pub const SHORT_DURATION_PENALTY: u32 = 25;
/// Deducted when the clip is too long.
pub const LONG_DURATION_PENALTY: u32 = 15;
/// Deducted when the frame rate is too low.
pub const FRAME_RATE_PENALTY: u32 = 20;

const PERFECT_QUALITY_SCORE: u32 = 100;

// ---------------------------------------------------------------------------
// Issue codes
// ---------------------------------------------------------------------------

/// Machine-readable gate finding. Blocking issues fail the gate; warnings
/// ride along on a passing outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateIssueCode {
    UnreadableVideo,
    ResolutionBelowMinimum,
    DurationBelowMinimum,
    DurationExceedsMaximum,
    FrameRateBelowMinimum,
    BelowRecommendedResolution,
    DurationBelowOptimal,
    DurationAboveOptimal,
}

impl GateIssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnreadableVideo => "unreadable_video",
            Self::ResolutionBelowMinimum => "resolution_below_minimum",
            Self::DurationBelowMinimum => "duration_below_minimum",
            Self::DurationExceedsMaximum => "duration_exceeds_maximum",
            Self::FrameRateBelowMinimum => "frame_rate_below_minimum",
            Self::BelowRecommendedResolution => "below_recommended_resolution",
            Self::DurationBelowOptimal => "duration_below_optimal",
            Self::DurationAboveOptimal => "duration_above_optimal",
        }
    }

    pub fn is_blocking(self) -> bool {
        !matches!(
            self,
            Self::BelowRecommendedResolution
                | Self::DurationBelowOptimal
                | Self::DurationAboveOptimal
        )
    }
}

/// One finding with a human-readable explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateIssue {
    pub code: GateIssueCode,
    pub message: String,
}

impl GateIssue {
    fn new(code: GateIssueCode, message: String) -> Self {
        Self { code, message }
    }
}

/// Result of evaluating one video against the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityGateOutcome {
    pub passed: bool,
    /// Blocking issues; empty when `passed`.
    pub issues: Vec<GateIssue>,
    /// Non-blocking advice.
    pub warnings: Vec<GateIssue>,
    /// 0-100, starting at 100 with a fixed deduction per blocking issue.
    pub quality_score: u32,
}

impl QualityGateOutcome {
    /// Outcome for a video whose metadata could not be read at all.
    pub fn unreadable(reason: &str) -> Self {
        Self {
            passed: false,
            issues: vec![GateIssue::new(
                GateIssueCode::UnreadableVideo,
                format!("Could not read video file: {reason}"),
            )],
            warnings: Vec::new(),
            quality_score: 0,
        }
    }

    pub fn issue_codes(&self) -> Vec<GateIssueCode> {
        self.issues.iter().map(|i| i.code).collect()
    }

    /// Blocking issues followed by warnings.
    pub fn all_codes(&self) -> Vec<GateIssueCode> {
        self.issues
            .iter()
            .chain(self.warnings.iter())
            .map(|i| i.code)
            .collect()
    }

    pub fn has_issue(&self, code: GateIssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    pub fn issue_summary(&self) -> String {
        self.issues
            .iter()
            .map(|i| i.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Whether a frame with `(long, short)` sides is at least `width`x`height`
/// in either orientation.
fn covers((long, short): (u32, u32), width: u32, height: u32) -> bool {
    long >= width.max(height) && short >= width.min(height)
}

/// Evaluate metadata against the gate thresholds. Never fails; the outcome
/// says whether the video passed.
pub fn evaluate(metadata: &RawVideoMetadata, config: &QualityGateConfig) -> QualityGateOutcome {
    if !metadata.is_readable() {
        return QualityGateOutcome::unreadable(&format!(
            "invalid stream properties ({}, {:.2}s, {:.2} fps)",
            metadata.resolution_label(),
            metadata.duration_secs,
            metadata.fps
        ));
    }

    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let mut penalty = 0u32;

    let sides = metadata.frame_sides();
    if !covers(sides, config.min_width, config.min_height) {
        issues.push(GateIssue::new(
            GateIssueCode::ResolutionBelowMinimum,
            format!(
                "Resolution below minimum: {} (minimum: {}x{})",
                metadata.resolution_label(),
                config.min_width,
                config.min_height
            ),
        ));
        penalty += RESOLUTION_PENALTY;
    } else if !covers(sides, config.recommended_width, config.recommended_height) {
        warnings.push(GateIssue::new(
            GateIssueCode::BelowRecommendedResolution,
            format!(
                "Resolution {} is below the recommended {}x{}",
                metadata.resolution_label(),
                config.recommended_width,
                config.recommended_height
            ),
        ));
    }

    let duration = metadata.duration_secs;
    if duration < config.min_duration_secs {
        issues.push(GateIssue::new(
            GateIssueCode::DurationBelowMinimum,
            format!(
                "Duration below minimum: {duration:.1}s (minimum: {:.1}s)",
                config.min_duration_secs
            ),
        ));
        penalty += SHORT_DURATION_PENALTY;
    } else if duration > config.max_duration_secs {
        issues.push(GateIssue::new(
            GateIssueCode::DurationExceedsMaximum,
            format!(
                "Duration exceeds maximum: {duration:.1}s (maximum: {:.1}s)",
                config.max_duration_secs
            ),
        ));
        penalty += LONG_DURATION_PENALTY;
    } else if duration < config.optimal_min_duration_secs {
        warnings.push(GateIssue::new(
            GateIssueCode::DurationBelowOptimal,
            format!(
                "Duration {duration:.1}s is shorter than the optimal {:.0}-{:.0}s window",
                config.optimal_min_duration_secs, config.optimal_max_duration_secs
            ),
        ));
    } else if duration > config.optimal_max_duration_secs {
        warnings.push(GateIssue::new(
            GateIssueCode::DurationAboveOptimal,
            format!(
                "Duration {duration:.1}s is longer than the optimal {:.0}-{:.0}s window",
                config.optimal_min_duration_secs, config.optimal_max_duration_secs
            ),
        ));
    }

    if metadata.fps < config.min_fps {
        issues.push(GateIssue::new(
            GateIssueCode::FrameRateBelowMinimum,
            format!(
                "Frame rate below minimum: {:.1} fps (minimum: {:.0} fps)",
                metadata.fps, config.min_fps
            ),
        ));
        penalty += FRAME_RATE_PENALTY;
    }

    QualityGateOutcome {
        passed: issues.is_empty(),
        issues,
        warnings,
        quality_score: PERFECT_QUALITY_SCORE.saturating_sub(penalty),
    }
}

/// Evaluate and convert a failing outcome into [`AnalysisError::QualityGateFailed`].
pub fn check(
    metadata: &RawVideoMetadata,
    config: &QualityGateConfig,
) -> Result<QualityGateOutcome, AnalysisError> {
    let outcome = evaluate(metadata, config);
    if outcome.passed {
        Ok(outcome)
    } else {
        Err(AnalysisError::QualityGateFailed {
            metadata: Some(metadata.clone()),
            outcome,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
