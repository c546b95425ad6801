use crate::metadata::RawVideoMetadata;
use crate::quality_gate::QualityGateOutcome;
use crate::reliability::QualityReport;
use crate::segmentation::PartialMetrics;

/// Configuration and input validation errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// The classified, terminal failures of an analysis run.
///
/// These are the only pipeline-internal ways an analysis can fail. Each
/// variant carries enough context for the diagnostic reporter to build
/// user-facing recommendations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Quality gate failed: {}", .outcome.issue_summary())]
    QualityGateFailed {
        metadata: Option<RawVideoMetadata>,
        outcome: QualityGateOutcome,
    },

    #[error(
        "Insufficient pose signal: {}/{} sampled frames usable",
        .report.usable_frames,
        .report.total_frames_sampled
    )]
    InsufficientPoseSignal { report: QualityReport },

    #[error("No repetitions detected in '{}' signal", .partial.tracking_signal)]
    NoRepsDetected {
        report: QualityReport,
        partial: PartialMetrics,
    },
}

impl AnalysisError {
    /// Stable identifier for the failure cause.
    pub fn cause(&self) -> crate::diagnostic::FailureCause {
        use crate::diagnostic::FailureCause;
        match self {
            Self::QualityGateFailed { .. } => FailureCause::QualityGateFailed,
            Self::InsufficientPoseSignal { .. } => FailureCause::InsufficientPoseSignal,
            Self::NoRepsDetected { .. } => FailureCause::NoRepsDetected,
        }
    }
}
