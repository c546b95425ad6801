//! Per-request stage orchestration.
//!
//! One [`Pipeline::run`] call takes a single video through the quality
//! gate, pose extraction and analysis, strictly in that order. The whole
//! run sits under the configured deadline and the caller's cancellation
//! token; either one drops the in-flight stage (killing any decoder
//! subprocess) and produces a failure diagnostic naming the stage reached.
//! Success is all-or-nothing: no partial result is ever returned.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use formcheck_core::analysis::{self, AnalysisResult};
use formcheck_core::config::AnalysisConfig;
use formcheck_core::diagnostic::{
    AnalysisOutcome, Diagnostic, FrameStatistics, PipelineStage,
};
use formcheck_core::error::{AnalysisError, CoreError};
use formcheck_core::exercise::ExerciseType;
use formcheck_core::metadata::RawVideoMetadata;
use formcheck_core::quality_gate::{self, QualityGateOutcome};
use formcheck_core::sampling;
use formcheck_core::types::Timestamp;

use crate::estimator::PoseEstimator;
use crate::extraction;
use crate::source::VideoSource;

/// One video to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub id: Uuid,
    pub exercise: ExerciseType,
    /// Caller's reference to the video, echoed in the report.
    pub video: String,
}

impl AnalysisRequest {
    pub fn new(exercise: ExerciseType, video: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            exercise,
            video: video.into(),
        }
    }
}

/// Tagged outcome plus request bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub exercise: ExerciseType,
    pub video: String,
    pub started_at: Timestamp,
    pub finished_at: Timestamp,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub outcome: AnalysisOutcome,
}

/// How far a run has got. Published on a watch channel as stages advance.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub stage: PipelineStage,
    pub metadata: Option<RawVideoMetadata>,
    pub frame_statistics: Option<FrameStatistics>,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            stage: PipelineStage::QualityGate,
            metadata: None,
            frame_statistics: None,
        }
    }
}

enum Interrupted {
    Timeout,
    Cancelled,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Runs analysis requests against an immutable configuration.
///
/// Holds no per-request state, so one instance can serve any number of
/// concurrent runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnalysisConfig,
}

impl Pipeline {
    /// Validate `config` and build a pipeline around it.
    pub fn new(config: AnalysisConfig) -> Result<Self, CoreError> {
        Ok(Self {
            config: config.validated()?,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.pipeline_timeout_secs)
    }

    /// Run one request to a terminal outcome.
    pub async fn run<S, E>(
        &self,
        request: &AnalysisRequest,
        source: &S,
        estimator: &E,
        cancel: CancellationToken,
    ) -> AnalysisReport
    where
        S: VideoSource,
        E: PoseEstimator,
    {
        let (progress, _rx) = watch::channel(Progress::default());
        self.run_observed(request, source, estimator, cancel, &progress)
            .await
    }

    /// Like [`Pipeline::run`], publishing stage and frame counters to
    /// `progress` as the run advances.
    pub async fn run_observed<S, E>(
        &self,
        request: &AnalysisRequest,
        source: &S,
        estimator: &E,
        cancel: CancellationToken,
        progress: &watch::Sender<Progress>,
    ) -> AnalysisReport
    where
        S: VideoSource,
        E: PoseEstimator,
    {
        let started_at = chrono::Utc::now();
        let clock = Instant::now();
        tracing::info!(
            request_id = %request.id,
            exercise = %request.exercise,
            video = %request.video,
            "Analysis started",
        );

        let stages = self.run_stages(request, source, estimator, progress);
        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Interrupted::Cancelled),
            result = tokio::time::timeout(self.timeout(), stages) => {
                result.map_err(|_| Interrupted::Timeout)
            }
        };

        let snapshot = progress.borrow().clone();
        let outcome = match finished {
            Ok(Ok(result)) => AnalysisOutcome::Success(result),
            Ok(Err(error)) => {
                AnalysisOutcome::Failure(Diagnostic::from(error).with_metadata(snapshot.metadata))
            }
            Err(Interrupted::Timeout) => AnalysisOutcome::Failure(
                Diagnostic::timeout(self.config.pipeline_timeout_secs, snapshot.stage)
                    .with_metadata(snapshot.metadata)
                    .with_frame_statistics(snapshot.frame_statistics),
            ),
            Err(Interrupted::Cancelled) => AnalysisOutcome::Failure(
                Diagnostic::cancelled(snapshot.stage)
                    .with_metadata(snapshot.metadata)
                    .with_frame_statistics(snapshot.frame_statistics),
            ),
        };

        let elapsed_ms = clock.elapsed().as_millis() as u64;
        match &outcome {
            AnalysisOutcome::Success(result) => tracing::info!(
                request_id = %request.id,
                overall_score = result.overall_score,
                rep_count = result.rep_count,
                elapsed_ms,
                "Analysis succeeded",
            ),
            AnalysisOutcome::Failure(diagnostic) => tracing::info!(
                request_id = %request.id,
                cause = diagnostic.cause.as_str(),
                issues = ?diagnostic.issues,
                elapsed_ms,
                "Analysis failed",
            ),
        }

        AnalysisReport {
            request_id: request.id,
            exercise: request.exercise,
            video: request.video.clone(),
            started_at,
            finished_at: chrono::Utc::now(),
            elapsed_ms,
            outcome,
        }
    }

    /// Quality gate, then extraction, then analysis.
    async fn run_stages<S, E>(
        &self,
        request: &AnalysisRequest,
        source: &S,
        estimator: &E,
        progress: &watch::Sender<Progress>,
    ) -> Result<AnalysisResult, AnalysisError>
    where
        S: VideoSource,
        E: PoseEstimator,
    {
        progress.send_modify(|p| p.stage = PipelineStage::QualityGate);
        let metadata = match source.read_metadata().await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(request_id = %request.id, error = %e, "Video metadata unreadable");
                return Err(AnalysisError::QualityGateFailed {
                    metadata: None,
                    outcome: QualityGateOutcome::unreadable(&e.to_string()),
                });
            }
        };
        progress.send_modify(|p| p.metadata = Some(metadata.clone()));

        let gate = quality_gate::check(&metadata, &self.config.quality_gate)?;
        tracing::debug!(
            request_id = %request.id,
            resolution = %metadata.resolution_label(),
            duration_secs = metadata.duration_secs,
            fps = metadata.fps,
            quality_score = gate.quality_score,
            warnings = gate.warnings.len(),
            "Quality gate passed",
        );

        progress.send_modify(|p| p.stage = PipelineStage::PoseExtraction);
        let plan = sampling::plan(&metadata, &self.config.extraction);
        tracing::debug!(
            request_id = %request.id,
            frames = plan.len(),
            rate = ?plan.rate,
            "Sampling plan built",
        );
        let (frames, report) =
            extraction::extract_poses(source, estimator, &plan, &self.config.extraction, progress)
                .await?;

        progress.send_modify(|p| p.stage = PipelineStage::Analysis);
        let result = analysis::analyze(request.exercise, &frames, report, &self.config)?;
        Ok(result.with_warnings(gate.warnings))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
