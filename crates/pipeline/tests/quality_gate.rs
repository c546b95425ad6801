//! Quality gate behaviour through the full pipeline.
//!
//! A video that fails the gate must never reach pose extraction: the stub
//! source and estimator both count their calls.

mod common;

use common::{meta, ScriptedEstimator, StubSource};
use formcheck_core::config::AnalysisConfig;
use formcheck_core::diagnostic::{FailureCause, RECOMMEND_RESOLUTION};
use formcheck_core::exercise::ExerciseType;
use formcheck_core::test_support::LiftScript;
use formcheck_pipeline::{AnalysisRequest, Pipeline};
use tokio_util::sync::CancellationToken;

fn pipeline() -> Pipeline {
    Pipeline::new(AnalysisConfig::default()).unwrap()
}

// ---------------------------------------------------------------------------
// Test: a 1-second clip is rejected before any frame is decoded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_second_clip_never_reaches_extraction() {
    let source = StubSource::new(meta(1280, 720, 1.0, 30.0));
    let estimator = ScriptedEstimator::lifting(LiftScript::squat(1));
    let request = AnalysisRequest::new(ExerciseType::BackSquat, "short.mp4");

    let report = pipeline()
        .run(&request, &source, &estimator, CancellationToken::new())
        .await;

    assert_eq!(report.outcome.failure_cause(), Some(FailureCause::QualityGateFailed));
    assert_eq!(source.frame_reads(), 0);
    assert_eq!(estimator.calls(), 0);

    let diagnostic = report.outcome.diagnostic().unwrap();
    assert!(diagnostic.has_issue("duration_below_minimum"));
    assert_eq!(diagnostic.quality_score, Some(75));
    assert_eq!(diagnostic.metadata.as_ref().unwrap().duration_secs, 1.0);
}

// ---------------------------------------------------------------------------
// Test: 3-second 240p clip
// ---------------------------------------------------------------------------

#[tokio::test]
async fn low_resolution_short_clip_reports_both_findings() {
    let source = StubSource::new(meta(426, 240, 3.0, 30.0));
    let estimator = ScriptedEstimator::lifting(LiftScript::squat(1));
    let request = AnalysisRequest::new(ExerciseType::FrontSquat, "240p.mp4");

    let report = pipeline()
        .run(&request, &source, &estimator, CancellationToken::new())
        .await;

    assert!(report.outcome.result().is_none());
    let diagnostic = report.outcome.diagnostic().unwrap();
    assert_eq!(diagnostic.cause, FailureCause::QualityGateFailed);
    assert!(diagnostic.has_issue("resolution_below_minimum"));
    assert!(diagnostic.has_issue("duration_below_optimal"));
    assert_eq!(diagnostic.issues.len(), diagnostic.issue_details.len());
    assert!(diagnostic
        .recommendations
        .iter()
        .any(|r| r == RECOMMEND_RESOLUTION));
    assert_eq!(estimator.calls(), 0);
}

// ---------------------------------------------------------------------------
// Test: unreadable metadata is classified, not surfaced raw
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreadable_video_fails_the_gate() {
    let source = StubSource::unreadable();
    let estimator = ScriptedEstimator::lifting(LiftScript::squat(1));
    let request = AnalysisRequest::new(ExerciseType::SumoDeadlift, "broken.mp4");

    let report = pipeline()
        .run(&request, &source, &estimator, CancellationToken::new())
        .await;

    let diagnostic = report.outcome.diagnostic().unwrap();
    assert_eq!(diagnostic.cause, FailureCause::QualityGateFailed);
    assert_eq!(diagnostic.issues, vec!["unreadable_video".to_string()]);
    assert!(diagnostic.issue_details[0].contains("moov atom not found"));
    assert_eq!(diagnostic.quality_score, Some(0));
    assert!(diagnostic.metadata.is_none());
}

// ---------------------------------------------------------------------------
// Test: zero-sized stream is unreadable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zero_frame_rate_is_unreadable() {
    let source = StubSource::new(meta(1280, 720, 8.0, 0.0));
    let estimator = ScriptedEstimator::lifting(LiftScript::squat(1));
    let request = AnalysisRequest::new(ExerciseType::BackSquat, "nofps.mp4");

    let report = pipeline()
        .run(&request, &source, &estimator, CancellationToken::new())
        .await;

    let diagnostic = report.outcome.diagnostic().unwrap();
    assert!(diagnostic.has_issue("unreadable_video"));
    assert_eq!(source.frame_reads(), 0);
}
