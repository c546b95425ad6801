//! Pose extraction reliability through the full pipeline.

mod common;

use common::{meta, Scripted, ScriptedEstimator, StubSource};
use formcheck_core::config::AnalysisConfig;
use formcheck_core::diagnostic::FailureCause;
use formcheck_core::exercise::ExerciseType;
use formcheck_core::landmarks::{Landmark, LandmarkSet};
use formcheck_core::test_support::LiftScript;
use formcheck_pipeline::{AnalysisRequest, Pipeline};
use tokio_util::sync::CancellationToken;

fn pipeline() -> Pipeline {
    Pipeline::new(AnalysisConfig::default()).unwrap()
}

/// Drop the visibility of every landmark except the first `keep`.
fn mostly_hidden(pose: LandmarkSet, keep: usize) -> LandmarkSet {
    let raw: Vec<Landmark> = pose
        .iter()
        .enumerate()
        .map(|(i, lm)| Landmark {
            visibility: if i < keep { lm.visibility } else { 0.1 },
            ..*lm
        })
        .collect();
    LandmarkSet::new(raw).unwrap()
}

// ---------------------------------------------------------------------------
// Test: half the frames without a person
// ---------------------------------------------------------------------------

#[tokio::test]
async fn alternating_misses_are_insufficient_signal() {
    let lift = LiftScript::squat(2);
    let source = StubSource::new(meta(1280, 720, 8.0, 30.0));
    let estimator = ScriptedEstimator::new(move |index, t| {
        if index % 2 == 0 {
            Scripted::Pose(lift.pose_at(t))
        } else {
            Scripted::NoPerson
        }
    });
    let request = AnalysisRequest::new(ExerciseType::BackSquat, "half.mp4");

    let report = pipeline()
        .run(&request, &source, &estimator, CancellationToken::new())
        .await;

    let diagnostic = report.outcome.diagnostic().unwrap();
    assert_eq!(diagnostic.cause, FailureCause::InsufficientPoseSignal);
    assert_eq!(diagnostic.issues, vec!["low_pose_success_rate".to_string()]);

    let stats = diagnostic.frame_statistics.as_ref().unwrap();
    assert_eq!(stats.total_frames_sampled, 240);
    assert_eq!(stats.usable_frames, 120);
    assert_eq!(stats.success_rate, 0.5);
    assert_eq!(estimator.calls(), 240);
    assert!(diagnostic.metadata.is_some());
}

// ---------------------------------------------------------------------------
// Test: nobody in frame
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_scene_reports_no_person() {
    let source = StubSource::new(meta(1280, 720, 6.0, 30.0));
    let estimator = ScriptedEstimator::new(|_, _| Scripted::NoPerson);
    let request = AnalysisRequest::new(ExerciseType::ConventionalDeadlift, "empty.mp4");

    let report = pipeline()
        .run(&request, &source, &estimator, CancellationToken::new())
        .await;

    let diagnostic = report.outcome.diagnostic().unwrap();
    assert_eq!(diagnostic.cause, FailureCause::InsufficientPoseSignal);
    assert!(diagnostic.has_issue("no_person_detected"));
    assert!(!diagnostic.recommendations.is_empty());
    assert_eq!(diagnostic.frame_statistics.as_ref().unwrap().frames_with_pose, 0);
}

// ---------------------------------------------------------------------------
// Test: detected but too few landmarks visible
// ---------------------------------------------------------------------------

#[tokio::test]
async fn low_visibility_frames_are_detected_but_unusable() {
    let lift = LiftScript::squat(2);
    let source = StubSource::new(meta(1280, 720, 8.0, 30.0));
    let estimator =
        ScriptedEstimator::new(move |_, t| Scripted::Pose(mostly_hidden(lift.pose_at(t), 10)));
    let request = AnalysisRequest::new(ExerciseType::BackSquat, "dark.mp4");

    let report = pipeline()
        .run(&request, &source, &estimator, CancellationToken::new())
        .await;

    let diagnostic = report.outcome.diagnostic().unwrap();
    assert_eq!(diagnostic.cause, FailureCause::InsufficientPoseSignal);
    assert!(diagnostic.has_issue("low_landmark_visibility"));
    let stats = diagnostic.frame_statistics.as_ref().unwrap();
    assert_eq!(stats.frames_with_pose, 240);
    assert_eq!(stats.usable_frames, 0);
    assert_eq!(stats.avg_visible_landmarks, 10.0);
}

// ---------------------------------------------------------------------------
// Test: capability errors count as misses, not failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn decode_and_estimator_errors_are_absorbed() {
    let lift = LiftScript::squat(2);
    let source = StubSource::new(meta(1280, 720, 8.0, 30.0)).failing_on(0..10);
    let estimator = ScriptedEstimator::new(move |index, t| {
        if index % 10 == 5 {
            Scripted::Fail
        } else {
            Scripted::Pose(lift.pose_at(t))
        }
    });
    let request = AnalysisRequest::new(ExerciseType::BackSquat, "glitchy.mp4");

    let report = pipeline()
        .run(&request, &source, &estimator, CancellationToken::new())
        .await;

    let result = report.outcome.result().expect("analysis should succeed");
    // 10 undecodable frames, then 23 estimator failures among the other 230.
    assert_eq!(result.quality.total_frames_sampled, 240);
    assert_eq!(result.quality.usable_frames, 207);
    assert_eq!(result.rep_count, 2);
    assert_eq!(source.frame_reads(), 240);
    assert_eq!(estimator.calls(), 230);
}

// ---------------------------------------------------------------------------
// Test: long clips are sampled sparsely
// ---------------------------------------------------------------------------

#[tokio::test]
async fn long_clip_uses_reduced_sampling() {
    let source = StubSource::new(meta(1920, 1080, 40.0, 30.0));
    let estimator = ScriptedEstimator::new(|_, _| Scripted::NoPerson);
    let request = AnalysisRequest::new(ExerciseType::SumoDeadlift, "long.mp4");

    let report = pipeline()
        .run(&request, &source, &estimator, CancellationToken::new())
        .await;

    // 40s at 0.5 fps.
    assert_eq!(source.frame_reads(), 20);
    let diagnostic = report.outcome.diagnostic().unwrap();
    assert_eq!(diagnostic.cause, FailureCause::InsufficientPoseSignal);
    assert_eq!(
        diagnostic.frame_statistics.as_ref().unwrap().total_frames_sampled,
        20
    );
}
