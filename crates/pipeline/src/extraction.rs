//! Pose extraction engine.
//!
//! Walks the sampling plan in order, decoding each frame and running the
//! estimator on it. Every requested frame is recorded with the
//! [`ReliabilityTracker`], whether or not a pose came back, so the success
//! rate is always usable / sampled. Capability errors are logged and
//! counted as misses; they never abort the run.

use tokio::sync::watch;

use formcheck_core::config::ExtractionConfig;
use formcheck_core::error::AnalysisError;
use formcheck_core::landmarks::LandmarkSet;
use formcheck_core::reliability::{PoseFrame, QualityReport, ReliabilityTracker};
use formcheck_core::sampling::{FrameRequest, SamplingPlan};

use crate::estimator::PoseEstimator;
use crate::pipeline::Progress;
use crate::source::VideoSource;

/// Sample every frame in `plan` and apply the reliability gate.
///
/// `progress` receives updated frame statistics after each frame so a
/// timeout or cancellation can report how far extraction got.
pub async fn extract_poses<S, E>(
    source: &S,
    estimator: &E,
    plan: &SamplingPlan,
    config: &ExtractionConfig,
    progress: &watch::Sender<Progress>,
) -> Result<(Vec<PoseFrame>, QualityReport), AnalysisError>
where
    S: VideoSource,
    E: PoseEstimator,
{
    let mut tracker = ReliabilityTracker::new(config);

    for &request in &plan.frames {
        let pose = sample(source, estimator, request).await;
        tracker.record(request, pose);

        let stats = tracker.statistics();
        progress.send_modify(|p| p.frame_statistics = Some(stats));
    }

    tracing::debug!(
        sampled = tracker.sampled(),
        usable = tracker.usable(),
        "Pose extraction finished",
    );
    tracker.finish()
}

/// Decode one frame and estimate its pose. Any failure is a miss.
async fn sample<S, E>(source: &S, estimator: &E, request: FrameRequest) -> Option<LandmarkSet>
where
    S: VideoSource,
    E: PoseEstimator,
{
    let frame = match source.read_frame(request).await {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(frame = request.index, error = %e, "Frame decode failed");
            return None;
        }
    };

    match estimator.estimate_pose(&frame).await {
        Ok(pose) => pose,
        Err(e) => {
            tracing::warn!(frame = request.index, error = %e, "Pose estimation failed");
            None
        }
    }
}
