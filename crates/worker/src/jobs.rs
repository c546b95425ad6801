//! Batch execution of independent analysis jobs.
//!
//! Each job is one video plus its recorded landmarks. Jobs share nothing
//! but the read-only [`Pipeline`]; a semaphore bounds how many run at once
//! and a single cancellation token stops all of them.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use formcheck_core::exercise::ExerciseType;
use formcheck_pipeline::estimator::{EstimatorError, ReplayPoseEstimator};
use formcheck_pipeline::ffmpeg::{FfmpegConfig, FfmpegVideoSource};
use formcheck_pipeline::{AnalysisReport, AnalysisRequest, Pipeline};

/// One entry of the job manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub video: PathBuf,
    /// Landmark recording for `video`, consumed by the replay estimator.
    pub landmarks: PathBuf,
    pub exercise: ExerciseType,
}

/// A job that could not be run at all (as opposed to an analysis that ran
/// and failed, which is a normal [`AnalysisReport`]).
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("failed to load landmarks for {video}: {source}")]
    Landmarks {
        video: String,
        #[source]
        source: EstimatorError,
    },

    #[error("job task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Read a JSON array of [`JobSpec`] from `path`.
pub async fn load_manifest(path: &Path) -> anyhow::Result<Vec<JobSpec>> {
    let json = tokio::fs::read_to_string(path).await?;
    let jobs = serde_json::from_str(&json)?;
    Ok(jobs)
}

/// Runs jobs against one shared pipeline with bounded concurrency.
#[derive(Debug, Clone)]
pub struct JobRunner {
    pipeline: Arc<Pipeline>,
    ffmpeg: FfmpegConfig,
    permits: Arc<Semaphore>,
}

impl JobRunner {
    pub fn new(pipeline: Pipeline, ffmpeg: FfmpegConfig, max_concurrent: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            ffmpeg,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Run every job to completion (or cancellation). Results come back in
    /// manifest order.
    pub async fn run_all(
        &self,
        jobs: Vec<JobSpec>,
        cancel: CancellationToken,
    ) -> Vec<Result<AnalysisReport, JobError>> {
        let total = jobs.len();
        let mut set = JoinSet::new();

        for (position, job) in jobs.into_iter().enumerate() {
            let runner = self.clone();
            let cancel = cancel.clone();
            set.spawn(async move { (position, runner.run_one(job, cancel).await) });
        }

        let mut slots: Vec<Option<Result<AnalysisReport, JobError>>> =
            (0..total).map(|_| None).collect();
        let mut failed_tasks = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((position, result)) => slots[position] = Some(result),
                Err(e) => {
                    tracing::error!(error = %e, "Job task panicked");
                    failed_tasks.push(e);
                }
            }
        }

        // A panicked task lost its position; fill the remaining slots in order.
        let mut failed_tasks = failed_tasks.into_iter();
        slots
            .into_iter()
            .filter_map(|slot| match slot {
                Some(result) => Some(result),
                None => failed_tasks.next().map(|e| Err(JobError::Join(e))),
            })
            .collect()
    }

    /// Wait for a permit, then run one job. The landmark recording is only
    /// loaded once the permit is held.
    pub async fn run_one(
        &self,
        job: JobSpec,
        cancel: CancellationToken,
    ) -> Result<AnalysisReport, JobError> {
        let request = AnalysisRequest::new(job.exercise, job.video.to_string_lossy());

        self.bounded(async move {
            let estimator = ReplayPoseEstimator::from_path(&job.landmarks)
                .await
                .map_err(|source| JobError::Landmarks {
                    video: request.video.clone(),
                    source,
                })?;
            tracing::debug!(
                request_id = %request.id,
                recorded_frames = estimator.len(),
                "Job started",
            );

            let source = FfmpegVideoSource::new(&job.video, self.ffmpeg.clone());
            Ok(self
                .pipeline
                .run(&request, &source, &estimator, cancel)
                .await)
        })
        .await
    }

    /// Run `work` while holding one concurrency permit.
    async fn bounded<T>(&self, work: impl Future<Output = T>) -> T {
        // The runner owns the semaphore and never closes it.
        let _permit = self.permits.acquire().await.ok();
        work.await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use formcheck_core::config::AnalysisConfig;
    use formcheck_core::diagnostic::FailureCause;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("formcheck-{}-{name}", uuid::Uuid::now_v7()))
    }

    fn runner() -> JobRunner {
        runner_with(2)
    }

    fn runner_with(max_concurrent: usize) -> JobRunner {
        JobRunner::new(
            Pipeline::new(AnalysisConfig::default()).unwrap(),
            FfmpegConfig::default(),
            max_concurrent,
        )
    }

    /// Run `count` jobs of `work_ms` each through `runner` at once and
    /// return the peak number running together.
    async fn peak_concurrency(runner: &JobRunner, count: usize, work_ms: u64) -> usize {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut set = JoinSet::new();
        for _ in 0..count {
            let runner = runner.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            set.spawn(async move {
                runner
                    .bounded(async {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(work_ms)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            });
        }
        while set.join_next().await.is_some() {}
        peak.load(Ordering::SeqCst)
    }

    #[test]
    fn job_spec_parses_kebab_case_exercise() {
        let json = r#"[{"video": "a.mp4", "landmarks": "a.json", "exercise": "sumo-deadlift"}]"#;
        let jobs: Vec<JobSpec> = serde_json::from_str(json).unwrap();
        assert_eq!(jobs[0].exercise, ExerciseType::SumoDeadlift);
        assert_eq!(jobs[0].video, PathBuf::from("a.mp4"));
    }

    #[tokio::test]
    async fn missing_landmarks_is_a_job_error() {
        let job = JobSpec {
            video: scratch("clip.mp4"),
            landmarks: scratch("missing.json"),
            exercise: ExerciseType::BackSquat,
        };
        let result = runner().run_one(job, CancellationToken::new()).await;
        assert_matches!(result, Err(JobError::Landmarks { .. }));
    }

    #[tokio::test]
    async fn missing_video_is_classified_and_order_is_kept() {
        let landmarks = scratch("landmarks.json");
        tokio::fs::write(&landmarks, r#"{"frames": []}"#).await.unwrap();

        let jobs: Vec<JobSpec> = [ExerciseType::FrontSquat, ExerciseType::ConventionalDeadlift]
            .into_iter()
            .map(|exercise| JobSpec {
                video: scratch("absent.mp4"),
                landmarks: landmarks.clone(),
                exercise,
            })
            .collect();

        let results = runner().run_all(jobs, CancellationToken::new()).await;
        tokio::fs::remove_file(&landmarks).await.ok();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.exercise, ExerciseType::FrontSquat);
        assert_eq!(results[1].as_ref().unwrap().exercise, ExerciseType::ConventionalDeadlift);

        let diagnostic = first.outcome.diagnostic().unwrap();
        assert_eq!(diagnostic.cause, FailureCause::QualityGateFailed);
        assert!(diagnostic.has_issue("unreadable_video"));
    }

    #[tokio::test]
    async fn manifest_round_trips_from_disk() {
        let path = scratch("manifest.json");
        tokio::fs::write(
            &path,
            r#"[{"video": "/data/set1.mp4", "landmarks": "/data/set1.json", "exercise": "back-squat"}]"#,
        )
        .await
        .unwrap();
        let jobs = load_manifest(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.ok();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].exercise, ExerciseType::BackSquat);
    }

    // -- bounded ---

    #[tokio::test]
    async fn single_permit_serializes_jobs() {
        assert_eq!(peak_concurrency(&runner_with(1), 3, 20).await, 1);
    }

    #[tokio::test]
    async fn permits_allow_that_many_jobs_together() {
        assert_eq!(peak_concurrency(&runner_with(2), 4, 50).await, 2);
    }

    #[tokio::test]
    async fn landmarks_wait_for_a_permit() {
        let runner = runner_with(1);
        let held = Arc::clone(&runner.permits).acquire_owned().await.unwrap();

        let job = JobSpec {
            video: scratch("clip.mp4"),
            landmarks: scratch("missing.json"),
            exercise: ExerciseType::BackSquat,
        };
        let handle = {
            let runner = runner.clone();
            tokio::spawn(async move { runner.run_one(job, CancellationToken::new()).await })
        };

        // A missing recording fails at once, so a pending job has not read it.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());

        drop(held);
        let result = handle.await.unwrap();
        assert_matches!(result, Err(JobError::Landmarks { .. }));
    }
}
