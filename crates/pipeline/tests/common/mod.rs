//! Shared stubs for pipeline integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use formcheck_core::landmarks::LandmarkSet;
use formcheck_core::metadata::RawVideoMetadata;
use formcheck_core::sampling::FrameRequest;
use formcheck_core::test_support::LiftScript;
use formcheck_pipeline::estimator::{EstimatorError, PoseEstimator};
use formcheck_pipeline::source::{Frame, RgbImage, VideoSource, VideoSourceError};

/// Metadata for an H.264-ish clip with an exact frame count.
pub fn meta(width: u32, height: u32, duration_secs: f64, fps: f64) -> RawVideoMetadata {
    RawVideoMetadata {
        width,
        height,
        duration_secs,
        fps,
        file_size_bytes: 4_000_000,
        frame_count: Some((duration_secs * fps).round() as u64),
    }
}

// ---------------------------------------------------------------------------
// StubSource
// ---------------------------------------------------------------------------

/// A video source serving blank 1x1 frames and counting decode calls.
pub struct StubSource {
    metadata: Option<RawVideoMetadata>,
    failing_frames: Vec<u64>,
    frame_reads: AtomicUsize,
}

impl StubSource {
    pub fn new(metadata: RawVideoMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            failing_frames: Vec::new(),
            frame_reads: AtomicUsize::new(0),
        }
    }

    /// A source whose probe always fails.
    pub fn unreadable() -> Self {
        Self {
            metadata: None,
            failing_frames: Vec::new(),
            frame_reads: AtomicUsize::new(0),
        }
    }

    /// Make decoding fail for the given frame indices.
    pub fn failing_on(mut self, frames: impl IntoIterator<Item = u64>) -> Self {
        self.failing_frames = frames.into_iter().collect();
        self
    }

    pub fn frame_reads(&self) -> usize {
        self.frame_reads.load(Ordering::SeqCst)
    }
}

impl VideoSource for StubSource {
    async fn read_metadata(&self) -> Result<RawVideoMetadata, VideoSourceError> {
        self.metadata.clone().ok_or_else(|| VideoSourceError::ExecutionFailed {
            exit_code: Some(1),
            stderr: "moov atom not found".to_string(),
        })
    }

    async fn read_frame(&self, request: FrameRequest) -> Result<Frame, VideoSourceError> {
        self.frame_reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_frames.contains(&request.index) {
            return Err(VideoSourceError::FrameUnavailable {
                index: request.index,
                reason: "corrupt packet".to_string(),
            });
        }
        Ok(Frame {
            index: request.index,
            timestamp_secs: request.timestamp_secs,
            image: RgbImage {
                width: 1,
                height: 1,
                pixels: vec![0, 0, 0],
            },
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedEstimator
// ---------------------------------------------------------------------------

/// What the estimator does on one frame.
pub enum Scripted {
    Pose(LandmarkSet),
    NoPerson,
    Fail,
}

type Script = Box<dyn Fn(u64, f64) -> Scripted + Send + Sync>;

/// A pose estimator driven by a closure over `(frame index, timestamp)`.
pub struct ScriptedEstimator {
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedEstimator {
    pub fn new(script: impl Fn(u64, f64) -> Scripted + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Poses follow `lift` by timestamp.
    pub fn lifting(lift: LiftScript) -> Self {
        Self::new(move |_, t| Scripted::Pose(lift.pose_at(t)))
    }

    /// Sleep this long on every call (tokio time, so pausable).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PoseEstimator for ScriptedEstimator {
    async fn estimate_pose(&self, frame: &Frame) -> Result<Option<LandmarkSet>, EstimatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match (self.script)(frame.index, frame.timestamp_secs) {
            Scripted::Pose(pose) => Ok(Some(pose)),
            Scripted::NoPerson => Ok(None),
            Scripted::Fail => Err(EstimatorError::ModelFailed {
                index: frame.index,
                reason: "inference backend unavailable".to_string(),
            }),
        }
    }
}
