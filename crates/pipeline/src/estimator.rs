//! Pose-estimation capability.
//!
//! The model itself is an external collaborator; the pipeline only needs
//! `frame -> Option<LandmarkSet>`. `Ok(None)` means the estimator ran and
//! found no person. `Err` means the call itself failed; extraction treats
//! both the same way (sampled, not usable) but logs errors.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use formcheck_core::landmarks::LandmarkSet;

use crate::source::Frame;

#[derive(Debug, thiserror::Error)]
pub enum EstimatorError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse landmark file: {0}")]
    ParseError(String),

    #[error("pose model failed on frame {index}: {reason}")]
    ModelFailed { index: u64, reason: String },
}

/// Trait implemented by every pose estimator backend.
pub trait PoseEstimator: Send + Sync {
    /// Estimate the body landmarks in one decoded frame.
    fn estimate_pose(
        &self,
        frame: &Frame,
    ) -> impl std::future::Future<Output = Result<Option<LandmarkSet>, EstimatorError>> + Send;
}

// ---------------------------------------------------------------------------
// ReplayPoseEstimator
// ---------------------------------------------------------------------------

/// Landmark file layout: one entry per frame that was run through a model
/// offline. `landmarks: null` records a frame with no person detected.
#[derive(Debug, Deserialize)]
struct LandmarkFile {
    frames: Vec<LandmarkEntry>,
}

#[derive(Debug, Deserialize)]
struct LandmarkEntry {
    frame_index: u64,
    landmarks: Option<LandmarkSet>,
}

/// Serves landmarks recorded earlier, keyed by source frame index.
///
/// Frames absent from the recording are reported as "no person detected".
#[derive(Debug, Default)]
pub struct ReplayPoseEstimator {
    frames: HashMap<u64, Option<LandmarkSet>>,
}

impl ReplayPoseEstimator {
    pub fn from_json(json: &str) -> Result<Self, EstimatorError> {
        let file: LandmarkFile =
            serde_json::from_str(json).map_err(|e| EstimatorError::ParseError(e.to_string()))?;
        Ok(Self {
            frames: file
                .frames
                .into_iter()
                .map(|entry| (entry.frame_index, entry.landmarks))
                .collect(),
        })
    }

    pub async fn from_path(path: &Path) -> Result<Self, EstimatorError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }

    /// Number of recorded frames, including ones with no detection.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl PoseEstimator for ReplayPoseEstimator {
    async fn estimate_pose(&self, frame: &Frame) -> Result<Option<LandmarkSet>, EstimatorError> {
        Ok(self.frames.get(&frame.index).cloned().flatten())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
