//! Video input capability.
//!
//! The pipeline never decodes video itself. It asks a [`VideoSource`] for
//! container metadata once, then for individual frames named by the
//! sampling plan. [`crate::ffmpeg::FfmpegVideoSource`] is the production
//! implementation; tests inject stubs.

use formcheck_core::metadata::RawVideoMetadata;
use formcheck_core::sampling::FrameRequest;

/// Errors raised while probing or decoding a video.
#[derive(Debug, thiserror::Error)]
pub enum VideoSourceError {
    #[error("ffprobe/ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("ffprobe/ffmpeg execution failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to parse ffprobe output: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("video file not found: {0}")]
    VideoNotFound(String),

    #[error("{command} timed out after {elapsed_ms}ms")]
    Timeout {
        command: &'static str,
        elapsed_ms: u64,
    },

    #[error("frame {index} unavailable: {reason}")]
    FrameUnavailable { index: u64, reason: String },
}

/// Packed 8-bit RGB pixels, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbImage {
    /// Wrap a raw buffer, checking it holds exactly `width * height` pixels.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(3)?;
        (pixels.len() == expected && expected > 0).then_some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Byte length of one frame at this size.
    pub fn frame_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}

/// One decoded frame, tagged with the position it was requested at.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    pub timestamp_secs: f64,
    pub image: RgbImage,
}

impl Frame {
    pub fn request(&self) -> FrameRequest {
        FrameRequest {
            index: self.index,
            timestamp_secs: self.timestamp_secs,
        }
    }
}

/// Read access to one input video.
pub trait VideoSource: Send + Sync {
    /// Probe the container. Called once per request, before the gate.
    fn read_metadata(
        &self,
    ) -> impl std::future::Future<Output = Result<RawVideoMetadata, VideoSourceError>> + Send;

    /// Decode the frame nearest to `request`.
    fn read_frame(
        &self,
        request: FrameRequest,
    ) -> impl std::future::Future<Output = Result<Frame, VideoSourceError>> + Send;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
