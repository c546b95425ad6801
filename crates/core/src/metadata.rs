//! Raw video metadata as reported by the container probe.

use serde::{Deserialize, Serialize};

/// Immutable facts about the input video, produced once per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVideoMetadata {
    pub width: u32,
    pub height: u32,
    pub duration_secs: f64,
    pub fps: f64,
    pub file_size_bytes: u64,
    /// Exact frame count when the container reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<u64>,
}

impl RawVideoMetadata {
    /// Whether every field the gate relies on is finite and positive.
    pub fn is_readable(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.duration_secs.is_finite()
            && self.duration_secs > 0.0
            && self.fps.is_finite()
            && self.fps > 0.0
    }

    /// Frame count, estimated from duration and frame rate when the
    /// container does not report it.
    pub fn total_frames(&self) -> u64 {
        match self.frame_count {
            Some(n) if n > 0 => n,
            _ if self.is_readable() => (self.duration_secs * self.fps).round() as u64,
            _ => 0,
        }
    }

    /// `(long side, short side)`, so portrait and landscape footage of the
    /// same resolution compare equal.
    pub fn frame_sides(&self) -> (u32, u32) {
        (self.width.max(self.height), self.width.min(self.height))
    }

    pub fn resolution_label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(duration_secs: f64, fps: f64, frame_count: Option<u64>) -> RawVideoMetadata {
        RawVideoMetadata {
            width: 1280,
            height: 720,
            duration_secs,
            fps,
            file_size_bytes: 1_000_000,
            frame_count,
        }
    }

    #[test]
    fn total_frames_prefers_reported_count() {
        assert_eq!(meta(8.0, 30.0, Some(241)).total_frames(), 241);
    }

    #[test]
    fn total_frames_estimated_from_duration() {
        assert_eq!(meta(8.0, 30.0, None).total_frames(), 240);
    }

    #[test]
    fn zero_fps_is_unreadable() {
        let m = meta(8.0, 0.0, None);
        assert!(!m.is_readable());
        assert_eq!(m.total_frames(), 0);
    }

    #[test]
    fn nan_duration_is_unreadable() {
        assert!(!meta(f64::NAN, 30.0, None).is_readable());
    }
}
