//! Duration-adaptive frame sampling plan.
//!
//! Short clips are sampled at every frame so fast reps keep their temporal
//! resolution; longer clips drop to a fixed low rate so the number of
//! pose-estimation calls stays bounded.

use serde::{Deserialize, Serialize};

use crate::config::ExtractionConfig;
use crate::metadata::RawVideoMetadata;

/// Sampling tier chosen for a clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "sample_fps")]
pub enum SamplingRate {
    EveryFrame,
    Fixed(f64),
}

/// A frame the extraction engine should decode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRequest {
    pub index: u64,
    pub timestamp_secs: f64,
}

/// Ordered frames to sample from one video.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingPlan {
    pub rate: SamplingRate,
    pub frames: Vec<FrameRequest>,
}

impl SamplingPlan {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Pick the sampling tier for a clip duration.
pub fn sampling_rate(duration_secs: f64, config: &ExtractionConfig) -> SamplingRate {
    if duration_secs < config.full_rate_max_secs {
        SamplingRate::EveryFrame
    } else if duration_secs <= config.medium_rate_max_secs {
        SamplingRate::Fixed(config.medium_sample_fps)
    } else {
        SamplingRate::Fixed(config.long_sample_fps)
    }
}

/// Build the list of frames to decode. Empty for unreadable metadata.
pub fn plan(metadata: &RawVideoMetadata, config: &ExtractionConfig) -> SamplingPlan {
    let rate = sampling_rate(metadata.duration_secs, config);
    let total = metadata.total_frames();
    if total == 0 || !metadata.is_readable() {
        return SamplingPlan {
            rate,
            frames: Vec::new(),
        };
    }

    let frame_step = match rate {
        SamplingRate::EveryFrame => 1.0,
        // At least one frame apart even when the sample rate exceeds the video's.
        SamplingRate::Fixed(sample_fps) => (metadata.fps / sample_fps).max(1.0),
    };

    let mut frames = Vec::new();
    let mut k = 0u64;
    loop {
        let index = (k as f64 * frame_step).round() as u64;
        if index >= total {
            break;
        }
        frames.push(FrameRequest {
            index,
            timestamp_secs: index as f64 / metadata.fps,
        });
        k += 1;
    }

    SamplingPlan { rate, frames }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(duration_secs: f64, fps: f64) -> RawVideoMetadata {
        RawVideoMetadata {
            width: 1280,
            height: 720,
            duration_secs,
            fps,
            file_size_bytes: 0,
            frame_count: None,
        }
    }

    #[test]
    fn short_clip_samples_every_frame() {
        let p = plan(&meta(8.0, 30.0), &ExtractionConfig::default());
        assert_eq!(p.rate, SamplingRate::EveryFrame);
        assert_eq!(p.len(), 240);
        assert_eq!(p.frames[1].index, 1);
        assert!((p.frames[30].timestamp_secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn medium_clip_samples_once_per_second() {
        let p = plan(&meta(20.0, 30.0), &ExtractionConfig::default());
        assert_eq!(p.rate, SamplingRate::Fixed(1.0));
        assert_eq!(p.len(), 20);
        assert_eq!(p.frames[3].index, 90);
    }

    #[test]
    fn long_clip_samples_every_two_seconds() {
        let p = plan(&meta(40.0, 30.0), &ExtractionConfig::default());
        assert_eq!(p.rate, SamplingRate::Fixed(0.5));
        assert_eq!(p.len(), 20);
        assert!((p.frames[1].timestamp_secs - 2.0).abs() < 1e-9);
    }

    #[test]
    fn boundaries_follow_tiers() {
        let config = ExtractionConfig::default();
        assert_eq!(sampling_rate(9.99, &config), SamplingRate::EveryFrame);
        assert_eq!(sampling_rate(10.0, &config), SamplingRate::Fixed(1.0));
        assert_eq!(sampling_rate(30.0, &config), SamplingRate::Fixed(1.0));
        assert_eq!(sampling_rate(30.1, &config), SamplingRate::Fixed(0.5));
    }

    #[test]
    fn unreadable_metadata_yields_empty_plan() {
        assert!(plan(&meta(8.0, 0.0), &ExtractionConfig::default()).is_empty());
    }

    #[test]
    fn indices_are_strictly_increasing() {
        let p = plan(&meta(25.0, 24.0), &ExtractionConfig::default());
        assert!(p.frames.windows(2).all(|w| w[0].index < w[1].index));
    }
}
