//! FFprobe/FFmpeg-backed [`VideoSource`].
//!
//! Metadata comes from `ffprobe -print_format json`; frames are decoded one
//! at a time with `ffmpeg -ss <t> -frames:v 1 -f rawvideo -pix_fmt rgb24`
//! and read straight from stdout. Every subprocess runs under a timeout and
//! is killed when its future is dropped, so a cancelled request does not
//! leave decoders running.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::process::Command;
use tokio::sync::OnceCell;

use formcheck_core::metadata::RawVideoMetadata;
use formcheck_core::sampling::FrameRequest;

use crate::source::{Frame, RgbImage, VideoSource, VideoSourceError};

/// Default per-command timeout for ffprobe and single-frame ffmpeg calls.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Binaries and limits for the subprocess calls.
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    pub ffprobe_bin: String,
    pub ffmpeg_bin: String,
    pub command_timeout: Duration,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffprobe_bin: "ffprobe".to_string(),
            ffmpeg_bin: "ffmpeg".to_string(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    pub format: Option<FfprobeFormat>,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// e.g. "30/1" or "30000/1001"
    pub r_frame_rate: Option<String>,
    /// Preferred over `r_frame_rate` for variable-rate phone footage.
    pub avg_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
    /// Legacy rotation tag (`"90"`, `"-90"`, `"270"`).
    pub tags: Option<FfprobeStreamTags>,
    /// Display matrix rotation on newer ffprobe builds.
    #[serde(default)]
    pub side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Deserialize)]
pub struct FfprobeStreamTags {
    pub rotate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FfprobeSideData {
    pub rotation: Option<f64>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub size: Option<String>,
}

// ---------------------------------------------------------------------------
// FfmpegVideoSource
// ---------------------------------------------------------------------------

/// A video file on local disk, read through ffprobe/ffmpeg.
#[derive(Debug)]
pub struct FfmpegVideoSource {
    path: PathBuf,
    config: FfmpegConfig,
    metadata: OnceCell<RawVideoMetadata>,
}

impl FfmpegVideoSource {
    /// Bind to `path`. Nothing is read until the first call; a missing
    /// file surfaces from [`VideoSource::read_metadata`].
    pub fn new(path: impl Into<PathBuf>, config: FfmpegConfig) -> Self {
        Self {
            path: path.into(),
            config,
            metadata: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn probe(&self) -> Result<RawVideoMetadata, VideoSourceError> {
        if !self.path.exists() {
            return Err(VideoSourceError::VideoNotFound(
                self.path.to_string_lossy().to_string(),
            ));
        }

        let mut cmd = Command::new(&self.config.ffprobe_bin);
        cmd.args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(&self.path);

        let output = run(&mut cmd, "ffprobe", self.config.command_timeout).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let probe = serde_json::from_str::<FfprobeOutput>(&stdout)
            .map_err(|e| VideoSourceError::ParseError(format!("{e}: {stdout}")))?;

        let file_size = match parse_file_size(&probe) {
            Some(size) => size,
            None => tokio::fs::metadata(&self.path).await?.len(),
        };
        metadata_from_probe(&probe, file_size)
    }

    async fn decode(
        &self,
        request: FrameRequest,
        width: u32,
        height: u32,
    ) -> Result<Frame, VideoSourceError> {
        let mut cmd = Command::new(&self.config.ffmpeg_bin);
        cmd.args([
            "-v",
            "error",
            "-ss",
            &format!("{:.3}", request.timestamp_secs),
            "-i",
        ])
        .arg(&self.path)
        .args(["-frames:v", "1", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"]);

        let output = run(&mut cmd, "ffmpeg", self.config.command_timeout).await?;
        let got = output.stdout.len();
        let image = RgbImage::from_raw(width, height, output.stdout).ok_or_else(|| {
            VideoSourceError::FrameUnavailable {
                index: request.index,
                reason: format!(
                    "expected {} bytes of rgb24, got {got}",
                    RgbImage::frame_len(width, height)
                ),
            }
        })?;

        Ok(Frame {
            index: request.index,
            timestamp_secs: request.timestamp_secs,
            image,
        })
    }
}

impl VideoSource for FfmpegVideoSource {
    async fn read_metadata(&self) -> Result<RawVideoMetadata, VideoSourceError> {
        self.metadata
            .get_or_try_init(|| self.probe())
            .await
            .cloned()
    }

    async fn read_frame(&self, request: FrameRequest) -> Result<Frame, VideoSourceError> {
        let metadata = self.metadata.get_or_try_init(|| self.probe()).await?;
        self.decode(request, metadata.width, metadata.height).await
    }
}

/// Run `cmd` to completion under `limit`, capturing stdout and stderr.
///
/// The child is spawned with `kill_on_drop(true)`, so it is killed when the
/// timeout fires or the calling future is dropped.
async fn run(
    cmd: &mut Command,
    label: &'static str,
    limit: Duration,
) -> Result<Output, VideoSourceError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let output = match tokio::time::timeout(limit, cmd.output()).await {
        Ok(result) => result.map_err(VideoSourceError::NotFound)?,
        Err(_elapsed) => {
            return Err(VideoSourceError::Timeout {
                command: label,
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
        }
    };

    if !output.status.success() {
        return Err(VideoSourceError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(output)
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Convert probe output into [`RawVideoMetadata`].
///
/// Width and height are reported as displayed: ffmpeg applies the stream's
/// rotation when decoding, so a quarter-turn swaps the coded dimensions.
/// Missing numeric fields become zero rather than errors; the quality gate
/// classifies such metadata as unreadable. Only a file with no video stream
/// at all is a parse error.
pub fn metadata_from_probe(
    probe: &FfprobeOutput,
    file_size_bytes: u64,
) -> Result<RawVideoMetadata, VideoSourceError> {
    let stream = first_video_stream(probe)
        .ok_or_else(|| VideoSourceError::ParseError("no video stream".to_string()))?;

    let (coded_width, coded_height) = (stream.width.unwrap_or(0), stream.height.unwrap_or(0));
    let (width, height) = if is_quarter_turn(rotation_degrees(stream)) {
        (coded_height, coded_width)
    } else {
        (coded_width, coded_height)
    };

    Ok(RawVideoMetadata {
        width,
        height,
        duration_secs: parse_duration(probe),
        fps: parse_framerate(probe),
        file_size_bytes,
        frame_count: stream
            .nb_frames
            .as_deref()
            .and_then(|n| n.parse::<u64>().ok())
            .filter(|&n| n > 0),
    })
}

fn first_video_stream(probe: &FfprobeOutput) -> Option<&FfprobeStream> {
    probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
}

/// Stream rotation in degrees: display matrix first, then the `rotate` tag.
/// Zero when neither is present.
pub fn rotation_degrees(stream: &FfprobeStream) -> f64 {
    let side_data = stream.side_data_list.iter().find_map(|d| d.rotation);
    let tag = || {
        stream
            .tags
            .as_ref()
            .and_then(|t| t.rotate.as_deref())
            .and_then(|r| r.trim().parse::<f64>().ok())
    };
    side_data.or_else(tag).unwrap_or(0.0)
}

fn is_quarter_turn(degrees: f64) -> bool {
    let quarter_turns = (degrees / 90.0).round() as i64;
    quarter_turns.rem_euclid(2) == 1
}

/// Video duration in seconds: format-level first, then the video stream.
pub fn parse_duration(probe: &FfprobeOutput) -> f64 {
    let format = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());
    let stream = || {
        first_video_stream(probe)
            .and_then(|s| s.duration.as_deref())
            .and_then(|d| d.parse::<f64>().ok())
    };
    format.or_else(stream).unwrap_or(0.0)
}

/// Frame rate of the first video stream, from `avg_frame_rate` when it is
/// usable and `r_frame_rate` otherwise.
pub fn parse_framerate(probe: &FfprobeOutput) -> f64 {
    let Some(stream) = first_video_stream(probe) else {
        return 0.0;
    };
    [&stream.avg_frame_rate, &stream.r_frame_rate]
        .into_iter()
        .filter_map(|r| r.as_deref().map(parse_fraction))
        .find(|fps| *fps > 0.0)
        .unwrap_or(0.0)
}

fn parse_file_size(probe: &FfprobeOutput) -> Option<u64> {
    probe
        .format
        .as_ref()
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.parse::<u64>().ok())
}

/// Parse a fraction string like `"30000/1001"` into a float. `"0/0"` is 0.
fn parse_fraction(s: &str) -> f64 {
    match s.split_once('/') {
        Some((num, den)) => {
            let num = num.parse::<f64>().unwrap_or(0.0);
            let den = den.parse::<f64>().unwrap_or(0.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => s.parse::<f64>().unwrap_or(0.0),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn probe_json(json: &str) -> FfprobeOutput {
        serde_json::from_str(json).unwrap()
    }

    const PHONE_CLIP: &str = r#"{
        "streams": [
            {"codec_type": "audio", "duration": "8.05"},
            {
                "codec_type": "video",
                "width": 1280,
                "height": 720,
                "r_frame_rate": "30/1",
                "avg_frame_rate": "30000/1001",
                "duration": "8.008",
                "nb_frames": "240"
            }
        ],
        "format": {"duration": "8.050000", "size": "5242880"}
    }"#;

    const PORTRAIT_PHONE_CLIP: &str = r#"{
        "streams": [
            {
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "avg_frame_rate": "30/1",
                "nb_frames": "300",
                "side_data_list": [
                    {"side_data_type": "Display Matrix", "displaymatrix": "...", "rotation": -90}
                ]
            }
        ],
        "format": {"duration": "10.0", "size": "9000000"}
    }"#;

    // -- parse_fraction ---

    #[test]
    fn parse_fraction_values() {
        assert_eq!(parse_fraction("30/1"), 30.0);
        assert!((parse_fraction("30000/1001") - 29.97).abs() < 0.01);
        assert_eq!(parse_fraction("0/0"), 0.0);
        assert_eq!(parse_fraction("25"), 25.0);
        assert_eq!(parse_fraction("n/a"), 0.0);
    }

    // -- parse_duration ---

    #[test]
    fn duration_prefers_format_level() {
        assert_eq!(parse_duration(&probe_json(PHONE_CLIP)), 8.05);
    }

    #[test]
    fn duration_falls_back_to_stream() {
        let probe = probe_json(
            r#"{"streams": [{"codec_type": "video", "duration": "4.5"}], "format": {}}"#,
        );
        assert_eq!(parse_duration(&probe), 4.5);
    }

    // -- parse_framerate ---

    #[test]
    fn framerate_prefers_average_rate() {
        assert!((parse_framerate(&probe_json(PHONE_CLIP)) - 29.97).abs() < 0.01);
    }

    #[test]
    fn framerate_skips_zero_average() {
        let probe = probe_json(
            r#"{"streams": [{"codec_type": "video", "r_frame_rate": "60/1", "avg_frame_rate": "0/0"}]}"#,
        );
        assert_eq!(parse_framerate(&probe), 60.0);
    }

    // -- metadata_from_probe ---

    #[test]
    fn metadata_from_phone_clip() {
        let probe = probe_json(PHONE_CLIP);
        let meta = metadata_from_probe(&probe, parse_file_size(&probe).unwrap()).unwrap();
        assert_eq!(meta.width, 1280);
        assert_eq!(meta.height, 720);
        assert_eq!(meta.file_size_bytes, 5_242_880);
        assert_eq!(meta.frame_count, Some(240));
        assert!(meta.is_readable());
    }

    #[test]
    fn portrait_clip_reports_displayed_dimensions() {
        let probe = probe_json(PORTRAIT_PHONE_CLIP);
        let meta = metadata_from_probe(&probe, 9_000_000).unwrap();
        assert_eq!((meta.width, meta.height), (1080, 1920));
        assert_eq!(meta.resolution_label(), "1080x1920");
    }

    #[test]
    fn legacy_rotate_tag_swaps_dimensions() {
        let probe = probe_json(
            r#"{"streams": [{"codec_type": "video", "width": 1280, "height": 720,
                "avg_frame_rate": "30/1", "tags": {"rotate": "270"}}],
                "format": {"duration": "6.0"}}"#,
        );
        let meta = metadata_from_probe(&probe, 1).unwrap();
        assert_eq!((meta.width, meta.height), (720, 1280));
    }

    #[test]
    fn half_turn_keeps_dimensions() {
        let probe = probe_json(
            r#"{"streams": [{"codec_type": "video", "width": 1280, "height": 720,
                "side_data_list": [{"side_data_type": "Display Matrix", "rotation": 180}]}]}"#,
        );
        let meta = metadata_from_probe(&probe, 1).unwrap();
        assert_eq!((meta.width, meta.height), (1280, 720));
    }

    // -- rotation_degrees ---

    #[test]
    fn rotation_prefers_display_matrix() {
        let probe = probe_json(
            r#"{"streams": [{"codec_type": "video", "tags": {"rotate": "180"},
                "side_data_list": [{"side_data_type": "Other"}, {"rotation": 90}]}]}"#,
        );
        assert_eq!(rotation_degrees(&probe.streams[0]), 90.0);
        assert_eq!(
            rotation_degrees(&probe_json(PHONE_CLIP).streams[1]),
            0.0
        );
    }

    #[test]
    fn quarter_turns() {
        assert!(is_quarter_turn(90.0));
        assert!(is_quarter_turn(-90.0));
        assert!(is_quarter_turn(270.0));
        assert!(!is_quarter_turn(0.0));
        assert!(!is_quarter_turn(-180.0));
    }

    #[test]
    fn missing_fields_become_unreadable_metadata() {
        let probe = probe_json(r#"{"streams": [{"codec_type": "video"}]}"#);
        let meta = metadata_from_probe(&probe, 0).unwrap();
        assert_eq!(meta.width, 0);
        assert_eq!(meta.frame_count, None);
        assert!(!meta.is_readable());
    }

    #[test]
    fn audio_only_is_parse_error() {
        let probe = probe_json(r#"{"streams": [{"codec_type": "audio"}], "format": {}}"#);
        assert_matches!(
            metadata_from_probe(&probe, 100),
            Err(VideoSourceError::ParseError(_))
        );
    }

    // -- read_metadata ---

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let source = FfmpegVideoSource::new("/nonexistent/clip.mp4", FfmpegConfig::default());
        assert_matches!(
            source.read_metadata().await,
            Err(VideoSourceError::VideoNotFound(_))
        );
    }

    #[tokio::test]
    async fn missing_binary_is_not_found() {
        let source = FfmpegVideoSource::new(
            concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"),
            FfmpegConfig {
                ffprobe_bin: "/nonexistent/ffprobe".into(),
                ..FfmpegConfig::default()
            },
        );
        assert_matches!(
            source.read_metadata().await,
            Err(VideoSourceError::NotFound(_))
        );
    }
}
