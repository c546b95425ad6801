use anyhow::Context;

use formcheck_core::config::AnalysisConfig;
use formcheck_pipeline::ffmpeg::FfmpegConfig;

/// Default number of analyses allowed to run at once.
pub const DEFAULT_MAX_CONCURRENT_ANALYSES: usize = 4;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Worker configuration loaded from environment variables.
///
/// Every key has a default; a key that is set but malformed is a startup
/// error rather than a silent fallback.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Thresholds for every stage, validated.
    pub analysis: AnalysisConfig,
    /// ffprobe/ffmpeg binaries.
    pub ffmpeg: FfmpegConfig,
    /// Upper bound on concurrently running analyses.
    pub max_concurrent_analyses: usize,
    pub log_format: LogFormat,
}

impl WorkerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                   | Default   |
    /// |---------------------------|-----------|
    /// | `MIN_LANDMARK_CONFIDENCE` | `0.7`     |
    /// | `MIN_VISIBLE_LANDMARKS`   | `20`      |
    /// | `MIN_POSE_SUCCESS_RATE`   | `0.6`     |
    /// | `PIPELINE_TIMEOUT_SECS`   | `300`     |
    /// | `MAX_CONCURRENT_ANALYSES` | `4`       |
    /// | `FFPROBE_BIN`             | `ffprobe` |
    /// | `FFMPEG_BIN`              | `ffmpeg`  |
    /// | `LOG_FORMAT`              | `text`    |
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut analysis = AnalysisConfig::default();
        let extraction = &mut analysis.extraction;

        if let Some(v) = parsed(&lookup, "MIN_LANDMARK_CONFIDENCE")? {
            extraction.min_landmark_confidence = v;
        }
        if let Some(v) = parsed(&lookup, "MIN_VISIBLE_LANDMARKS")? {
            extraction.min_visible_landmarks = v;
        }
        if let Some(v) = parsed(&lookup, "MIN_POSE_SUCCESS_RATE")? {
            extraction.min_pose_success_rate = v;
        }
        if let Some(v) = parsed(&lookup, "PIPELINE_TIMEOUT_SECS")? {
            analysis.pipeline_timeout_secs = v;
        }
        let analysis = analysis
            .validated()
            .context("invalid analysis configuration")?;

        let max_concurrent_analyses =
            parsed(&lookup, "MAX_CONCURRENT_ANALYSES")?.unwrap_or(DEFAULT_MAX_CONCURRENT_ANALYSES);
        if max_concurrent_analyses == 0 {
            anyhow::bail!("MAX_CONCURRENT_ANALYSES must be at least 1");
        }

        let defaults = FfmpegConfig::default();
        let ffmpeg = FfmpegConfig {
            ffprobe_bin: lookup("FFPROBE_BIN").unwrap_or(defaults.ffprobe_bin),
            ffmpeg_bin: lookup("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            command_timeout: defaults.command_timeout,
        };

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{other}'"),
        };

        Ok(Self {
            analysis,
            ffmpeg,
            max_concurrent_analyses,
            log_format,
        })
    }
}

/// Parse `key` if it is set; `Ok(None)` when unset or blank.
fn parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{key} must be a valid {}", std::any::type_name::<T>())),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<WorkerConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.analysis, AnalysisConfig::default());
        assert_eq!(config.max_concurrent_analyses, DEFAULT_MAX_CONCURRENT_ANALYSES);
        assert_eq!(config.ffmpeg.ffprobe_bin, "ffprobe");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn overrides_are_applied() {
        let config = load(&[
            ("MIN_LANDMARK_CONFIDENCE", "0.5"),
            ("MIN_VISIBLE_LANDMARKS", "25"),
            ("MIN_POSE_SUCCESS_RATE", " 0.8 "),
            ("PIPELINE_TIMEOUT_SECS", "60"),
            ("MAX_CONCURRENT_ANALYSES", "2"),
            ("FFMPEG_BIN", "/opt/ffmpeg/bin/ffmpeg"),
            ("LOG_FORMAT", "json"),
        ])
        .unwrap();
        assert_eq!(config.analysis.extraction.min_landmark_confidence, 0.5);
        assert_eq!(config.analysis.extraction.min_visible_landmarks, 25);
        assert_eq!(config.analysis.extraction.min_pose_success_rate, 0.8);
        assert_eq!(config.analysis.pipeline_timeout_secs, 60);
        assert_eq!(config.max_concurrent_analyses, 2);
        assert_eq!(config.ffmpeg.ffmpeg_bin, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn malformed_number_is_an_error() {
        let err = load(&[("MIN_VISIBLE_LANDMARKS", "lots")]).unwrap_err();
        assert!(err.to_string().contains("MIN_VISIBLE_LANDMARKS"));
    }

    #[test]
    fn out_of_range_threshold_is_an_error() {
        assert!(load(&[("MIN_POSE_SUCCESS_RATE", "1.5")]).is_err());
        assert!(load(&[("PIPELINE_TIMEOUT_SECS", "0")]).is_err());
    }

    #[test]
    fn zero_concurrency_is_an_error() {
        assert!(load(&[("MAX_CONCURRENT_ANALYSES", "0")]).is_err());
    }

    #[test]
    fn unknown_log_format_is_an_error() {
        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }
}
