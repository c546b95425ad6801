//! Immutable analysis configuration.
//!
//! One [`AnalysisConfig`] value is built at startup (defaults, optionally
//! overridden from the environment by the worker), validated once, and then
//! passed by reference into every stage. Nothing here is global.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;
use crate::landmarks::{
    DEFAULT_MIN_LANDMARK_CONFIDENCE, DEFAULT_MIN_VISIBLE_LANDMARKS, LANDMARK_COUNT,
};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Minimum acceptable frame width in pixels.
pub const DEFAULT_MIN_WIDTH: u32 = 480;
/// Minimum acceptable frame height in pixels.
pub const DEFAULT_MIN_HEIGHT: u32 = 360;
/// Width below which a passing video still gets a resolution warning.
pub const DEFAULT_RECOMMENDED_WIDTH: u32 = 1280;
/// Height below which a passing video still gets a resolution warning.
pub const DEFAULT_RECOMMENDED_HEIGHT: u32 = 720;
/// Shortest accepted clip, in seconds.
pub const DEFAULT_MIN_DURATION_SECS: f64 = 2.0;
/// Longest accepted clip, in seconds.
pub const DEFAULT_MAX_DURATION_SECS: f64 = 60.0;
/// Lower edge of the optimal clip length, in seconds.
pub const DEFAULT_OPTIMAL_MIN_DURATION_SECS: f64 = 5.0;
/// Upper edge of the optimal clip length, in seconds.
pub const DEFAULT_OPTIMAL_MAX_DURATION_SECS: f64 = 15.0;
/// Lowest accepted frame rate.
pub const DEFAULT_MIN_FPS: f64 = 15.0;

/// Fraction of sampled frames that must yield a usable pose.
pub const DEFAULT_MIN_POSE_SUCCESS_RATE: f64 = 0.6;

/// Clips shorter than this are sampled at every frame.
pub const DEFAULT_FULL_RATE_MAX_SECS: f64 = 10.0;
/// Clips up to this length are sampled at [`DEFAULT_MEDIUM_SAMPLE_FPS`].
pub const DEFAULT_MEDIUM_RATE_MAX_SECS: f64 = 30.0;
pub const DEFAULT_MEDIUM_SAMPLE_FPS: f64 = 1.0;
pub const DEFAULT_LONG_SAMPLE_FPS: f64 = 0.5;

/// Score given to a category with no measured values.
pub const DEFAULT_FALLBACK_SCORE: u32 = 75;
/// No measured category scores below this.
pub const DEFAULT_SCORE_FLOOR: u32 = 30;
/// Categories at or above this are strengths.
pub const DEFAULT_STRENGTH_THRESHOLD: u32 = 80;
/// Categories below this are areas for improvement.
pub const DEFAULT_IMPROVEMENT_THRESHOLD: u32 = 60;
/// Upper bound on specific cues.
pub const DEFAULT_MAX_CUES: usize = 3;
/// Best-to-worst rep spread at or below which a set counts as consistent.
pub const DEFAULT_CONSISTENCY_SPREAD: u32 = 20;

/// Mean joint speed (normalized image units per second) above which the
/// body counts as moving.
pub const DEFAULT_MOTION_THRESHOLD: f64 = 0.03;
/// Shortest run of motion that counts as a movement period, seconds.
pub const DEFAULT_MIN_MOVEMENT_SECS: f64 = 1.0;
/// Joint confidence required for movement tracking.
pub const DEFAULT_MOVEMENT_JOINT_CONFIDENCE: f64 = 0.5;

/// External per-request timeout (five minutes).
pub const DEFAULT_PIPELINE_TIMEOUT_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Thresholds for the metadata quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct QualityGateConfig {
    #[validate(range(min = 1))]
    pub min_width: u32,
    #[validate(range(min = 1))]
    pub min_height: u32,
    pub recommended_width: u32,
    pub recommended_height: u32,
    #[validate(range(min = 0.0))]
    pub min_duration_secs: f64,
    #[validate(range(min = 0.0))]
    pub max_duration_secs: f64,
    pub optimal_min_duration_secs: f64,
    pub optimal_max_duration_secs: f64,
    #[validate(range(min = 1.0, max = 1000.0))]
    pub min_fps: f64,
}

impl Default for QualityGateConfig {
    fn default() -> Self {
        Self {
            min_width: DEFAULT_MIN_WIDTH,
            min_height: DEFAULT_MIN_HEIGHT,
            recommended_width: DEFAULT_RECOMMENDED_WIDTH,
            recommended_height: DEFAULT_RECOMMENDED_HEIGHT,
            min_duration_secs: DEFAULT_MIN_DURATION_SECS,
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            optimal_min_duration_secs: DEFAULT_OPTIMAL_MIN_DURATION_SECS,
            optimal_max_duration_secs: DEFAULT_OPTIMAL_MAX_DURATION_SECS,
            min_fps: DEFAULT_MIN_FPS,
        }
    }
}

/// Frame sampling and per-frame reliability thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExtractionConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_landmark_confidence: f64,
    #[validate(range(min = 1, max = 33))]
    pub min_visible_landmarks: usize,
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_pose_success_rate: f64,
    #[validate(range(min = 0.0))]
    pub full_rate_max_secs: f64,
    #[validate(range(min = 0.0))]
    pub medium_rate_max_secs: f64,
    #[validate(range(min = 0.01))]
    pub medium_sample_fps: f64,
    #[validate(range(min = 0.01))]
    pub long_sample_fps: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_landmark_confidence: DEFAULT_MIN_LANDMARK_CONFIDENCE,
            min_visible_landmarks: DEFAULT_MIN_VISIBLE_LANDMARKS,
            min_pose_success_rate: DEFAULT_MIN_POSE_SUCCESS_RATE,
            full_rate_max_secs: DEFAULT_FULL_RATE_MAX_SECS,
            medium_rate_max_secs: DEFAULT_MEDIUM_RATE_MAX_SECS,
            medium_sample_fps: DEFAULT_MEDIUM_SAMPLE_FPS,
            long_sample_fps: DEFAULT_LONG_SAMPLE_FPS,
        }
    }
}

/// Category scoring and feedback thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ScoringConfig {
    #[validate(range(min = 0, max = 100))]
    pub fallback_score: u32,
    #[validate(range(min = 1, max = 100))]
    pub score_floor: u32,
    #[validate(range(min = 0, max = 100))]
    pub strength_threshold: u32,
    #[validate(range(min = 0, max = 100))]
    pub improvement_threshold: u32,
    #[validate(range(min = 1, max = 10))]
    pub max_cues: usize,
    #[validate(range(min = 0, max = 100))]
    pub consistency_spread: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            fallback_score: DEFAULT_FALLBACK_SCORE,
            score_floor: DEFAULT_SCORE_FLOOR,
            strength_threshold: DEFAULT_STRENGTH_THRESHOLD,
            improvement_threshold: DEFAULT_IMPROVEMENT_THRESHOLD,
            max_cues: DEFAULT_MAX_CUES,
            consistency_spread: DEFAULT_CONSISTENCY_SPREAD,
        }
    }
}

/// Movement-window detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MovementConfig {
    #[validate(range(min = 0.0))]
    pub motion_threshold: f64,
    #[validate(range(min = 0.0))]
    pub min_movement_secs: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub joint_confidence: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            min_movement_secs: DEFAULT_MIN_MOVEMENT_SECS,
            joint_confidence: DEFAULT_MOVEMENT_JOINT_CONFIDENCE,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Complete configuration for one analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AnalysisConfig {
    #[validate(nested)]
    pub quality_gate: QualityGateConfig,
    #[validate(nested)]
    pub extraction: ExtractionConfig,
    #[validate(nested)]
    pub scoring: ScoringConfig,
    #[validate(nested)]
    pub movement: MovementConfig,
    #[validate(range(min = 1))]
    pub pipeline_timeout_secs: u64,
}

impl AnalysisConfig {
    /// Run field range checks and cross-field checks, returning the config
    /// unchanged when it is consistent.
    pub fn validated(self) -> Result<Self, CoreError> {
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        validate_cross_fields(&self)?;
        Ok(self)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            quality_gate: QualityGateConfig::default(),
            extraction: ExtractionConfig::default(),
            scoring: ScoringConfig::default(),
            movement: MovementConfig::default(),
            pipeline_timeout_secs: DEFAULT_PIPELINE_TIMEOUT_SECS,
        }
    }
}

fn validate_cross_fields(config: &AnalysisConfig) -> Result<(), CoreError> {
    let gate = &config.quality_gate;
    if gate.min_duration_secs >= gate.max_duration_secs {
        return Err(CoreError::Validation(format!(
            "min_duration_secs ({}) must be < max_duration_secs ({})",
            gate.min_duration_secs, gate.max_duration_secs
        )));
    }
    if gate.optimal_min_duration_secs > gate.optimal_max_duration_secs
        || gate.optimal_min_duration_secs < gate.min_duration_secs
        || gate.optimal_max_duration_secs > gate.max_duration_secs
    {
        return Err(CoreError::Validation(format!(
            "optimal duration window {}..{} must lie within {}..{}",
            gate.optimal_min_duration_secs,
            gate.optimal_max_duration_secs,
            gate.min_duration_secs,
            gate.max_duration_secs
        )));
    }
    if gate.recommended_width < gate.min_width || gate.recommended_height < gate.min_height {
        return Err(CoreError::Validation(
            "recommended resolution must not be below the minimum resolution".to_string(),
        ));
    }

    let extraction = &config.extraction;
    if extraction.full_rate_max_secs > extraction.medium_rate_max_secs {
        return Err(CoreError::Validation(format!(
            "full_rate_max_secs ({}) must be <= medium_rate_max_secs ({})",
            extraction.full_rate_max_secs, extraction.medium_rate_max_secs
        )));
    }
    if extraction.min_visible_landmarks > LANDMARK_COUNT {
        return Err(CoreError::Validation(format!(
            "min_visible_landmarks must be <= {LANDMARK_COUNT}"
        )));
    }

    let scoring = &config.scoring;
    if scoring.fallback_score < scoring.score_floor {
        return Err(CoreError::Validation(format!(
            "fallback_score ({}) must be >= score_floor ({})",
            scoring.fallback_score, scoring.score_floor
        )));
    }
    if scoring.improvement_threshold > scoring.strength_threshold {
        return Err(CoreError::Validation(format!(
            "improvement_threshold ({}) must be <= strength_threshold ({})",
            scoring.improvement_threshold, scoring.strength_threshold
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
