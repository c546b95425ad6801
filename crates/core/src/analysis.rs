//! Post-extraction stages: tracking series, rep segmentation, per-rep
//! metrics and scoring.
//!
//! Runs on the usable pose frames once extraction has passed its gate. The
//! only failure left at this point is [`AnalysisError::NoRepsDetected`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analyzers::analyzer_for;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::exercise::ExerciseType;
use crate::movement::{self, MovementSummary};
use crate::quality_gate::GateIssue;
use crate::reliability::{PoseFrame, QualityReport};
use crate::scoring::{self, CategoryScore, ConsistencySummary};
use crate::segmentation::{self, PartialMetrics, Rep, SegmentationParams};
use crate::standards::{standard_for, Category};

/// A successful form assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub exercise: ExerciseType,
    /// `round(mean(category scores))`.
    pub overall_score: u32,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub specific_cues: Vec<String>,
    pub exercise_breakdown: BTreeMap<Category, CategoryScore>,
    pub rep_count: usize,
    pub reps: Vec<Rep>,
    pub rep_scores: Vec<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<ConsistencySummary>,
    pub tracking_signal: String,
    pub quality: QualityReport,
    pub movement: MovementSummary,
    /// Non-blocking quality gate findings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<GateIssue>,
}

impl AnalysisResult {
    pub fn with_warnings(mut self, warnings: Vec<GateIssue>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Segment, measure and score the usable frames of one set.
pub fn analyze(
    exercise: ExerciseType,
    frames: &[PoseFrame],
    quality: QualityReport,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, AnalysisError> {
    let analyzer = analyzer_for(exercise, config.extraction.min_landmark_confidence);
    let series = analyzer.tracking_series(frames);
    let segmentation = segmentation::segment(&series, &SegmentationParams::for_exercise(exercise));
    let movement = movement::summarize(frames, &config.movement);

    if segmentation.reps.is_empty() {
        let partial = PartialMetrics::new(&series, &segmentation).with_movement(Some(movement));
        return Err(AnalysisError::NoRepsDetected {
            report: quality,
            partial,
        });
    }

    let reps = segmentation.reps;
    let values = analyzer.compute_metrics(frames, &reps);
    let card = scoring::score_set(standard_for(exercise), &values, reps.len(), &config.scoring);

    Ok(AnalysisResult {
        exercise,
        overall_score: card.overall_score,
        strengths: card.strengths,
        areas_for_improvement: card.areas_for_improvement,
        specific_cues: card.specific_cues,
        exercise_breakdown: card.exercise_breakdown,
        rep_count: reps.len(),
        reps,
        rep_scores: card.rep_scores,
        consistency: card.consistency,
        tracking_signal: series.name,
        quality,
        movement,
        warnings: Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
