//! Scoring engine: per-rep category values to category scores and feedback.
//!
//! Every measured value is classified against its [`CategoryStandard`] and
//! scored as `100 - penalty`; a category's score is the rounded mean of its
//! measured values, floored. Categories with no measured value at all get
//! the fallback score and stay out of penalty-driven feedback. The overall
//! score is the plain rounded mean of all category scores, so it can be
//! reproduced by hand from the breakdown.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::standards::{Category, CategoryStandard, ExerciseStandard, Severity};

/// Cue given when every measured category is already perfect.
pub const MAINTENANCE_CUE: &str = "Keep this technique consistent as the load increases";

/// Per-category values, one entry per rep (`None` = not measured in that rep).
pub type CategoryValues = BTreeMap<Category, Vec<Option<f64>>>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Score and feedback for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    /// Always within `[score_floor, 100]`.
    pub score: u32,
    pub feedback: String,
    /// Whether any rep produced a value. Unmeasured categories carry the
    /// fallback score.
    pub measured: bool,
    pub measured_reps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_severity: Option<Severity>,
}

/// Spread between the best and worst scored reps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsistencySummary {
    /// 1-based rep numbers.
    pub best_rep: usize,
    pub worst_rep: usize,
    pub best_score: u32,
    pub worst_score: u32,
    pub spread: u32,
    pub consistent: bool,
}

/// Everything the scoring engine derives from one set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub overall_score: u32,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub specific_cues: Vec<String>,
    pub exercise_breakdown: BTreeMap<Category, CategoryScore>,
    /// Mean of each rep's measured category scores, `None` when a rep had
    /// no measured category. Informational only.
    pub rep_scores: Vec<Option<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consistency: Option<ConsistencySummary>,
}

// ---------------------------------------------------------------------------
// Value and category scoring
// ---------------------------------------------------------------------------

/// Score one measured value: 100 minus its severity penalty, floored.
pub fn score_value(standard: &CategoryStandard, value: f64, config: &ScoringConfig) -> u32 {
    let penalty = standard.penalties.for_severity(standard.classify(value));
    100u32.saturating_sub(penalty).max(config.score_floor)
}

/// Score one category from its per-rep values.
pub fn score_category(
    standard: &CategoryStandard,
    values: &[Option<f64>],
    config: &ScoringConfig,
) -> CategoryScore {
    let measured: Vec<f64> = values
        .iter()
        .flatten()
        .copied()
        .filter(|v| v.is_finite())
        .collect();

    if measured.is_empty() {
        return CategoryScore {
            category: standard.category,
            score: config.fallback_score,
            feedback: format!(
                "Could not measure {}: the required joints were not visible",
                standard.category.label()
            ),
            measured: false,
            measured_reps: 0,
            mean_value: None,
            worst_severity: None,
        };
    }

    let per_value: Vec<u32> = measured
        .iter()
        .map(|&v| score_value(standard, v, config))
        .collect();
    let score = round_mean(&per_value).clamp(config.score_floor, 100);
    let mean_value = measured.iter().sum::<f64>() / measured.len() as f64;
    let worst_severity = measured.iter().map(|&v| standard.classify(v)).max();

    CategoryScore {
        category: standard.category,
        score,
        feedback: feedback_text(standard, score, mean_value, config),
        measured: true,
        measured_reps: measured.len(),
        mean_value: Some(mean_value),
        worst_severity,
    }
}

fn feedback_text(standard: &CategoryStandard, score: u32, mean: f64, config: &ScoringConfig) -> String {
    let label = standard.category.label();
    let value = standard.unit.format(mean);
    let ideal = standard.ideal_label();
    if score >= config.strength_threshold {
        format!("Good {label}: average {value} (ideal {ideal})")
    } else if score >= config.improvement_threshold {
        format!("Acceptable {label}: average {value} (ideal {ideal})")
    } else {
        format!("Needs improvement in {label}: average {value} (ideal {ideal})")
    }
}

/// Round the arithmetic mean, halves away from zero. 0 for an empty slice.
pub fn round_mean(scores: &[u32]) -> u32 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u64 = scores.iter().map(|&s| u64::from(s)).sum();
    (sum as f64 / scores.len() as f64).round() as u32
}

// ---------------------------------------------------------------------------
// Set scoring
// ---------------------------------------------------------------------------

/// Score a full set against an exercise standard.
///
/// `values` must hold `rep_count` entries per category; categories the
/// standard defines but `values` lacks are treated as unmeasured.
pub fn score_set(
    standard: &ExerciseStandard,
    values: &CategoryValues,
    rep_count: usize,
    config: &ScoringConfig,
) -> ScoreCard {
    let mut breakdown = BTreeMap::new();
    for cat in &standard.categories {
        let per_rep = values.get(&cat.category).map(Vec::as_slice).unwrap_or(&[]);
        breakdown.insert(cat.category, score_category(cat, per_rep, config));
    }

    let overall_score = overall_score(&breakdown);
    let rep_scores = rep_scores(standard, values, rep_count, config);

    ScoreCard {
        overall_score,
        strengths: strengths(&breakdown, config),
        areas_for_improvement: areas_for_improvement(&breakdown, config),
        specific_cues: specific_cues(&breakdown, config),
        consistency: consistency(&rep_scores, config),
        exercise_breakdown: breakdown,
        rep_scores,
    }
}

/// Rounded unweighted mean of every category score, fallbacks included.
pub fn overall_score(breakdown: &BTreeMap<Category, CategoryScore>) -> u32 {
    let scores: Vec<u32> = breakdown.values().map(|c| c.score).collect();
    round_mean(&scores)
}

/// Measured categories sorted by score, best first (ties in category order).
fn ranked(breakdown: &BTreeMap<Category, CategoryScore>) -> Vec<&CategoryScore> {
    let mut measured: Vec<&CategoryScore> = breakdown.values().filter(|c| c.measured).collect();
    measured.sort_by(|a, b| b.score.cmp(&a.score).then(a.category.cmp(&b.category)));
    measured
}

/// Measured categories at or above the strength threshold, best first.
pub fn strengths(breakdown: &BTreeMap<Category, CategoryScore>, config: &ScoringConfig) -> Vec<String> {
    ranked(breakdown)
        .into_iter()
        .filter(|c| c.score >= config.strength_threshold)
        .map(|c| c.category.to_string())
        .collect()
}

/// Measured categories below the improvement threshold, worst first.
pub fn areas_for_improvement(
    breakdown: &BTreeMap<Category, CategoryScore>,
    config: &ScoringConfig,
) -> Vec<String> {
    ranked(breakdown)
        .into_iter()
        .rev()
        .filter(|c| c.score < config.improvement_threshold)
        .map(|c| c.category.to_string())
        .collect()
}

/// Cues for the worst measured categories that lost points (at most
/// `max_cues`), or a single maintenance cue when none did.
pub fn specific_cues(
    breakdown: &BTreeMap<Category, CategoryScore>,
    config: &ScoringConfig,
) -> Vec<String> {
    let mut worst = ranked(breakdown);
    worst.reverse();
    let any_measured = !worst.is_empty();

    let cues: Vec<String> = worst
        .into_iter()
        .filter(|c| c.score < 100)
        .take(config.max_cues)
        .map(|c| c.category.cue().to_string())
        .collect();

    if cues.is_empty() && any_measured {
        vec![MAINTENANCE_CUE.to_string()]
    } else {
        cues
    }
}

fn rep_scores(
    standard: &ExerciseStandard,
    values: &CategoryValues,
    rep_count: usize,
    config: &ScoringConfig,
) -> Vec<Option<u32>> {
    (0..rep_count)
        .map(|rep| {
            let scores: Vec<u32> = standard
                .categories
                .iter()
                .filter_map(|cat| {
                    let value = values.get(&cat.category)?.get(rep).copied().flatten()?;
                    value
                        .is_finite()
                        .then(|| score_value(cat, value, config))
                })
                .collect();
            (!scores.is_empty()).then(|| round_mean(&scores))
        })
        .collect()
}

/// Best/worst rep comparison. `None` with fewer than two scored reps.
pub fn consistency(rep_scores: &[Option<u32>], config: &ScoringConfig) -> Option<ConsistencySummary> {
    let scored: Vec<(usize, u32)> = rep_scores
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.map(|s| (i + 1, s)))
        .collect();
    if scored.len() < 2 {
        return None;
    }

    // Earliest rep wins ties on both ends.
    let (mut best_rep, mut best_score) = scored[0];
    let (mut worst_rep, mut worst_score) = scored[0];
    for &(rep, score) in &scored[1..] {
        if score > best_score {
            (best_rep, best_score) = (rep, score);
        }
        if score < worst_score {
            (worst_rep, worst_score) = (rep, score);
        }
    }

    let spread = best_score - worst_score;
    Some(ConsistencySummary {
        best_rep,
        worst_rep,
        best_score,
        worst_score,
        spread,
        consistent: spread <= config.consistency_spread,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
