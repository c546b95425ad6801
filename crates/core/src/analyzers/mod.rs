//! Exercise analyzers.
//!
//! One implementation of [`ExerciseAnalyzer`] per supported exercise. An
//! analyzer owns two decisions: which signal segmentation tracks, and how
//! each scored category is measured per rep. Adding an exercise means a new
//! analyzer plus a standards entry; segmentation and scoring stay as they
//! are.

pub mod back_squat;
pub mod conventional_deadlift;
pub mod front_squat;
pub mod measure;
pub mod sumo_deadlift;

use std::collections::BTreeMap;

use crate::exercise::ExerciseType;
use crate::reliability::PoseFrame;
use crate::scoring::CategoryValues;
use crate::segmentation::Rep;
use crate::series::MetricSeries;
use crate::standards::{standard_for, Category};

pub use back_squat::BackSquatAnalyzer;
pub use conventional_deadlift::ConventionalDeadliftAnalyzer;
pub use front_squat::FrontSquatAnalyzer;
pub use measure::Measure;
pub use sumo_deadlift::SumoDeadliftAnalyzer;

/// Tracking signal for squats: shoulder-hip-knee angle.
pub const SIGNAL_HIP_ANGLE: &str = "hip_angle";
/// Tracking signal for hinges: hip y minus shoulder y.
pub const SIGNAL_HIP_SHOULDER_VERTICAL: &str = "hip_shoulder_vertical";

/// Category values measured for one rep. Missing keys are unmeasured.
pub type RepMeasurements = BTreeMap<Category, Option<f64>>;

/// Exercise-specific metric computation.
pub trait ExerciseAnalyzer: Send + Sync {
    fn exercise(&self) -> ExerciseType;

    /// Name of the signal reps are segmented on.
    fn tracking_signal(&self) -> &'static str;

    /// Tracking-signal value for one frame.
    fn track(&self, frame: &PoseFrame) -> Option<f64>;

    /// Every category of this exercise, measured over one rep.
    fn measure_rep(&self, frames: &[PoseFrame], rep: &Rep) -> RepMeasurements;

    /// Tracking series over the usable frames.
    fn tracking_series(&self, frames: &[PoseFrame]) -> MetricSeries {
        MetricSeries::from_frames(self.tracking_signal(), frames, |f| self.track(f))
    }

    /// Per-category values, one entry per rep, for every category in the
    /// exercise's standard.
    fn compute_metrics(&self, frames: &[PoseFrame], reps: &[Rep]) -> CategoryValues {
        let standard = standard_for(self.exercise());
        let mut values: CategoryValues = standard
            .categories
            .iter()
            .map(|c| (c.category, Vec::with_capacity(reps.len())))
            .collect();

        for rep in reps {
            let measured = self.measure_rep(frames, rep);
            for (category, per_rep) in values.iter_mut() {
                let value = measured.get(category).copied().flatten();
                per_rep.push(value.filter(|v| v.is_finite()));
            }
        }
        values
    }
}

/// The analyzer for an exercise, gating joints at `min_confidence`.
pub fn analyzer_for(exercise: ExerciseType, min_confidence: f64) -> Box<dyn ExerciseAnalyzer> {
    let measure = Measure::new(min_confidence);
    match exercise {
        ExerciseType::BackSquat => Box::new(BackSquatAnalyzer::new(measure)),
        ExerciseType::FrontSquat => Box::new(FrontSquatAnalyzer::new(measure)),
        ExerciseType::ConventionalDeadlift => Box::new(ConventionalDeadliftAnalyzer::new(measure)),
        ExerciseType::SumoDeadlift => Box::new(SumoDeadliftAnalyzer::new(measure)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::DEFAULT_MIN_LANDMARK_CONFIDENCE;
    use crate::test_support::LiftScript;

    #[test]
    fn factory_returns_matching_analyzer() {
        for exercise in ExerciseType::ALL {
            let analyzer = analyzer_for(exercise, DEFAULT_MIN_LANDMARK_CONFIDENCE);
            assert_eq!(analyzer.exercise(), exercise);
        }
    }

    #[test]
    fn compute_metrics_covers_every_standard_category() {
        let frames = LiftScript::deadlift(2).frames();
        let reps = [
            Rep {
                start: 30,
                end: 120,
                extremum: 75,
                extremum_value: 0.0,
            },
            Rep {
                start: 120,
                end: 210,
                extremum: 165,
                extremum_value: 0.0,
            },
        ];
        for exercise in ExerciseType::ALL {
            let analyzer = analyzer_for(exercise, DEFAULT_MIN_LANDMARK_CONFIDENCE);
            let values = analyzer.compute_metrics(&frames, &reps);
            let standard = standard_for(exercise);
            assert_eq!(values.len(), standard.categories.len());
            assert!(values.values().all(|v| v.len() == 2));
        }
    }

    #[test]
    fn no_reps_gives_empty_value_lists() {
        let frames = LiftScript::squat(1).frames();
        let analyzer = analyzer_for(ExerciseType::BackSquat, DEFAULT_MIN_LANDMARK_CONFIDENCE);
        let values = analyzer.compute_metrics(&frames, &[]);
        assert!(values.values().all(Vec::is_empty));
    }

    #[test]
    fn tracking_series_has_one_entry_per_frame() {
        let frames = LiftScript::squat(2).frames();
        let analyzer = analyzer_for(ExerciseType::FrontSquat, DEFAULT_MIN_LANDMARK_CONFIDENCE);
        let series = analyzer.tracking_series(&frames);
        assert_eq!(series.name, SIGNAL_HIP_ANGLE);
        assert_eq!(series.len(), frames.len());
        assert_eq!(series.measured_count(), frames.len());
    }
}
