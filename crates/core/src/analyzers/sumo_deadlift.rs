//! Sumo deadlift: wide stance, hands inside the knees, a more upright
//! torso and more knee bend than the conventional pull.

use crate::analyzers::measure::{self, Measure};
use crate::analyzers::{ExerciseAnalyzer, RepMeasurements, SIGNAL_HIP_SHOULDER_VERTICAL};
use crate::exercise::ExerciseType;
use crate::reliability::PoseFrame;
use crate::segmentation::Rep;
use crate::standards::Category;

#[derive(Debug, Clone, Copy)]
pub struct SumoDeadliftAnalyzer {
    measure: Measure,
}

impl SumoDeadliftAnalyzer {
    pub fn new(measure: Measure) -> Self {
        Self { measure }
    }
}

impl ExerciseAnalyzer for SumoDeadliftAnalyzer {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::SumoDeadlift
    }

    fn tracking_signal(&self) -> &'static str {
        SIGNAL_HIP_SHOULDER_VERTICAL
    }

    fn track(&self, frame: &PoseFrame) -> Option<f64> {
        self.measure.hip_shoulder_vertical(frame)
    }

    fn measure_rep(&self, frames: &[PoseFrame], rep: &Rep) -> RepMeasurements {
        let m = &self.measure;
        RepMeasurements::from([
            (
                Category::HipPosition,
                measure::at_extremum(frames, rep, |f| m.hip_angle(f)),
            ),
            (
                Category::KneePosition,
                measure::at_extremum(frames, rep, |f| m.knee_angle(f)),
            ),
            (
                Category::TorsoPosition,
                measure::at_extremum(frames, rep, |f| m.torso_inclination(f)),
            ),
            (
                Category::StanceWidth,
                measure::at_extremum(frames, rep, |f| m.stance_width_ratio(f)),
            ),
            (
                Category::BarPath,
                measure::max_over(frames, rep, |f| m.wrist_midfoot_offset(f)),
            ),
        ])
    }
}
