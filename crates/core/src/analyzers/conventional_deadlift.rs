//! Conventional deadlift: narrow stance, hands outside the knees, a hip
//! hinge with a neutral spine and a full lockout at the top.

use crate::analyzers::measure::{self, Measure};
use crate::analyzers::{ExerciseAnalyzer, RepMeasurements, SIGNAL_HIP_SHOULDER_VERTICAL};
use crate::exercise::ExerciseType;
use crate::reliability::PoseFrame;
use crate::segmentation::Rep;
use crate::standards::Category;

#[derive(Debug, Clone, Copy)]
pub struct ConventionalDeadliftAnalyzer {
    measure: Measure,
}

impl ConventionalDeadliftAnalyzer {
    pub fn new(measure: Measure) -> Self {
        Self { measure }
    }
}

impl ExerciseAnalyzer for ConventionalDeadliftAnalyzer {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::ConventionalDeadlift
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
                Category::BackPosition,
                measure::at_extremum(frames, rep, |f| m.spine_angle(f)),
            ),
            (
                Category::HipHinge,
                measure::at_extremum(frames, rep, |f| m.hip_angle(f)),
            ),
            (
                Category::KneePosition,
                measure::at_extremum(frames, rep, |f| m.knee_angle(f)),
            ),
            (
                Category::BarPath,
                measure::max_over(frames, rep, |f| m.wrist_midfoot_offset(f)),
            ),
            (
                Category::Lockout,
                measure::max_over(frames, rep, |f| m.hip_angle(f)),
            ),
        ])
    }
}
