//! Back squat: bar on the upper back, moderate forward lean allowed.

use crate::analyzers::measure::{self, Measure};
use crate::analyzers::{ExerciseAnalyzer, RepMeasurements, SIGNAL_HIP_ANGLE};
use crate::exercise::ExerciseType;
use crate::reliability::PoseFrame;
use crate::segmentation::Rep;
use crate::standards::Category;

#[derive(Debug, Clone, Copy)]
pub struct BackSquatAnalyzer {
    measure: Measure,
}

impl BackSquatAnalyzer {
    pub fn new(measure: Measure) -> Self {
        Self { measure }
    }
}

impl ExerciseAnalyzer for BackSquatAnalyzer {
    fn exercise(&self) -> ExerciseType {
        ExerciseType::BackSquat
    }

    fn tracking_signal(&self) -> &'static str {
        SIGNAL_HIP_ANGLE
    }

    fn track(&self, frame: &PoseFrame) -> Option<f64> {
        self.measure.hip_angle(frame)
    }

    fn measure_rep(&self, frames: &[PoseFrame], rep: &Rep) -> RepMeasurements {
        let m = &self.measure;
        RepMeasurements::from([
            (
                Category::Depth,
                measure::at_extremum(frames, rep, |f| m.knee_angle(f)),
            ),
            (
                Category::KneeTracking,
                measure::min_over(frames, rep, |f| m.knee_ankle_span_ratio(f)),
            ),
            (
                Category::BackPosition,
                measure::at_extremum(frames, rep, |f| m.torso_inclination(f)),
            ),
            (
                Category::BarPath,
                measure::max_over(frames, rep, |f| m.shoulder_midfoot_offset(f)),
            ),
        ])
    }
}
