//! Per-frame joint measurements and per-rep aggregation shared by every
//! analyzer.
//!
//! Bilateral measures average whichever sides have all their joints
//! visible and fall back to a single side; a measure with no visible side,
//! or whose geometry is degenerate, is `None`.

use crate::geometry::{self, Point};
use crate::landmarks::{BodyPart, LandmarkSet, Side};
use crate::reliability::PoseFrame;
use crate::segmentation::Rep;

/// Joint measurements gated on landmark confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measure {
    pub min_confidence: f64,
}

impl Measure {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }

    fn point(&self, landmarks: &LandmarkSet, part: BodyPart) -> Option<Point> {
        landmarks.visible(part, self.min_confidence).map(Point::from)
    }

    /// Mean of `f` over the sides where it yields a value.
    fn bilateral<F>(f: F) -> Option<f64>
    where
        F: Fn(Side) -> Option<f64>,
    {
        let values: Vec<f64> = Side::BOTH
            .into_iter()
            .filter_map(f)
            .filter(|v| v.is_finite())
            .collect();
        match values.len() {
            0 => None,
            n => Some(values.iter().sum::<f64>() / n as f64),
        }
    }

    fn side_angle(
        &self,
        landmarks: &LandmarkSet,
        joints: fn(Side) -> [BodyPart; 3],
    ) -> Option<f64> {
        Self::bilateral(|side| {
            let [a, b, c] = joints(side);
            let (a, b, c) = (
                self.point(landmarks, a)?,
                self.point(landmarks, b)?,
                self.point(landmarks, c)?,
            );
            geometry::angle(a, b, c).ok()
        })
    }

    // -- joint angles --------------------------------------------------------

    /// Shoulder-hip-knee angle, degrees.
    pub fn hip_angle(&self, frame: &PoseFrame) -> Option<f64> {
        self.side_angle(&frame.landmarks, |s| [s.shoulder(), s.hip(), s.knee()])
    }

    /// Hip-knee-ankle angle, degrees.
    pub fn knee_angle(&self, frame: &PoseFrame) -> Option<f64> {
        self.side_angle(&frame.landmarks, |s| [s.hip(), s.knee(), s.ankle()])
    }

    /// Ear-shoulder-hip angle, degrees. 180 is a neutral, straight spine.
    pub fn spine_angle(&self, frame: &PoseFrame) -> Option<f64> {
        self.side_angle(&frame.landmarks, |s| [s.ear(), s.shoulder(), s.hip()])
    }

    /// Shoulder-over-hip lean from vertical, degrees.
    pub fn torso_inclination(&self, frame: &PoseFrame) -> Option<f64> {
        let lm = &frame.landmarks;
        Self::bilateral(|side| {
            let shoulder = self.point(lm, side.shoulder())?;
            let hip = self.point(lm, side.hip())?;
            geometry::inclination_from_vertical(shoulder, hip).ok()
        })
    }

    // -- spans and offsets ---------------------------------------------------

    fn span(&self, landmarks: &LandmarkSet, left: BodyPart, right: BodyPart) -> Option<f64> {
        let l = self.point(landmarks, left)?;
        let r = self.point(landmarks, right)?;
        geometry::horizontal_distance(l, r).ok()
    }

    /// Knee span over ankle span. Below 1 means the knees are caving in.
    pub fn knee_ankle_span_ratio(&self, frame: &PoseFrame) -> Option<f64> {
        let lm = &frame.landmarks;
        let knees = self.span(lm, BodyPart::LeftKnee, BodyPart::RightKnee)?;
        let ankles = self.span(lm, BodyPart::LeftAnkle, BodyPart::RightAnkle)?;
        geometry::ratio(knees, ankles).ok()
    }

    /// Ankle span over shoulder span.
    pub fn stance_width_ratio(&self, frame: &PoseFrame) -> Option<f64> {
        let lm = &frame.landmarks;
        let ankles = self.span(lm, BodyPart::LeftAnkle, BodyPart::RightAnkle)?;
        let shoulders = self.span(lm, BodyPart::LeftShoulder, BodyPart::RightShoulder)?;
        geometry::ratio(ankles, shoulders).ok()
    }

    /// Mid-foot: between ankle and toe, or the ankle alone when the toe is
    /// not visible.
    fn midfoot(&self, landmarks: &LandmarkSet, side: Side) -> Option<Point> {
        let ankle = self.point(landmarks, side.ankle())?;
        Some(match self.point(landmarks, side.foot_index()) {
            Some(toe) => Point::midpoint(ankle, toe),
            None => ankle,
        })
    }

    /// Horizontal offset of `part` from mid-foot, in torso lengths.
    fn midfoot_offset(&self, frame: &PoseFrame, part: fn(Side) -> BodyPart) -> Option<f64> {
        let lm = &frame.landmarks;
        Self::bilateral(|side| {
            let tracked = self.point(lm, part(side))?;
            let midfoot = self.midfoot(lm, side)?;
            let torso = geometry::distance(
                self.point(lm, side.shoulder())?,
                self.point(lm, side.hip())?,
            )
            .ok()?;
            let offset = geometry::horizontal_distance(tracked, midfoot).ok()?;
            geometry::ratio(offset, torso).ok()
        })
    }

    /// Bar proxy for a bar on the back: the shoulders.
    pub fn shoulder_midfoot_offset(&self, frame: &PoseFrame) -> Option<f64> {
        self.midfoot_offset(frame, Side::shoulder)
    }

    /// Bar proxy for a bar in the hands: the wrists.
    pub fn wrist_midfoot_offset(&self, frame: &PoseFrame) -> Option<f64> {
        self.midfoot_offset(frame, Side::wrist)
    }

    /// Hip y minus shoulder y. Shrinks as the torso tips forward.
    pub fn hip_shoulder_vertical(&self, frame: &PoseFrame) -> Option<f64> {
        let lm = &frame.landmarks;
        Self::bilateral(|side| {
            let shoulder = self.point(lm, side.shoulder())?;
            let hip = self.point(lm, side.hip())?;
            Some(hip.y - shoulder.y)
        })
    }
}

// ---------------------------------------------------------------------------
// Per-rep aggregation
// ---------------------------------------------------------------------------

/// `f` at the rep's extremum, or at the nearest measurable sample within
/// the rep, searching outward (earlier side first on equal distance).
pub fn at_extremum<F>(frames: &[PoseFrame], rep: &Rep, f: F) -> Option<f64>
where
    F: Fn(&PoseFrame) -> Option<f64>,
{
    let reach = rep
        .extremum
        .saturating_sub(rep.start)
        .max(rep.end.saturating_sub(rep.extremum));
    for d in 0..=reach {
        let before = rep.extremum.checked_sub(d).filter(|&p| p >= rep.start);
        let after = Some(rep.extremum + d).filter(|&p| p <= rep.end && d > 0);
        for pos in [before, after].into_iter().flatten() {
            if let Some(v) = frames.get(pos).and_then(&f) {
                return Some(v);
            }
        }
    }
    None
}

/// Smallest value of `f` across the rep.
pub fn min_over<F>(frames: &[PoseFrame], rep: &Rep, f: F) -> Option<f64>
where
    F: Fn(&PoseFrame) -> Option<f64>,
{
    rep_slice(frames, rep).iter().filter_map(f).reduce(f64::min)
}

/// Largest value of `f` across the rep.
pub fn max_over<F>(frames: &[PoseFrame], rep: &Rep, f: F) -> Option<f64>
where
    F: Fn(&PoseFrame) -> Option<f64>,
{
    rep_slice(frames, rep).iter().filter_map(f).reduce(f64::max)
}

fn rep_slice<'a>(frames: &'a [PoseFrame], rep: &Rep) -> &'a [PoseFrame] {
    let end = (rep.end + 1).min(frames.len());
    frames.get(rep.start..end).unwrap_or(&[])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
