//! Synthetic side-view lifters for tests.
//!
//! Poses are built from three segment leans (shin, thigh, torso, in degrees
//! from vertical) around a fixed ankle, so joint angles are known in closed
//! form: knee angle = `180 - shin - thigh`, hip angle = `180 - thigh - torso`.
//! Left and right joints are offset horizontally by per-joint half widths so
//! span ratios are measurable.

use crate::landmarks::{BodyPart, Landmark, LandmarkSet, Side, LANDMARK_COUNT};
use crate::reliability::PoseFrame;

const ANKLE: (f64, f64) = (0.5, 0.85);
const SHIN: f64 = 0.2;
const THIGH: f64 = 0.2;
const TORSO: f64 = 0.3;

/// Segment leans from vertical, in degrees. Positive leans point the
/// distal joint towards the lifter's front (+x), except the thigh, which
/// leans back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posture {
    pub shin_deg: f64,
    pub thigh_deg: f64,
    pub torso_deg: f64,
    pub grip: Grip,
}

impl Posture {
    pub fn knee_angle(&self) -> f64 {
        180.0 - self.shin_deg - self.thigh_deg
    }

    pub fn hip_angle(&self) -> f64 {
        180.0 - self.thigh_deg - self.torso_deg
    }

    /// Straight-line interpolation between two postures.
    pub fn lerp(from: Posture, to: Posture, t: f64) -> Posture {
        let mix = |a: f64, b: f64| a + (b - a) * t;
        Posture {
            shin_deg: mix(from.shin_deg, to.shin_deg),
            thigh_deg: mix(from.thigh_deg, to.thigh_deg),
            torso_deg: mix(from.torso_deg, to.torso_deg),
            grip: to.grip,
        }
    }
}

/// Where the hands are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grip {
    /// Bar on the back, hands just behind the shoulders.
    BackRack,
    /// Arms hanging straight down from the shoulders.
    Hang,
}

/// Half widths (distance of each side from the midline) per joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stance {
    pub shoulder: f64,
    pub hip: f64,
    pub knee: f64,
    pub ankle: f64,
}

impl Stance {
    pub const HIP_WIDTH: Stance = Stance {
        shoulder: 0.05,
        hip: 0.05,
        knee: 0.05,
        ankle: 0.05,
    };

    pub const SUMO: Stance = Stance {
        shoulder: 0.05,
        hip: 0.05,
        knee: 0.09,
        ankle: 0.1,
    };
}

pub const SQUAT_TOP: Posture = Posture {
    shin_deg: 5.0,
    thigh_deg: 5.0,
    torso_deg: 5.0,
    grip: Grip::BackRack,
};

pub const SQUAT_BOTTOM: Posture = Posture {
    shin_deg: 35.0,
    thigh_deg: 85.0,
    torso_deg: 35.0,
    grip: Grip::BackRack,
};

pub const DEADLIFT_TOP: Posture = Posture {
    shin_deg: 0.0,
    thigh_deg: 0.0,
    torso_deg: 0.0,
    grip: Grip::Hang,
};

pub const DEADLIFT_BOTTOM: Posture = Posture {
    shin_deg: 12.0,
    thigh_deg: 60.0,
    torso_deg: 45.0,
    grip: Grip::Hang,
};

pub const SUMO_BOTTOM: Posture = Posture {
    shin_deg: 10.0,
    thigh_deg: 70.0,
    torso_deg: 40.0,
    grip: Grip::Hang,
};

fn lean(from: (f64, f64), length: f64, degrees: f64) -> (f64, f64) {
    let r = degrees.to_radians();
    (from.0 + length * r.sin(), from.1 - length * r.cos())
}

/// Landmarks for one posture, every keypoint at `visibility`.
pub fn pose(posture: Posture, stance: Stance, visibility: f64) -> LandmarkSet {
    let ankle = ANKLE;
    let knee = lean(ankle, SHIN, posture.shin_deg);
    let hip = lean(knee, THIGH, -posture.thigh_deg);
    let shoulder = lean(hip, TORSO, posture.torso_deg);
    let head = lean(shoulder, 0.08, posture.torso_deg);
    let (elbow, wrist) = match posture.grip {
        Grip::BackRack => (
            (shoulder.0 - 0.05, shoulder.1 + 0.05),
            (shoulder.0 - 0.03, shoulder.1 + 0.01),
        ),
        Grip::Hang => (
            (shoulder.0, shoulder.1 + 0.13),
            (shoulder.0, shoulder.1 + 0.26),
        ),
    };
    let heel = (ankle.0 - 0.03, ankle.1 + 0.03);
    let toe = (ankle.0 + 0.1, ankle.1 + 0.04);

    let mut landmarks = [Landmark::new(head.0, head.1, visibility); LANDMARK_COUNT];
    let mut place = |part: BodyPart, at: (f64, f64), dx: f64| {
        landmarks[part.index()] = Landmark::new(at.0 + dx, at.1, visibility);
    };

    place(BodyPart::Nose, (head.0 + 0.02, head.1), 0.0);
    for side in Side::BOTH {
        let sign = match side {
            Side::Left => -1.0,
            Side::Right => 1.0,
        };
        let half = |w: f64| sign * w;
        place(side.ear(), head, half(stance.shoulder));
        place(side.shoulder(), shoulder, half(stance.shoulder));
        place(side.hip(), hip, half(stance.hip));
        place(side.knee(), knee, half(stance.knee));
        place(side.ankle(), ankle, half(stance.ankle));
        place(side.foot_index(), toe, half(stance.ankle));
        place(side.wrist(), wrist, half(stance.shoulder));
    }
    for (l, r, at) in [
        (BodyPart::LeftElbow, BodyPart::RightElbow, elbow),
        (BodyPart::LeftPinky, BodyPart::RightPinky, wrist),
        (BodyPart::LeftIndex, BodyPart::RightIndex, wrist),
        (BodyPart::LeftThumb, BodyPart::RightThumb, wrist),
        (BodyPart::LeftHeel, BodyPart::RightHeel, heel),
    ] {
        place(l, at, -stance.shoulder);
        place(r, at, stance.shoulder);
    }

    LandmarkSet::from_array(landmarks)
}

/// Descent depth in `[0, 1]` at time `t` for `reps` cosine-shaped reps of
/// `rep_secs` each, after `lead_secs` of standing still.
pub fn rep_depth(t: f64, lead_secs: f64, rep_secs: f64, reps: usize) -> f64 {
    let local = t - lead_secs;
    if local < 0.0 || local > rep_secs * reps as f64 {
        return 0.0;
    }
    let phase = (local % rep_secs) / rep_secs;
    (1.0 - (2.0 * std::f64::consts::PI * phase).cos()) / 2.0
}

/// A scripted set: standing still for `lead_secs`, then `reps` reps of
/// `rep_secs` each, then standing until `secs`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiftScript {
    pub top: Posture,
    pub bottom: Posture,
    pub stance: Stance,
    pub fps: f64,
    pub secs: f64,
    pub lead_secs: f64,
    pub rep_secs: f64,
    pub reps: usize,
}

impl LiftScript {
    /// Back squat at 30 fps: 1s lead, `reps` 3s reps, 1s tail.
    pub fn squat(reps: usize) -> Self {
        Self {
            top: SQUAT_TOP,
            bottom: SQUAT_BOTTOM,
            stance: Stance::HIP_WIDTH,
            fps: 30.0,
            secs: 2.0 + 3.0 * reps as f64,
            lead_secs: 1.0,
            rep_secs: 3.0,
            reps,
        }
    }

    /// Conventional deadlift at 30 fps: 1s lead, `reps` 3s reps, 1s tail.
    pub fn deadlift(reps: usize) -> Self {
        Self {
            top: DEADLIFT_TOP,
            bottom: DEADLIFT_BOTTOM,
            ..Self::squat(reps)
        }
    }

    /// Sumo deadlift: the deadlift script with a wide stance.
    pub fn sumo(reps: usize) -> Self {
        Self {
            bottom: SUMO_BOTTOM,
            stance: Stance::SUMO,
            ..Self::deadlift(reps)
        }
    }

    /// Pose at time `t`.
    pub fn pose_at(&self, t: f64) -> LandmarkSet {
        let depth = rep_depth(t, self.lead_secs, self.rep_secs, self.reps);
        pose(Posture::lerp(self.top, self.bottom, depth), self.stance, 0.95)
    }

    /// Every frame as a usable [`PoseFrame`].
    pub fn frames(&self) -> Vec<PoseFrame> {
        let count = (self.secs * self.fps).round() as usize;
        (0..count)
            .map(|i| {
                let t = i as f64 / self.fps;
                PoseFrame {
                    frame_index: i as u64,
                    timestamp_secs: t,
                    landmarks: self.pose_at(t),
                    visible_count: LANDMARK_COUNT,
                }
            })
            .collect()
    }
}
