//! The 33-point body landmark model.
//!
//! A [`LandmarkSet`] is what the external pose estimator produces for one
//! frame: a fixed-size, ordered sequence of keypoints with normalized image
//! coordinates (`x`, `y` in `[0, 1]`, `y` growing downwards), an optional
//! relative depth `z`, and a visibility/confidence score in `[0, 1]`.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of keypoints in the body model.
pub const LANDMARK_COUNT: usize = 33;

/// A landmark counts as visible at or above this confidence.
pub const DEFAULT_MIN_LANDMARK_CONFIDENCE: f64 = 0.7;

/// A frame is usable when at least this many landmarks are visible.
pub const DEFAULT_MIN_VISIBLE_LANDMARKS: usize = 20;

/// Keypoint indices of the body model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl BodyPart {
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The twelve major joints whose motion characterizes a lift.
    pub const MAJOR_JOINTS: [BodyPart; 12] = [
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];
}

/// Body side, for picking the left or right member of a joint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    fn pick(self, left: BodyPart, right: BodyPart) -> BodyPart {
        match self {
            Side::Left => left,
            Side::Right => right,
        }
    }

    pub fn ear(self) -> BodyPart {
        self.pick(BodyPart::LeftEar, BodyPart::RightEar)
    }

    pub fn shoulder(self) -> BodyPart {
        self.pick(BodyPart::LeftShoulder, BodyPart::RightShoulder)
    }

    pub fn wrist(self) -> BodyPart {
        self.pick(BodyPart::LeftWrist, BodyPart::RightWrist)
    }

    pub fn hip(self) -> BodyPart {
        self.pick(BodyPart::LeftHip, BodyPart::RightHip)
    }

    pub fn knee(self) -> BodyPart {
        self.pick(BodyPart::LeftKnee, BodyPart::RightKnee)
    }

    pub fn ankle(self) -> BodyPart {
        self.pick(BodyPart::LeftAnkle, BodyPart::RightAnkle)
    }

    pub fn foot_index(self) -> BodyPart {
        self.pick(BodyPart::LeftFootIndex, BodyPart::RightFootIndex)
    }
}

/// A single tracked keypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    /// Relative depth, when the estimator provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    pub visibility: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility,
        }
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn is_visible(&self, min_confidence: f64) -> bool {
        self.visibility >= min_confidence
    }
}

/// The full set of keypoints for one frame. Always exactly
/// [`LANDMARK_COUNT`] entries, ordered by [`BodyPart`] index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet {
    landmarks: Vec<Landmark>,
}

impl LandmarkSet {
    /// Build a set from estimator output.
    ///
    /// Visibility scores are sanitized into `[0, 1]` (non-finite becomes 0).
    /// Coordinates are kept as-is; geometry rejects non-finite values.
    pub fn new(mut landmarks: Vec<Landmark>) -> Result<Self, CoreError> {
        if landmarks.len() != LANDMARK_COUNT {
            return Err(CoreError::Validation(format!(
                "landmark set must contain {LANDMARK_COUNT} keypoints, got {}",
                landmarks.len()
            )));
        }
        landmarks.iter_mut().for_each(sanitize_visibility);
        Ok(Self { landmarks })
    }

    /// Infallible variant of [`LandmarkSet::new`] for a fixed-size array.
    pub fn from_array(landmarks: [Landmark; LANDMARK_COUNT]) -> Self {
        let mut landmarks = landmarks.to_vec();
        landmarks.iter_mut().for_each(sanitize_visibility);
        Self { landmarks }
    }

    pub fn get(&self, part: BodyPart) -> &Landmark {
        &self.landmarks[part.index()]
    }

    /// The landmark, only if it meets `min_confidence`.
    pub fn visible(&self, part: BodyPart, min_confidence: f64) -> Option<&Landmark> {
        let lm = self.get(part);
        lm.is_visible(min_confidence).then_some(lm)
    }

    /// Count of landmarks at or above `min_confidence`.
    pub fn visible_count(&self, min_confidence: f64) -> usize {
        self.landmarks
            .iter()
            .filter(|lm| lm.is_visible(min_confidence))
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.iter()
    }
}

fn sanitize_visibility(lm: &mut Landmark) {
    lm.visibility = if lm.visibility.is_finite() {
        lm.visibility.clamp(0.0, 1.0)
    } else {
        0.0
    };
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = CoreError;

    fn try_from(value: Vec<Landmark>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LandmarkSet> for Vec<Landmark> {
    fn from(set: LandmarkSet) -> Self {
        set.landmarks
    }
}
