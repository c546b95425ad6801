//! Supported exercise variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Exercise name: front squat.
pub const EXERCISE_FRONT_SQUAT: &str = "front-squat";
/// Exercise name: back squat.
pub const EXERCISE_BACK_SQUAT: &str = "back-squat";
/// Exercise name: conventional deadlift.
pub const EXERCISE_CONVENTIONAL_DEADLIFT: &str = "conventional-deadlift";
/// Exercise name: sumo deadlift.
pub const EXERCISE_SUMO_DEADLIFT: &str = "sumo-deadlift";

/// All recognized exercise names.
pub const ALL_EXERCISE_NAMES: &[&str] = &[
    EXERCISE_FRONT_SQUAT,
    EXERCISE_BACK_SQUAT,
    EXERCISE_CONVENTIONAL_DEADLIFT,
    EXERCISE_SUMO_DEADLIFT,
];

/// The four supported lift variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseType {
    FrontSquat,
    BackSquat,
    ConventionalDeadlift,
    SumoDeadlift,
}

/// Movement family; decides which tracking signal drives segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementPattern {
    Squat,
    Hinge,
}

impl ExerciseType {
    pub const ALL: [ExerciseType; 4] = [
        Self::FrontSquat,
        Self::BackSquat,
        Self::ConventionalDeadlift,
        Self::SumoDeadlift,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FrontSquat => EXERCISE_FRONT_SQUAT,
            Self::BackSquat => EXERCISE_BACK_SQUAT,
            Self::ConventionalDeadlift => EXERCISE_CONVENTIONAL_DEADLIFT,
            Self::SumoDeadlift => EXERCISE_SUMO_DEADLIFT,
        }
    }

    pub fn pattern(self) -> MovementPattern {
        match self {
            Self::FrontSquat | Self::BackSquat => MovementPattern::Squat,
            Self::ConventionalDeadlift | Self::SumoDeadlift => MovementPattern::Hinge,
        }
    }
}

impl fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExerciseType {
    type Err = CoreError;

    /// Accepts the kebab-case names, case-insensitively, with `_` allowed
    /// in place of `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|e| e.as_str() == normalized)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Unknown exercise type: '{s}'. Valid types: {}",
                    ALL_EXERCISE_NAMES.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_names() {
        for exercise in ExerciseType::ALL {
            assert_eq!(exercise.as_str().parse::<ExerciseType>().unwrap(), exercise);
        }
    }

    #[test]
    fn parses_snake_case_and_mixed_case() {
        assert_eq!(
            "Sumo_Deadlift".parse::<ExerciseType>().unwrap(),
            ExerciseType::SumoDeadlift
        );
    }

    #[test]
    fn rejects_unknown_exercise() {
        let err = "bench-press".parse::<ExerciseType>().unwrap_err();
        assert!(err.to_string().contains("bench-press"));
    }

    #[test]
    fn serializes_as_kebab_case() {
        let json = serde_json::to_string(&ExerciseType::ConventionalDeadlift).unwrap();
        assert_eq!(json, "\"conventional-deadlift\"");
    }

    #[test]
    fn squats_and_deadlifts_map_to_patterns() {
        assert_eq!(ExerciseType::BackSquat.pattern(), MovementPattern::Squat);
        assert_eq!(ExerciseType::SumoDeadlift.pattern(), MovementPattern::Hinge);
    }
}
