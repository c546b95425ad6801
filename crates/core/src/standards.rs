//! Per-exercise reference standards.
//!
//! The table is built once on first use and shared read-only by every
//! request. Each category has an ideal range; a measured value's deviation
//! is its distance outside that range, classified into a severity band by
//! three increasing limits.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::exercise::ExerciseType;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A scored aspect of a lift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Depth,
    KneeTracking,
    BackPosition,
    TorsoPosition,
    HipHinge,
    HipPosition,
    KneePosition,
    StanceWidth,
    BarPath,
    Lockout,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Depth => "depth",
            Self::KneeTracking => "knee_tracking",
            Self::BackPosition => "back_position",
            Self::TorsoPosition => "torso_position",
            Self::HipHinge => "hip_hinge",
            Self::HipPosition => "hip_position",
            Self::KneePosition => "knee_position",
            Self::StanceWidth => "stance_width",
            Self::BarPath => "bar_path",
            Self::Lockout => "lockout",
        }
    }

    /// Lower-case words for feedback text.
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }

    /// Short imperative coaching cue.
    pub fn cue(self) -> &'static str {
        match self {
            Self::Depth => "Sit down until your hips reach knee height while keeping your chest up",
            Self::KneeTracking => "Push your knees out so they track over your toes",
            Self::BackPosition => "Brace your core and keep your back flat",
            Self::TorsoPosition => "Keep your chest up and your torso upright",
            Self::HipHinge => "Push your hips back to load your hamstrings",
            Self::HipPosition => "Start with your hips closer to the bar",
            Self::KneePosition => "Set your knees so your shins stay close to the bar",
            Self::StanceWidth => "Adjust your stance so your feet sit well outside shoulder width",
            Self::BarPath => "Keep the bar moving in a straight line over mid-foot",
            Self::Lockout => "Finish each rep by squeezing your glutes to full hip extension",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// How far a measured value sits outside its ideal range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    WithinTolerance,
    Minor,
    Major,
    Critical,
}

/// Points deducted from 100 for each severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Penalties {
    pub minor: u32,
    pub major: u32,
    pub critical: u32,
}

/// Default deductions. A critical value lands exactly on the score floor.
pub const DEFAULT_PENALTIES: Penalties = Penalties {
    minor: 10,
    major: 25,
    critical: 70,
};

impl Penalties {
    pub fn for_severity(&self, severity: Severity) -> u32 {
        match severity {
            Severity::WithinTolerance => 0,
            Severity::Minor => self.minor,
            Severity::Major => self.major,
            Severity::Critical => self.critical,
        }
    }
}

/// Unit of a category's measure, for feedback formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureUnit {
    Degrees,
    Ratio,
}

impl MeasureUnit {
    pub fn format(self, value: f64) -> String {
        match self {
            Self::Degrees => format!("{value:.1}\u{b0}"),
            Self::Ratio => format!("{value:.2}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Standards
// ---------------------------------------------------------------------------

/// Reference values for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStandard {
    pub category: Category,
    pub ideal_min: f64,
    pub ideal_max: f64,
    pub unit: MeasureUnit,
    /// Deviations up to this are within tolerance.
    pub tolerance: f64,
    /// Deviations up to this are minor.
    pub minor_limit: f64,
    /// Deviations up to this are major; beyond is critical.
    pub major_limit: f64,
    pub penalties: Penalties,
}

impl CategoryStandard {
    /// Distance outside the ideal range (0 inside it).
    pub fn deviation(&self, value: f64) -> f64 {
        if value < self.ideal_min {
            self.ideal_min - value
        } else if value > self.ideal_max {
            value - self.ideal_max
        } else {
            0.0
        }
    }

    pub fn classify(&self, value: f64) -> Severity {
        let deviation = self.deviation(value);
        if deviation <= self.tolerance {
            Severity::WithinTolerance
        } else if deviation <= self.minor_limit {
            Severity::Minor
        } else if deviation <= self.major_limit {
            Severity::Major
        } else {
            Severity::Critical
        }
    }

    pub fn ideal_label(&self) -> String {
        format!(
            "{}-{}",
            self.unit.format(self.ideal_min),
            self.unit.format(self.ideal_max)
        )
    }
}

/// Every scored category for one exercise, in report order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseStandard {
    pub exercise: ExerciseType,
    pub categories: Vec<CategoryStandard>,
}

impl ExerciseStandard {
    pub fn get(&self, category: Category) -> Option<&CategoryStandard> {
        self.categories.iter().find(|c| c.category == category)
    }
}

fn angle(category: Category, ideal: (f64, f64), limits: (f64, f64, f64)) -> CategoryStandard {
    CategoryStandard {
        category,
        ideal_min: ideal.0,
        ideal_max: ideal.1,
        unit: MeasureUnit::Degrees,
        tolerance: limits.0,
        minor_limit: limits.1,
        major_limit: limits.2,
        penalties: DEFAULT_PENALTIES,
    }
}

fn ratio(category: Category, ideal: (f64, f64), limits: (f64, f64, f64)) -> CategoryStandard {
    CategoryStandard {
        unit: MeasureUnit::Ratio,
        ..angle(category, ideal, limits)
    }
}

static STANDARDS: LazyLock<BTreeMap<ExerciseType, ExerciseStandard>> = LazyLock::new(|| {
    use Category::*;

    let joint = (5.0, 15.0, 30.0);
    let lean = (5.0, 10.0, 20.0);
    let path = (0.03, 0.08, 0.15);
    let tracking = (0.05, 0.1, 0.2);

    let table = [
        (
            ExerciseType::BackSquat,
            vec![
                angle(Depth, (50.0, 100.0), joint),
                ratio(KneeTracking, (0.9, 1.6), tracking),
                angle(BackPosition, (0.0, 45.0), lean),
                ratio(BarPath, (0.0, 0.25), path),
            ],
        ),
        (
            ExerciseType::FrontSquat,
            vec![
                angle(Depth, (50.0, 100.0), joint),
                ratio(KneeTracking, (0.9, 1.6), tracking),
                angle(TorsoPosition, (0.0, 30.0), lean),
                ratio(BarPath, (0.0, 0.2), path),
            ],
        ),
        (
            ExerciseType::ConventionalDeadlift,
            vec![
                angle(BackPosition, (150.0, 180.0), joint),
                angle(HipHinge, (45.0, 100.0), joint),
                angle(KneePosition, (110.0, 160.0), joint),
                ratio(BarPath, (0.0, 0.2), path),
                angle(Lockout, (165.0, 180.0), (3.0, 10.0, 20.0)),
            ],
        ),
        (
            ExerciseType::SumoDeadlift,
            vec![
                angle(HipPosition, (60.0, 110.0), joint),
                angle(KneePosition, (90.0, 140.0), joint),
                angle(TorsoPosition, (0.0, 40.0), lean),
                ratio(StanceWidth, (1.4, 2.6), (0.1, 0.25, 0.5)),
                ratio(BarPath, (0.0, 0.2), path),
            ],
        ),
    ];

    table
        .into_iter()
        .map(|(exercise, categories)| {
            (
                exercise,
                ExerciseStandard {
                    exercise,
                    categories,
                },
            )
        })
        .collect()
});

/// The standard for an exercise. Every [`ExerciseType`] has one.
pub fn standard_for(exercise: ExerciseType) -> &'static ExerciseStandard {
    &STANDARDS[&exercise]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
