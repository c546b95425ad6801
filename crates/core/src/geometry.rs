//! Joint angles and distances from landmark positions.
//!
//! Every function here is pure and never looks at visibility; gating on
//! confidence belongs to the caller. Numerically unsafe inputs fail with
//! [`GeometryError::Degenerate`] rather than returning a placeholder value,
//! and callers turn that into an explicit "not measured".

use crate::landmarks::Landmark;

/// Rays or denominators shorter than this are treated as zero-length.
pub const DEGENERATE_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Degenerate geometry: {0}")]
    Degenerate(&'static str),
}

/// A point with optional depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Componentwise mean of two points. Depth survives only when both carry it.
    pub fn midpoint(a: Point, b: Point) -> Point {
        Point {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
            z: match (a.z, b.z) {
                (Some(az), Some(bz)) => Some((az + bz) / 2.0),
                _ => None,
            },
        }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

impl From<&Landmark> for Point {
    fn from(lm: &Landmark) -> Self {
        Point {
            x: lm.x,
            y: lm.y,
            z: lm.z,
        }
    }
}

impl From<Landmark> for Point {
    fn from(lm: Landmark) -> Self {
        Point::from(&lm)
    }
}

fn check_finite(points: &[Point]) -> Result<(), GeometryError> {
    if points.iter().all(Point::is_finite) {
        Ok(())
    } else {
        Err(GeometryError::Degenerate("non-finite coordinate"))
    }
}

/// Vector from `from` to `to`; depth is used only when `use_z` is set.
fn ray(from: Point, to: Point, use_z: bool) -> [f64; 3] {
    let dz = if use_z {
        to.z.unwrap_or(0.0) - from.z.unwrap_or(0.0)
    } else {
        0.0
    };
    [to.x - from.x, to.y - from.y, dz]
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

// ---------------------------------------------------------------------------
// Angles
// ---------------------------------------------------------------------------

/// Angle at vertex `b` between rays `b->a` and `b->c`, in degrees.
///
/// Depth is used only when all three points carry it. The result is
/// clamped to `[0, 180]`.
pub fn angle(a: Point, b: Point, c: Point) -> Result<f64, GeometryError> {
    check_finite(&[a, b, c])?;
    let use_z = a.z.is_some() && b.z.is_some() && c.z.is_some();
    let ba = ray(b, a, use_z);
    let bc = ray(b, c, use_z);
    let (len_ba, len_bc) = (norm(ba), norm(bc));
    if len_ba < DEGENERATE_EPSILON || len_bc < DEGENERATE_EPSILON {
        return Err(GeometryError::Degenerate("zero-length ray"));
    }

    let cos = (ba[0] * bc[0] + ba[1] * bc[1] + ba[2] * bc[2]) / (len_ba * len_bc);
    let degrees = cos.clamp(-1.0, 1.0).acos().to_degrees();
    if !degrees.is_finite() {
        return Err(GeometryError::Degenerate("non-finite angle"));
    }
    Ok(degrees.clamp(0.0, 180.0))
}

/// Angle of the segment `bottom -> top` away from image vertical, in
/// degrees (0 = upright, 90 = horizontal). Always 2-D.
pub fn inclination_from_vertical(top: Point, bottom: Point) -> Result<f64, GeometryError> {
    check_finite(&[top, bottom])?;
    let dx = top.x - bottom.x;
    // Image y grows downwards; "up" is negative dy.
    let dy = bottom.y - top.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < DEGENERATE_EPSILON {
        return Err(GeometryError::Degenerate("zero-length segment"));
    }
    let degrees = (dx.abs() / len).clamp(0.0, 1.0).asin().to_degrees();
    let degrees = if dy < 0.0 { 180.0 - degrees } else { degrees };
    Ok(degrees.clamp(0.0, 180.0))
}

// ---------------------------------------------------------------------------
// Distances
// ---------------------------------------------------------------------------

/// Euclidean distance, 3-D when both points carry depth.
///
/// Only non-finite input is degenerate: coincident points give `Ok(0.0)`,
/// which is a valid displacement. Callers dividing by a distance go through
/// [`ratio`], which rejects a zero denominator.
pub fn distance(a: Point, b: Point) -> Result<f64, GeometryError> {
    check_finite(&[a, b])?;
    let use_z = a.z.is_some() && b.z.is_some();
    let d = norm(ray(a, b, use_z));
    if d.is_finite() {
        Ok(d)
    } else {
        Err(GeometryError::Degenerate("non-finite distance"))
    }
}

/// Horizontal (x-only) distance between two points.
pub fn horizontal_distance(a: Point, b: Point) -> Result<f64, GeometryError> {
    check_finite(&[a, b])?;
    Ok((a.x - b.x).abs())
}

/// `numerator / denominator`, failing when the denominator is near zero.
pub fn ratio(numerator: f64, denominator: f64) -> Result<f64, GeometryError> {
    if !numerator.is_finite() || !denominator.is_finite() {
        return Err(GeometryError::Degenerate("non-finite ratio operand"));
    }
    if denominator.abs() < DEGENERATE_EPSILON {
        return Err(GeometryError::Degenerate("zero denominator"));
    }
    Ok(numerator / denominator)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
