//! Types, aliases and helper operations for doing math with `ultraviolet`.
use std::f64::consts::PI;
pub use ultraviolet as uv;

pub mod linalg;
pub use linalg::{MatMN, VectorN};

pub type Vec2 = uv::DVec2;

/// An angle in either degrees or radians.
/// Default conversion from f64 is in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Angle {
    Rad(f64),
    Deg(f64),
}
impl Angle {
    /// Get the angle as degrees.
    #[inline]
    pub fn deg(&self) -> f64 {
        match self {
            Angle::Rad(rad) => rad * 180.0 / PI,
            Angle::Deg(deg) => *deg,
        }
    }

    /// Get the angle as radians.
    #[inline]
    pub fn rad(&self) -> f64 {
        match self {
            Angle::Rad(rad) => *rad,
            Angle::Deg(deg) => deg * PI / 180.0,
        }
    }
}
impl Default for Angle {
    fn default() -> Self {
        Angle::Rad(0.0)
    }
}
impl From<f64> for Angle {
    fn from(deg: f64) -> Self {
        Angle::Deg(deg)
    }
}

// Vec2 utils

/// Rotate a vector counterclockwise (in a y-up frame) by `angle` radians.
#[inline]
pub fn rotate(v: Vec2, angle: f64) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// The 2D cross product, i.e. the z component of the 3D cross product.
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Normalized copy of `v`, or the zero vector if `v` has no length.
#[inline]
pub fn unit_vector(v: Vec2) -> Vec2 {
    let mag = v.mag();
    if mag == 0.0 {
        Vec2::zero()
    } else {
        v / mag
    }
}

/// The unit normal `(y, -x)` of `v`.
///
/// Every collision normal and contact sign in the physics module assumes this handedness.
#[inline]
pub fn normal(v: Vec2) -> Vec2 {
    unit_vector(right_normal(v))
}

#[inline]
pub fn left_normal(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
#[inline]
pub fn right_normal(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}
