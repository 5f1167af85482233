//! Forces that depend on the state of bodies, like drag and springs.
//!
//! The free functions compute a force for the caller to apply with [`Body::add_force`].
//! Types implementing [`ForceGenerator`] can be registered with a
//! [`World`][super::World] to be applied to every body each step.

use super::Body;
use crate::math::{self as m, Vec2};

/// A force computed from the state of a single body,
/// applied by the world to every non-static body each step.
pub trait ForceGenerator {
    fn force_on(&self, body: &Body) -> Vec2;
}

/// Air resistance, quadratic in speed.
pub fn drag(body: &Body, k: f64) -> Vec2 {
    let speed_sq = body.velocity.mag_sq();
    if speed_sq > 0.0 {
        -m::unit_vector(body.velocity) * k * speed_sq
    } else {
        Vec2::zero()
    }
}

/// Constant-magnitude friction against the direction of motion.
pub fn friction(body: &Body, k: f64) -> Vec2 {
    -m::unit_vector(body.velocity) * k
}

/// Newtonian attraction of `a` towards `b`.
///
/// The squared distance is clamped to `[min_distance_sq, max_distance_sq]`
/// to keep the force finite up close and non-negligible far away.
/// Both bounds are squared distances.
pub fn gravitational(
    a: &Body,
    b: &Body,
    g: f64,
    min_distance_sq: f64,
    max_distance_sq: f64,
) -> Vec2 {
    attraction(
        a.position,
        a.mass(),
        b.position,
        b.mass(),
        g,
        min_distance_sq,
        max_distance_sq,
    )
}

fn attraction(
    pos_a: Vec2,
    mass_a: f64,
    pos_b: Vec2,
    mass_b: f64,
    g: f64,
    min_distance_sq: f64,
    max_distance_sq: f64,
) -> Vec2 {
    let d = pos_b - pos_a;
    let dist_sq = d.mag_sq().max(min_distance_sq).min(max_distance_sq);
    m::unit_vector(d) * (g * mass_a * mass_b / dist_sq)
}

/// Hooke's law spring from a fixed anchor to `body`.
pub fn spring_to_anchor(body: &Body, anchor: Vec2, rest_length: f64, k: f64) -> Vec2 {
    hooke(body.position - anchor, rest_length, k)
}

/// Hooke's law spring between two bodies.
/// Returns the force on `a`; the force on `b` is its negation.
pub fn spring(a: &Body, b: &Body, rest_length: f64, k: f64) -> Vec2 {
    hooke(a.position - b.position, rest_length, k)
}

#[inline]
fn hooke(d: Vec2, rest_length: f64, k: f64) -> Vec2 {
    let displacement = d.mag() - rest_length;
    m::unit_vector(d) * (-k * displacement)
}

/// Quadratic drag as a [`ForceGenerator`].
#[derive(Clone, Copy, Debug)]
pub struct Drag(pub f64);
impl ForceGenerator for Drag {
    fn force_on(&self, body: &Body) -> Vec2 {
        drag(body, self.0)
    }
}

/// Constant friction as a [`ForceGenerator`].
#[derive(Clone, Copy, Debug)]
pub struct Friction(pub f64);
impl ForceGenerator for Friction {
    fn force_on(&self, body: &Body) -> Vec2 {
        friction(body, self.0)
    }
}

/// A spring pulling every body towards a fixed point.
#[derive(Clone, Copy, Debug)]
pub struct AnchorSpring {
    pub anchor: Vec2,
    pub rest_length: f64,
    pub k: f64,
}
impl ForceGenerator for AnchorSpring {
    fn force_on(&self, body: &Body) -> Vec2 {
        spring_to_anchor(body, self.anchor, self.rest_length, self.k)
    }
}

/// Gravity of a massive point that isn't itself simulated.
///
/// With a negative `g` this can also be a repulsive force.
#[derive(Clone, Copy, Debug)]
pub struct Attractor {
    pub position: Vec2,
    pub mass: f64,
    pub g: f64,
    /// Lower bound of the squared distance used in the force.
    pub min_distance_sq: f64,
    /// Upper bound of the squared distance used in the force.
    pub max_distance_sq: f64,
}
impl ForceGenerator for Attractor {
    fn force_on(&self, body: &Body) -> Vec2 {
        attraction(
            body.position,
            body.mass(),
            self.position,
            self.mass,
            self.g,
            self.min_distance_sq,
            self.max_distance_sq,
        )
    }
}
