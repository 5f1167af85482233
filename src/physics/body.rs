use super::shape::Shape;
use crate::math::{self as m, Angle, Vec2};

/// Bodies whose inverse mass is closer to zero than this are treated as immovable.
const STATIC_EPSILON: f64 = 0.005;
pub const DEFAULT_RESTITUTION: f64 = 0.6;
pub const DEFAULT_FRICTION: f64 = 0.7;

/// A rigid body with exactly one shape.
///
/// Positions are in pixels with y growing downwards, velocities in pixels per second
/// and angles in radians.
#[derive(Clone, Debug)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub acceleration: Vec2,

    pub rotation: f64,
    pub angular_velocity: f64,
    pub angular_acceleration: f64,

    /// Bounciness in `[0, 1]`.
    pub restitution: f64,
    /// Coulomb friction coefficient.
    pub friction: f64,

    sum_forces: Vec2,
    sum_torque: f64,
    mass: Mass,
    moment_of_inertia: Mass,
    shape: Shape,
}

impl Body {
    /// Create a body at rest. A mass of zero makes the body static.
    pub fn new(shape: Shape, position: Vec2, mass: f64) -> Self {
        let inertia = shape.moment_of_inertia() * mass;
        let mut body = Self {
            position,
            velocity: Vec2::zero(),
            acceleration: Vec2::zero(),
            rotation: 0.0,
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            restitution: DEFAULT_RESTITUTION,
            friction: DEFAULT_FRICTION,
            sum_forces: Vec2::zero(),
            sum_torque: 0.0,
            mass: Mass::from(mass),
            moment_of_inertia: Mass::from(inertia),
            shape,
        };
        body.update_vertices();
        body
    }

    /// Set the velocity of the body in a builder-like chain.
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, angular_velocity: f64) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn with_rotation(mut self, rotation: Angle) -> Self {
        self.rotation = rotation.rad();
        self.update_vertices();
        self
    }

    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass.value()
    }

    #[inline]
    pub fn inv_mass(&self) -> f64 {
        self.mass.inv()
    }

    #[inline]
    pub fn moment_of_inertia(&self) -> f64 {
        self.moment_of_inertia.value()
    }

    #[inline]
    pub fn inv_moment_of_inertia(&self) -> f64 {
        self.moment_of_inertia.inv()
    }

    #[inline]
    pub fn sum_forces(&self) -> Vec2 {
        self.sum_forces
    }

    #[inline]
    pub fn sum_torque(&self) -> f64 {
        self.sum_torque
    }

    /// Static bodies are never moved by forces, impulses or integration.
    #[inline]
    pub fn is_static(&self) -> bool {
        self.inv_mass().abs() < STATIC_EPSILON
    }

    #[inline]
    pub fn add_force(&mut self, force: Vec2) {
        self.sum_forces += force;
    }

    #[inline]
    pub fn add_torque(&mut self, torque: f64) {
        self.sum_torque += torque;
    }

    #[inline]
    pub fn clear_forces(&mut self) {
        self.sum_forces = Vec2::zero();
    }

    #[inline]
    pub fn clear_torque(&mut self) {
        self.sum_torque = 0.0;
    }

    /// Transform a point from this body's local space into world space.
    #[inline]
    pub fn local_to_world(&self, point: Vec2) -> Vec2 {
        m::rotate(point, self.rotation) + self.position
    }

    /// Transform a point from world space into this body's local space.
    #[inline]
    pub fn world_to_local(&self, point: Vec2) -> Vec2 {
        m::rotate(point - self.position, -self.rotation)
    }

    /// Get the linear velocity of a point offset from the center of mass.
    #[inline]
    pub fn point_velocity(&self, offset: Vec2) -> Vec2 {
        self.velocity + m::left_normal(offset) * self.angular_velocity
    }

    pub fn apply_impulse_linear(&mut self, j: Vec2) {
        if self.is_static() {
            return;
        }
        self.velocity += j * self.inv_mass();
    }

    pub fn apply_impulse_angular(&mut self, j: f64) {
        if self.is_static() {
            return;
        }
        self.angular_velocity += j * self.inv_moment_of_inertia();
    }

    /// Apply impulse `j` at offset `r` from the center of mass.
    pub fn apply_impulse_at_point(&mut self, j: Vec2, r: Vec2) {
        if self.is_static() {
            return;
        }
        self.velocity += j * self.inv_mass();
        self.angular_velocity += m::cross(r, j) * self.inv_moment_of_inertia();
    }

    /// Semi-implicit Euler step from accumulated forces to velocity.
    /// Clears the accumulators afterwards.
    pub fn integrate_forces(&mut self, dt: f64) {
        if self.is_static() {
            return;
        }
        self.acceleration = self.sum_forces * self.inv_mass();
        self.velocity += self.acceleration * dt;

        self.angular_acceleration = self.sum_torque * self.inv_moment_of_inertia();
        self.angular_velocity += self.angular_acceleration * dt;

        self.clear_forces();
        self.clear_torque();
    }

    /// Move the body by its velocity and refresh the shape's world-space vertices.
    pub fn integrate_velocities(&mut self, dt: f64) {
        if self.is_static() {
            return;
        }
        self.position += self.velocity * dt;
        self.rotation += self.angular_velocity * dt;
        self.update_vertices();
    }

    /// Sync the shape's world-space vertices with the current position and rotation.
    ///
    /// Needs calling by hand only after moving the body directly through its pub fields.
    #[inline]
    pub fn update_vertices(&mut self) {
        self.shape.update_vertices(self.rotation, self.position);
    }
}

/// Mass or moment of inertia of a body, which can be infinite.
///
/// This stores both a mass value and its inverse, because calculating inverse mass
/// is expensive and needed a lot in physics calculations.
/// A value of exactly zero is treated as infinite, which is how static bodies are made.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mass {
    Finite { mass: f64, inverse: f64 },
    Infinite,
}

impl From<f64> for Mass {
    #[inline]
    fn from(mass: f64) -> Self {
        if mass == 0.0 {
            Mass::Infinite
        } else {
            Mass::Finite {
                mass,
                inverse: 1.0 / mass,
            }
        }
    }
}

impl Mass {
    /// Get the inverse of the mass, which is zero if the mass is infinite.
    #[inline]
    pub fn inv(&self) -> f64 {
        match self {
            Mass::Finite { inverse, .. } => *inverse,
            Mass::Infinite => 0.0,
        }
    }

    /// The value the body was created with, zero for infinite mass.
    #[inline]
    pub fn value(&self) -> f64 {
        match self {
            Mass::Finite { mass, .. } => *mass,
            Mass::Infinite => 0.0,
        }
    }
}
