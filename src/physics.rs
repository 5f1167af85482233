//! Rigid body simulation: bodies, their shapes, collision detection
//! and the impulse-based constraint solver driven by [`World`].

use thunderdome as td;

pub mod body;
pub use body::{Body, Mass};

pub mod collision;
pub use collision::{BodyRef, Contact};

pub mod constraint;
pub use constraint::{Constraint, JointConstraint, PenetrationConstraint};

pub mod force;
pub use force::ForceGenerator;

pub mod shape;
pub use shape::{Polygon, Shape, ShapeError, ShapeType};

pub mod world;
pub use world::{World, WorldError, WorldSettings};

/// Unique identifier of a body in a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyKey(pub(crate) td::Index);

impl BodyKey {
    /// Get the underlying [`thunderdome::Index`][thunderdome::Index] of this key.
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}

/// Unique identifier of a persistent constraint in a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConstraintKey(pub(crate) td::Index);

impl ConstraintKey {
    #[inline]
    pub fn index(&self) -> td::Index {
        self.0
    }
}
