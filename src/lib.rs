/// Open a profiler span that lasts until the returned value is dropped.
/// Does nothing unless the `tracy` feature is enabled and a client is running.
macro_rules! tracy_span {
    ($name:literal) => {
        tracy_client::Client::running()
            .map(|client| client.span(tracy_client::span_location!($name), 0))
    };
}

pub mod math;
pub use math::{uv, Angle, MatMN, Vec2, VectorN};

pub mod physics;
pub use physics::{
    body::{Body, Mass},
    collision::{self, Contact},
    constraint::{Constraint, JointConstraint, PenetrationConstraint},
    force::{self, ForceGenerator},
    shape::{Polygon, Shape, ShapeError, ShapeType},
    BodyKey, ConstraintKey, World, WorldError, WorldSettings,
};
