//! Velocity constraints solved with sequential impulses.
//!
//! Each constraint is a Jacobian over the 6 velocity components of its two bodies
//! `[va.x, va.y, ωa, vb.x, vb.y, ωb]`. Solving one means finding the impulse `λ` with
//! `(J M⁻¹ Jᵗ) λ = -(J V) - bias` and applying `Jᵗ λ` back onto the bodies.
//! The accumulated `λ` is cached for warm starting.

use super::{collision::Contact, BodyKey, BodyRef};
use crate::{
    math::{self as m, MatMN, Vec2, VectorN},
    physics::Body,
};

use thunderdome as td;

/// Baumgarte factor for joints.
const JOINT_BETA: f64 = 0.02;
/// Squared anchor distance a joint tolerates before it starts correcting position.
const JOINT_SLOP: f64 = 0.01;
/// Bound on a joint's accumulated impulse carried over to the next step.
const JOINT_MAX_CACHED_LAMBDA: f64 = 10000.0;

/// Baumgarte factor for contacts.
const PENETRATION_BETA: f64 = 0.2;
/// Penetration depth tolerated before position correction kicks in.
const PENETRATION_SLOP: f64 = 0.01;

/// Diagonal generalized inverse mass of a body pair.
pub fn inv_mass_matrix(a: &Body, b: &Body) -> MatMN {
    MatMN::from_diagonal(&[
        a.inv_mass(),
        a.inv_mass(),
        a.inv_moment_of_inertia(),
        b.inv_mass(),
        b.inv_mass(),
        b.inv_moment_of_inertia(),
    ])
}

/// Linear and angular velocities of a body pair packed into one vector.
pub fn velocities(a: &Body, b: &Body) -> VectorN {
    VectorN::from(vec![
        a.velocity.x,
        a.velocity.y,
        a.angular_velocity,
        b.velocity.x,
        b.velocity.y,
        b.angular_velocity,
    ])
}

fn apply_impulses(a: &mut Body, b: &mut Body, impulses: &VectorN) {
    a.apply_impulse_linear(Vec2::new(impulses[0], impulses[1]));
    a.apply_impulse_angular(impulses[2]);
    b.apply_impulse_linear(Vec2::new(impulses[3], impulses[4]));
    b.apply_impulse_angular(impulses[5]);
}

/// Jacobian row for pushing the two bodies apart along `dir` at offsets `ra` and `rb`.
#[inline]
fn push_row(dir: Vec2, ra: Vec2, rb: Vec2) -> [f64; 6] {
    [
        -dir.x,
        -dir.y,
        -m::cross(ra, dir),
        dir.x,
        dir.y,
        m::cross(rb, dir),
    ]
}

/// Run `f` on the two bodies of a constraint if both still exist.
pub(crate) fn with_body_pair(
    bodies: &mut td::Arena<Body>,
    a: BodyKey,
    b: BodyKey,
    f: impl FnOnce(&mut Body, &mut Body),
) {
    if a == b {
        return;
    }
    if let (Some(a), Some(b)) = bodies.get2_mut(a.0, b.0) {
        f(a, b);
    }
}

/// The solver-facing constraint types.
#[derive(Clone, Debug)]
pub enum Constraint {
    Joint(JointConstraint),
    Penetration(PenetrationConstraint),
}

impl Constraint {
    #[inline]
    pub fn body_a(&self) -> BodyKey {
        match self {
            Constraint::Joint(j) => j.a,
            Constraint::Penetration(p) => p.a,
        }
    }

    #[inline]
    pub fn body_b(&self) -> BodyKey {
        match self {
            Constraint::Joint(j) => j.b,
            Constraint::Penetration(p) => p.b,
        }
    }

    #[inline]
    pub fn involves(&self, body: BodyKey) -> bool {
        self.body_a() == body || self.body_b() == body
    }

    pub fn pre_solve(&mut self, bodies: &mut td::Arena<Body>, dt: f64) {
        let (a, b) = (self.body_a(), self.body_b());
        with_body_pair(bodies, a, b, |a, b| match self {
            Constraint::Joint(j) => j.pre_solve(a, b, dt),
            Constraint::Penetration(p) => p.pre_solve(a, b, dt),
        });
    }

    pub fn solve(&mut self, bodies: &mut td::Arena<Body>) {
        let (a, b) = (self.body_a(), self.body_b());
        with_body_pair(bodies, a, b, |a, b| match self {
            Constraint::Joint(j) => j.solve(a, b),
            Constraint::Penetration(p) => p.solve(a, b),
        });
    }

    pub fn post_solve(&mut self) {
        match self {
            Constraint::Joint(j) => j.post_solve(),
            Constraint::Penetration(p) => p.post_solve(),
        }
    }
}

impl From<JointConstraint> for Constraint {
    fn from(j: JointConstraint) -> Self {
        Constraint::Joint(j)
    }
}

impl From<PenetrationConstraint> for Constraint {
    fn from(p: PenetrationConstraint) -> Self {
        Constraint::Penetration(p)
    }
}

//
// Joint
//

/// Pins a point of body `a` to a point of body `b`.
///
/// The constraint function is the squared distance between the two anchors,
/// so the Jacobian vanishes when the anchors coincide exactly.
#[derive(Clone, Debug)]
pub struct JointConstraint {
    a: BodyKey,
    b: BodyKey,
    a_point: Vec2,
    b_point: Vec2,
    jacobian: MatMN,
    cached_lambda: VectorN,
    bias: f64,
}

impl JointConstraint {
    /// Join two bodies at a world-space anchor point.
    /// The anchor is stored in each body's local space and moves with them from here on.
    pub fn new(a: BodyRef, b: BodyRef, anchor: Vec2) -> Self {
        Self {
            a: a.key,
            b: b.key,
            a_point: a.body.world_to_local(anchor),
            b_point: b.body.world_to_local(anchor),
            jacobian: MatMN::zeros(1, 6),
            cached_lambda: VectorN::zeros(1),
            bias: 0.0,
        }
    }

    #[inline]
    pub fn cached_lambda(&self) -> &VectorN {
        &self.cached_lambda
    }

    /// Current world-space distance between the two anchors.
    pub fn anchor_separation(&self, a: &Body, b: &Body) -> f64 {
        (b.local_to_world(self.b_point) - a.local_to_world(self.a_point)).mag()
    }

    pub fn pre_solve(&mut self, a: &mut Body, b: &mut Body, dt: f64) {
        let pa = a.local_to_world(self.a_point);
        let pb = b.local_to_world(self.b_point);
        let ra = pa - a.position;
        let rb = pb - b.position;

        let j1 = (pa - pb) * 2.0;
        let j3 = (pb - pa) * 2.0;
        self.jacobian.row_mut(0).copy_from_slice(&[
            j1.x,
            j1.y,
            m::cross(ra, pa - pb) * 2.0,
            j3.x,
            j3.y,
            m::cross(rb, pb - pa) * 2.0,
        ]);

        // warm start
        let impulses = &self.jacobian.transpose() * &self.cached_lambda;
        apply_impulses(a, b, &impulses);

        let c = (pb - pa).mag_sq();
        self.bias = (JOINT_BETA / dt) * (c - JOINT_SLOP).max(0.0);
    }

    pub fn solve(&mut self, a: &mut Body, b: &mut Body) {
        let v = velocities(a, b);
        let inv_m = inv_mass_matrix(a, b);
        let jt = self.jacobian.transpose();

        let lhs = &(&self.jacobian * &inv_m) * &jt;
        let mut rhs = -(&self.jacobian * &v);
        rhs[0] -= self.bias;
        let lambda = lhs.solve_gauss_seidel(&rhs);
        self.cached_lambda += &lambda;

        apply_impulses(a, b, &(&jt * &lambda));
    }

    pub fn post_solve(&mut self) {
        self.cached_lambda[0] =
            self.cached_lambda[0].clamp(-JOINT_MAX_CACHED_LAMBDA, JOINT_MAX_CACHED_LAMBDA);
    }
}

//
// Penetration
//

/// Keeps two bodies from moving into each other at one contact point,
/// with Coulomb friction along the contact tangent.
///
/// Built fresh from a [`Contact`] every step. The cached impulse only warm starts
/// the solver iterations within that step.
#[derive(Clone, Debug)]
pub struct PenetrationConstraint {
    a: BodyKey,
    b: BodyKey,
    a_point: Vec2,
    b_point: Vec2,
    /// Contact normal in the rotation frame of body `a`.
    normal: Vec2,
    friction: f64,
    restitution_threshold: f64,
    jacobian: MatMN,
    cached_lambda: VectorN,
    bias: f64,
}

impl PenetrationConstraint {
    /// Build the constraint for `contact`, where `a` and `b` are the bodies it refers to.
    pub fn new(contact: &Contact, a: &Body, b: &Body) -> Self {
        Self {
            a: contact.a,
            b: contact.b,
            a_point: a.world_to_local(contact.start),
            b_point: b.world_to_local(contact.end),
            normal: m::rotate(contact.normal, -a.rotation),
            friction: 0.0,
            restitution_threshold: f64::INFINITY,
            jacobian: MatMN::zeros(2, 6),
            cached_lambda: VectorN::zeros(2),
            bias: 0.0,
        }
    }

    /// Make the contact bounce when the bodies approach each other faster than `threshold`.
    /// Without this, restitution is ignored and contacts are fully inelastic.
    pub fn with_restitution_threshold(mut self, threshold: f64) -> Self {
        self.restitution_threshold = threshold;
        self
    }

    #[inline]
    pub fn body_a(&self) -> BodyKey {
        self.a
    }

    #[inline]
    pub fn body_b(&self) -> BodyKey {
        self.b
    }

    /// Accumulated `[normal, tangent]` impulse so far this step.
    #[inline]
    pub fn cached_lambda(&self) -> &VectorN {
        &self.cached_lambda
    }

    #[inline]
    pub fn friction(&self) -> f64 {
        self.friction
    }

    pub fn pre_solve(&mut self, a: &mut Body, b: &mut Body, dt: f64) {
        let pa = a.local_to_world(self.a_point);
        let pb = b.local_to_world(self.b_point);
        let n = m::rotate(self.normal, a.rotation);
        let ra = pa - a.position;
        let rb = pb - b.position;

        self.jacobian.zero();
        self.jacobian
            .row_mut(0)
            .copy_from_slice(&push_row(n, ra, rb));

        self.friction = a.friction.max(b.friction);
        if self.friction > 0.0 {
            let t = m::normal(n);
            self.jacobian
                .row_mut(1)
                .copy_from_slice(&push_row(t, ra, rb));
        }

        // approach speed before any impulses this step, negative when closing in
        let v_rel_n = (b.point_velocity(rb) - a.point_velocity(ra)).dot(n);

        // warm start
        let impulses = &self.jacobian.transpose() * &self.cached_lambda;
        apply_impulses(a, b, &impulses);

        let c = ((pb - pa).dot(-n) + PENETRATION_SLOP).min(0.0);
        self.bias = (PENETRATION_BETA / dt) * c;

        if v_rel_n < -self.restitution_threshold {
            let restitution = a.restitution.min(b.restitution);
            self.bias += restitution * v_rel_n;
        }
    }

    pub fn solve(&mut self, a: &mut Body, b: &mut Body) {
        let v = velocities(a, b);
        let inv_m = inv_mass_matrix(a, b);
        let jt = self.jacobian.transpose();

        let lhs = &(&self.jacobian * &inv_m) * &jt;
        let mut rhs = -(&self.jacobian * &v);
        rhs[0] -= self.bias;
        let lambda = lhs.solve_gauss_seidel(&rhs);

        let old_lambda = self.cached_lambda.clone();
        self.cached_lambda += &lambda;
        // contacts only ever push
        self.cached_lambda[0] = self.cached_lambda[0].max(0.0);
        if self.friction > 0.0 {
            let max_friction = self.cached_lambda[0] * self.friction;
            self.cached_lambda[1] = self.cached_lambda[1].max(-max_friction).min(max_friction);
        }
        let delta = &self.cached_lambda - &old_lambda;

        apply_impulses(a, b, &(&jt * &delta));
    }

    pub fn post_solve(&mut self) {}
}
