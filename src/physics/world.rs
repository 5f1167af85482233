use super::{
    collision::{self, BodyRef, Contact},
    constraint::{with_body_pair, Constraint, JointConstraint, PenetrationConstraint},
    force::ForceGenerator,
    Body, BodyKey, ConstraintKey,
};
use crate::math::Vec2;

use itertools::Itertools;
use thunderdome as td;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldError {
    #[error("Body {0:?} does not exist in this world")]
    UnknownBody(BodyKey),
    #[error("A constraint needs two different bodies")]
    SameBody,
}

/// Tunable parameters of a [`World`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct WorldSettings {
    /// Vertical gravitational acceleration in metres per second squared,
    /// measured with y pointing up. Negative values pull bodies towards +y,
    /// which is down on screen.
    pub gravity: f64,
    /// Conversion from metres to the pixel units positions are stored in.
    pub pixels_per_meter: f64,
    /// Number of sequential impulse passes over all constraints per step.
    pub solver_iterations: usize,
    /// Contacts closing faster than this (in pixels per second) bounce
    /// according to the bodies' restitution. Slower contacts are inelastic.
    pub restitution_threshold: f64,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity: -9.8,
            pixels_per_meter: 50.0,
            solver_iterations: 10,
            restitution_threshold: 50.0,
        }
    }
}

/// Owner of every body and persistent constraint in a simulation.
pub struct World {
    settings: WorldSettings,
    bodies: td::Arena<Body>,
    constraints: td::Arena<Constraint>,
    forces: Vec<Vec2>,
    torques: Vec<f64>,
    generators: Vec<Box<dyn ForceGenerator>>,
    // per-step working buffers, kept around to reuse their allocations
    body_keys: Vec<BodyKey>,
    contacts: Vec<Contact>,
    penetrations: Vec<PenetrationConstraint>,
}

impl Default for World {
    fn default() -> Self {
        Self::with_settings(WorldSettings::default())
    }
}

impl World {
    /// Create a world with the given gravity and default settings otherwise.
    ///
    /// Pass a negative value such as `-9.8` for bodies to fall down the screen.
    /// See [`WorldSettings::gravity`].
    pub fn new(gravity: f64) -> Self {
        Self::with_settings(WorldSettings {
            gravity,
            ..Default::default()
        })
    }

    pub fn with_settings(settings: WorldSettings) -> Self {
        Self {
            settings,
            bodies: td::Arena::new(),
            constraints: td::Arena::new(),
            forces: Vec::new(),
            torques: Vec::new(),
            generators: Vec::new(),
            body_keys: Vec::new(),
            contacts: Vec::new(),
            penetrations: Vec::new(),
        }
    }

    #[inline]
    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    #[inline]
    pub fn settings_mut(&mut self) -> &mut WorldSettings {
        &mut self.settings
    }

    //
    // bodies
    //

    pub fn add_body(&mut self, body: Body) -> BodyKey {
        let key = BodyKey(self.bodies.insert(body));
        log::debug!("Added body {:?}", key);
        key
    }

    /// Remove a body and every constraint attached to it.
    pub fn remove_body(&mut self, key: BodyKey) -> Option<Body> {
        let body = self.bodies.remove(key.0)?;
        let attached: Vec<td::Index> = self
            .constraints
            .iter()
            .filter(|(_, c)| c.involves(key))
            .map(|(idx, _)| idx)
            .collect();
        for idx in &attached {
            self.constraints.remove(*idx);
        }
        log::debug!(
            "Removed body {:?} along with {} constraints",
            key,
            attached.len()
        );
        Some(body)
    }

    #[inline]
    pub fn body(&self, key: BodyKey) -> Option<&Body> {
        self.bodies.get(key.0)
    }

    /// Mutably access a body. Call [`Body::update_vertices`] after moving it directly.
    #[inline]
    pub fn body_mut(&mut self, key: BodyKey) -> Option<&mut Body> {
        self.bodies.get_mut(key.0)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyKey, &Body)> {
        self.bodies.iter().map(|(idx, body)| (BodyKey(idx), body))
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    //
    // constraints
    //

    /// Add a constraint that persists across steps until removed.
    pub fn add_constraint(
        &mut self,
        constraint: impl Into<Constraint>,
    ) -> Result<ConstraintKey, WorldError> {
        let constraint = constraint.into();
        self.check_pair(constraint.body_a(), constraint.body_b())?;
        let key = ConstraintKey(self.constraints.insert(constraint));
        log::debug!("Added constraint {:?}", key);
        Ok(key)
    }

    /// Join two bodies at a world-space anchor point.
    pub fn add_joint(
        &mut self,
        a: BodyKey,
        b: BodyKey,
        anchor: Vec2,
    ) -> Result<ConstraintKey, WorldError> {
        self.check_pair(a, b)?;
        let (Some(body_a), Some(body_b)) = (self.body(a), self.body(b)) else {
            return Err(WorldError::UnknownBody(a));
        };
        let joint = JointConstraint::new(BodyRef::new(a, body_a), BodyRef::new(b, body_b), anchor);
        self.add_constraint(joint)
    }

    fn check_pair(&self, a: BodyKey, b: BodyKey) -> Result<(), WorldError> {
        let err = if a == b {
            WorldError::SameBody
        } else if !self.bodies.contains(a.0) {
            WorldError::UnknownBody(a)
        } else if !self.bodies.contains(b.0) {
            WorldError::UnknownBody(b)
        } else {
            return Ok(());
        };
        log::warn!("Rejected constraint between {:?} and {:?}: {}", a, b, err);
        Err(err)
    }

    pub fn remove_constraint(&mut self, key: ConstraintKey) -> Option<Constraint> {
        let removed = self.constraints.remove(key.0);
        if removed.is_some() {
            log::debug!("Removed constraint {:?}", key);
        }
        removed
    }

    #[inline]
    pub fn constraint(&self, key: ConstraintKey) -> Option<&Constraint> {
        self.constraints.get(key.0)
    }

    pub fn constraints(&self) -> impl Iterator<Item = (ConstraintKey, &Constraint)> {
        self.constraints
            .iter()
            .map(|(idx, c)| (ConstraintKey(idx), c))
    }

    /// Contacts found during the most recent step.
    #[inline]
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    //
    // forces
    //

    /// Add a force applied to every body on every step.
    pub fn add_force(&mut self, force: Vec2) {
        self.forces.push(force);
    }

    /// Add a torque applied to every body on every step.
    pub fn add_torque(&mut self, torque: f64) {
        self.torques.push(torque);
    }

    /// Add a generator whose force is applied to every body on every step.
    pub fn add_generator(&mut self, generator: impl ForceGenerator + 'static) {
        self.generators.push(Box::new(generator));
    }

    /// Remove every global force, torque and generator.
    pub fn clear_forces(&mut self) {
        self.forces.clear();
        self.torques.clear();
        self.generators.clear();
    }

    //
    // simulation
    //

    /// Advance the simulation by `dt` seconds.
    pub fn update(&mut self, dt: f64) {
        let _span = tracy_span!("world update");

        self.apply_forces();
        {
            let _span = tracy_span!("integrate forces");
            for (_, body) in self.bodies.iter_mut() {
                body.integrate_forces(dt);
            }
        }

        self.detect_collisions();
        self.solve_constraints(dt);

        {
            let _span = tracy_span!("integrate velocities");
            for (_, body) in self.bodies.iter_mut() {
                body.integrate_velocities(dt);
            }
        }

        log::trace!(
            "Stepped {} bodies, {} contacts, {} joints",
            self.bodies.len(),
            self.contacts.len(),
            self.constraints.len()
        );
    }

    fn apply_forces(&mut self) {
        // screen y grows downwards
        let gravity = -self.settings.gravity * self.settings.pixels_per_meter;
        for (_, body) in self.bodies.iter_mut() {
            if body.is_static() {
                continue;
            }
            let weight = Vec2::new(0.0, body.mass() * gravity);
            body.add_force(weight);
            for force in &self.forces {
                body.add_force(*force);
            }
            for torque in &self.torques {
                body.add_torque(*torque);
            }
            for generator in &self.generators {
                let force = generator.force_on(body);
                body.add_force(force);
            }
        }
    }

    fn detect_collisions(&mut self) {
        let _span = tracy_span!("detect collisions");

        self.contacts.clear();
        self.penetrations.clear();
        self.body_keys.clear();
        self.body_keys
            .extend(self.bodies.iter().map(|(idx, _)| BodyKey(idx)));

        for (&key_a, &key_b) in self.body_keys.iter().tuple_combinations() {
            let (Some(a), Some(b)) = (self.bodies.get(key_a.0), self.bodies.get(key_b.0)) else {
                continue;
            };
            if a.is_static() && b.is_static() {
                continue;
            }
            let first_new = self.contacts.len();
            if collision::is_colliding(
                BodyRef::new(key_a, a),
                BodyRef::new(key_b, b),
                &mut self.contacts,
            ) {
                for contact in &self.contacts[first_new..] {
                    // polygon-circle contacts may have swapped a and b
                    let (Some(ca), Some(cb)) =
                        (self.bodies.get(contact.a.0), self.bodies.get(contact.b.0))
                    else {
                        continue;
                    };
                    self.penetrations.push(
                        PenetrationConstraint::new(contact, ca, cb)
                            .with_restitution_threshold(self.settings.restitution_threshold),
                    );
                }
            }
        }
    }

    fn solve_constraints(&mut self, dt: f64) {
        let _span = tracy_span!("solve constraints");

        for (_, c) in self.constraints.iter_mut() {
            c.pre_solve(&mut self.bodies, dt);
        }
        for p in &mut self.penetrations {
            with_body_pair(&mut self.bodies, p.body_a(), p.body_b(), |a, b| {
                p.pre_solve(a, b, dt)
            });
        }

        for _ in 0..self.settings.solver_iterations {
            for (_, c) in self.constraints.iter_mut() {
                c.solve(&mut self.bodies);
            }
            for p in &mut self.penetrations {
                with_body_pair(&mut self.bodies, p.body_a(), p.body_b(), |a, b| p.solve(a, b));
            }
        }

        for (_, c) in self.constraints.iter_mut() {
            c.post_solve();
        }
        for p in &mut self.penetrations {
            p.post_solve();
        }
    }
}
