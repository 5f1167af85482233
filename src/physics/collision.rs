//! Narrow-phase collision tests between pairs of bodies.
//!
//! Every test appends zero or more [`Contact`]s to a caller-owned buffer
//! so the world can reuse one allocation across steps.

use super::{
    shape::{Polygon, Shape},
    Body, BodyKey,
};
use crate::math::{self as m, Vec2};

use thunderdome as td;

/// A body together with the key it's stored under.
#[derive(Clone, Copy, Debug)]
pub struct BodyRef<'a> {
    pub key: BodyKey,
    pub body: &'a Body,
}

impl<'a> BodyRef<'a> {
    #[inline]
    pub fn new(key: BodyKey, body: &'a Body) -> Self {
        Self { key, body }
    }
}

/// A single point of contact between two bodies.
///
/// `start`, `end` and `normal` always point from `a` towards `b`:
/// `start` is the deepest point of `b` inside `a` and `end` the deepest point of `a` inside `b`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    pub a: BodyKey,
    pub b: BodyKey,
    pub start: Vec2,
    pub end: Vec2,
    /// Unit normal from `a` to `b`.
    pub normal: Vec2,
    /// Penetration depth, non-negative while the bodies overlap.
    pub depth: f64,
}

/// Test two bodies for collision, dispatching on their shapes.
///
/// Circle-polygon pairs are always tested with the polygon as body `a` of the resulting contacts.
pub fn is_colliding(a: BodyRef, b: BodyRef, contacts: &mut Vec<Contact>) -> bool {
    match (a.body.shape(), b.body.shape()) {
        (Shape::Circle { .. }, Shape::Circle { .. }) => circle_circle(a, b, contacts),
        (Shape::Circle { .. }, _) => polygon_circle(b, a, contacts),
        (_, Shape::Circle { .. }) => polygon_circle(a, b, contacts),
        _ => polygon_polygon(a, b, contacts),
    }
}

//
// CIRCLE <-> CIRCLE
//

pub fn circle_circle(a: BodyRef, b: BodyRef, contacts: &mut Vec<Contact>) -> bool {
    let (Some(ra), Some(rb)) = (a.body.shape().radius(), b.body.shape().radius()) else {
        return false;
    };

    let ab = b.body.position - a.body.position;
    let r_sum = ra + rb;
    if ab.mag_sq() > r_sum * r_sum {
        return false;
    }

    let normal = m::unit_vector(ab);
    let start = b.body.position - normal * rb;
    let end = a.body.position + normal * ra;
    contacts.push(Contact {
        a: a.key,
        b: b.key,
        start,
        end,
        normal,
        depth: r_sum - ab.mag(),
    });
    true
}

//
// POLYGON <-> POLYGON
//

/// Separating axis test followed by clipping the incident edge against the reference polygon.
///
/// Produces up to two contacts. If clipping degenerates to fewer than two points,
/// no contacts are produced for this pair.
pub fn polygon_polygon(a: BodyRef, b: BodyRef, contacts: &mut Vec<Contact>) -> bool {
    let (Some(poly_a), Some(poly_b)) = (a.body.shape().as_polygon(), b.body.shape().as_polygon())
    else {
        return false;
    };

    let ab = poly_a.find_min_separation(poly_b);
    if ab.distance >= 0.0 {
        return false;
    }
    let ba = poly_b.find_min_separation(poly_a);
    if ba.distance >= 0.0 {
        return false;
    }

    // the polygon with less overlap owns the reference edge
    let (reference, incident, ref_index) = if ab.distance > ba.distance {
        (poly_a, poly_b, ab.edge_index)
    } else {
        (poly_b, poly_a, ba.edge_index)
    };
    let flip = ba.distance >= ab.distance;

    let ref_normal = m::normal(reference.edge_at(ref_index));
    let inc_verts = incident.world_vertices();
    let inc_index = incident.find_incident_edge(ref_normal);
    let mut clipped = [
        inc_verts[inc_index],
        inc_verts[(inc_index + 1) % inc_verts.len()],
    ];

    let ref_verts = reference.world_vertices();
    for i in (0..ref_verts.len()).filter(|&i| i != ref_index) {
        let c0 = ref_verts[i];
        let c1 = ref_verts[(i + 1) % ref_verts.len()];
        let (out, count) = Polygon::clip_segment_to_line(clipped, c0, c1);
        if count < 2 {
            return false;
        }
        clipped = out;
    }

    let v_ref = ref_verts[ref_index];
    let count_before = contacts.len();
    for v_clip in clipped {
        let separation = (v_clip - v_ref).dot(ref_normal);
        if separation > 0.0 {
            continue;
        }
        let mut start = v_clip;
        let mut end = v_clip + ref_normal * -separation;
        let mut normal = ref_normal;
        if flip {
            std::mem::swap(&mut start, &mut end);
            normal = -normal;
        }
        contacts.push(Contact {
            a: a.key,
            b: b.key,
            start,
            end,
            normal,
            depth: -separation,
        });
    }
    contacts.len() > count_before
}

//
// POLYGON <-> CIRCLE
//

/// Find the polygon edge nearest to the circle's center and test the circle against it.
///
/// If the center is outside, it lies in one of three regions of the nearest edge:
/// past its first vertex (A), past its second vertex (B) or alongside the edge itself (C).
pub fn polygon_circle(polygon: BodyRef, circle: BodyRef, contacts: &mut Vec<Contact>) -> bool {
    let (Some(poly), Some(radius)) = (
        polygon.body.shape().as_polygon(),
        circle.body.shape().radius(),
    ) else {
        return false;
    };
    let verts = poly.world_vertices();
    let center = circle.body.position;

    let mut is_outside = false;
    let mut edge_distance = f64::MIN;
    let mut curr = Vec2::zero();
    let mut next = Vec2::zero();
    for i in 0..verts.len() {
        let normal = m::normal(poly.edge_at(i));
        let projection = (center - verts[i]).dot(normal);
        if projection > 0.0 {
            edge_distance = projection;
            curr = verts[i];
            next = verts[(i + 1) % verts.len()];
            is_outside = true;
            break;
        }
        // inside this edge, track the shallowest one
        if projection > edge_distance {
            edge_distance = projection;
            curr = verts[i];
            next = verts[(i + 1) % verts.len()];
        }
    }

    let (normal, depth) = if is_outside {
        let to_curr = center - curr;
        let to_next = center - next;
        if to_curr.dot(next - curr) < 0.0 {
            // region A
            let dist = to_curr.mag();
            if dist > radius {
                return false;
            }
            (m::unit_vector(to_curr), radius - dist)
        } else if to_next.dot(curr - next) < 0.0 {
            // region B
            let dist = to_next.mag();
            if dist > radius {
                return false;
            }
            (m::unit_vector(to_next), radius - dist)
        } else {
            // region C
            if edge_distance > radius {
                return false;
            }
            (m::normal(next - curr), radius - edge_distance)
        }
    } else {
        (m::normal(next - curr), radius - edge_distance)
    };

    let start = center - normal * radius;
    contacts.push(Contact {
        a: polygon.key,
        b: circle.key,
        start,
        end: start + normal * depth,
        normal,
        depth,
    });
    true
}

//
// Direct resolution
//

impl Contact {
    /// Push the two bodies apart along the normal until they just touch,
    /// each moving in proportion to its inverse mass.
    pub fn resolve_penetration(&self, bodies: &mut td::Arena<Body>) {
        if self.a == self.b {
            return;
        }
        let (Some(a), Some(b)) = bodies.get2_mut(self.a.0, self.b.0) else {
            return;
        };
        if a.is_static() && b.is_static() {
            return;
        }
        let inv_mass_sum = a.inv_mass() + b.inv_mass();
        let da = self.depth / inv_mass_sum * a.inv_mass();
        let db = self.depth / inv_mass_sum * b.inv_mass();
        if !a.is_static() {
            a.position -= self.normal * da;
            a.update_vertices();
        }
        if !b.is_static() {
            b.position += self.normal * db;
            b.update_vertices();
        }
    }

    /// Resolve the contact without the constraint solver:
    /// separate the bodies, then apply a single restitution and friction impulse
    /// at the contact points if they're moving towards each other.
    pub fn resolve_collision(&self, bodies: &mut td::Arena<Body>) {
        self.resolve_penetration(bodies);
        if self.a == self.b {
            return;
        }
        let (Some(a), Some(b)) = bodies.get2_mut(self.a.0, self.b.0) else {
            return;
        };

        let e = a.restitution.min(b.restitution);
        let f = a.friction.min(b.friction);

        let ra = self.end - a.position;
        let rb = self.start - b.position;
        let v_rel = a.point_velocity(ra) - b.point_velocity(rb);

        let n = self.normal;
        let v_rel_n = v_rel.dot(n);
        if v_rel_n <= 0.0 {
            return;
        }
        let effective_inv_mass = |dir: Vec2| {
            let ra_x = m::cross(ra, dir);
            let rb_x = m::cross(rb, dir);
            a.inv_mass()
                + b.inv_mass()
                + ra_x * ra_x * a.inv_moment_of_inertia()
                + rb_x * rb_x * b.inv_moment_of_inertia()
        };
        let jn = -(1.0 + e) * v_rel_n / effective_inv_mass(n);

        let t = m::normal(n);
        let v_rel_t = v_rel.dot(t);
        let jt = f * -(1.0 + e) * v_rel_t / effective_inv_mass(t);

        let j = n * jn + t * jt;
        a.apply_impulse_at_point(j, ra);
        b.apply_impulse_at_point(-j, rb);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::PI;

    fn arena_with(bodies: Vec<Body>) -> (td::Arena<Body>, Vec<BodyKey>) {
        let mut arena = td::Arena::new();
        let keys = bodies
            .into_iter()
            .map(|b| BodyKey(arena.insert(b)))
            .collect();
        (arena, keys)
    }

    fn refs<'a>(arena: &'a td::Arena<Body>, keys: &[BodyKey]) -> (BodyRef<'a>, BodyRef<'a>) {
        (
            BodyRef::new(keys[0], &arena[keys[0].0]),
            BodyRef::new(keys[1], &arena[keys[1].0]),
        )
    }

    fn square(pos: Vec2, rotation: f64) -> Body {
        Body::new(Shape::rect(10.0, 10.0), pos, 1.0).with_rotation(m::Angle::Rad(rotation))
    }

    fn circle(pos: Vec2, radius: f64) -> Body {
        Body::new(Shape::circle(radius), pos, 1.0)
    }

    fn regular_polygon(sides: usize, radius: f64) -> Shape {
        let verts = (0..sides)
            .map(|i| {
                let ang = 2.0 * PI * i as f64 / sides as f64;
                Vec2::new(radius * ang.cos(), radius * ang.sin())
            })
            .collect();
        Shape::polygon(verts).unwrap()
    }

    #[test]
    fn circles_touching_and_apart() {
        let (arena, keys) = arena_with(vec![
            circle(Vec2::zero(), 10.0),
            circle(Vec2::new(15.0, 0.0), 10.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        let mut contacts = Vec::new();
        assert!(is_colliding(a, b, &mut contacts));
        assert_eq!(contacts.len(), 1);
        let c = contacts[0];
        assert_eq!(c.a, keys[0]);
        assert_eq!(c.normal, Vec2::new(1.0, 0.0));
        assert_eq!(c.start, Vec2::new(5.0, 0.0));
        assert_eq!(c.end, Vec2::new(10.0, 0.0));
        assert!((c.depth - 5.0).abs() < 1e-12);

        let (arena, keys) = arena_with(vec![
            circle(Vec2::zero(), 10.0),
            circle(Vec2::new(0.0, 20.5), 10.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        contacts.clear();
        assert!(!is_colliding(a, b, &mut contacts));
        assert!(contacts.is_empty());
    }

    #[test]
    fn coincident_circles_overlap_fully() {
        let (arena, keys) = arena_with(vec![
            circle(Vec2::new(3.0, 4.0), 10.0),
            circle(Vec2::new(3.0, 4.0), 5.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        let mut contacts = Vec::new();
        assert!(circle_circle(a, b, &mut contacts));
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].depth, 15.0);
        // no direction to push in
        assert_eq!(contacts[0].normal, Vec2::zero());
    }

    #[test]
    fn circle_pairs_collide_iff_overlapping() {
        let mut rng = StdRng::seed_from_u64(1234);
        let mut contacts = Vec::new();
        for _ in 0..500 {
            let ra = rng.gen_range(1.0..30.0);
            let rb = rng.gen_range(1.0..30.0);
            let pa = Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
            let pb = Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
            let (arena, keys) = arena_with(vec![circle(pa, ra), circle(pb, rb)]);
            let (a, b) = refs(&arena, &keys);

            contacts.clear();
            let dist = (pb - pa).mag();
            let colliding = circle_circle(a, b, &mut contacts);
            assert_eq!(colliding, dist <= ra + rb);
            if colliding {
                let depth = contacts[0].depth;
                assert!((depth - (ra + rb - dist)).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn overlapping_squares_make_two_contacts() {
        let (arena, keys) = arena_with(vec![
            square(Vec2::zero(), 0.0),
            square(Vec2::new(8.0, 0.0), 0.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        let mut contacts = Vec::new();
        assert!(is_colliding(a, b, &mut contacts));
        assert_eq!(contacts.len(), 2);
        for c in &contacts {
            assert_eq!(c.a, keys[0]);
            assert_eq!(c.b, keys[1]);
            assert!((c.normal - Vec2::new(1.0, 0.0)).mag() < 1e-12);
            assert!((c.depth - 2.0).abs() < 1e-12);
            assert!((c.start.x - 3.0).abs() < 1e-12);
            assert!((c.end.x - 5.0).abs() < 1e-12);
        }
        let ys: Vec<f64> = contacts.iter().map(|c| c.start.y).collect();
        assert!(ys.contains(&-5.0) && ys.contains(&5.0));
    }

    #[test]
    fn sunken_plank_clips_to_nothing() {
        // a thin plank entirely inside a square overlaps on every axis,
        // but the square's bottom edge lies past the plank's far side
        let plank = Body::new(Shape::rect(10.0, 4.0), Vec2::zero(), 1.0);
        let (arena, keys) = arena_with(vec![square(Vec2::zero(), 0.0), plank]);
        let (a, b) = refs(&arena, &keys);

        let (Some(poly_a), Some(poly_b)) =
            (a.body.shape().as_polygon(), b.body.shape().as_polygon())
        else {
            panic!("Expected two polygons");
        };
        assert_eq!(poly_a.find_min_separation(poly_b).distance, -7.0);
        assert_eq!(poly_b.find_min_separation(poly_a).distance, -7.0);

        let mut contacts = Vec::new();
        assert!(!polygon_polygon(a, b, &mut contacts));
        assert!(contacts.is_empty());
        assert!(!is_colliding(a, b, &mut contacts));
        assert!(contacts.is_empty());
    }

    #[test]
    fn separated_squares_dont_collide() {
        let (arena, keys) = arena_with(vec![
            square(Vec2::zero(), 0.0),
            square(Vec2::new(13.0, 3.0), 0.3),
        ]);
        let (a, b) = refs(&arena, &keys);
        let mut contacts = Vec::new();
        assert!(!polygon_polygon(a, b, &mut contacts));
        assert!(contacts.is_empty());
    }

    #[test]
    fn polygon_contacts_never_separate() {
        let mut rng = StdRng::seed_from_u64(99);
        let mut contacts = Vec::new();
        for _ in 0..500 {
            let shape_a = regular_polygon(rng.gen_range(3..8), rng.gen_range(5.0..15.0));
            let body_a = Body::new(shape_a, Vec2::zero(), 1.0)
                .with_rotation(m::Angle::Rad(rng.gen_range(0.0..2.0 * PI)));
            let body_b = square(
                Vec2::new(rng.gen_range(-20.0..20.0), rng.gen_range(-20.0..20.0)),
                rng.gen_range(0.0..2.0 * PI),
            );
            let (arena, keys) = arena_with(vec![body_a, body_b]);
            let (a, b) = refs(&arena, &keys);
            let (pa, pb) = (
                a.body.shape().as_polygon().unwrap(),
                b.body.shape().as_polygon().unwrap(),
            );

            contacts.clear();
            let colliding = polygon_polygon(a, b, &mut contacts);
            let separated = pa.find_min_separation(pb).distance >= 0.0
                || pb.find_min_separation(pa).distance >= 0.0;
            if separated {
                assert!(!colliding);
                assert!(contacts.is_empty());
            }
            for c in &contacts {
                assert!(c.depth >= 0.0);
                assert!(((c.end - c.start).dot(c.normal) - c.depth).abs() < 1e-9);
                assert!((c.normal.mag() - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn circle_beside_box_edge() {
        let (arena, keys) = arena_with(vec![
            square(Vec2::zero(), 0.0),
            circle(Vec2::new(0.0, -6.0), 2.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        let mut contacts = Vec::new();
        assert!(polygon_circle(a, b, &mut contacts));
        let c = contacts[0];
        assert_eq!(c.a, keys[0]);
        assert_eq!(c.normal, Vec2::new(0.0, -1.0));
        assert_eq!(c.depth, 1.0);
        assert_eq!(c.start, Vec2::new(0.0, -4.0));
        assert_eq!(c.end, Vec2::new(0.0, -5.0));
    }

    #[test]
    fn circle_near_box_corners() {
        let mut contacts = Vec::new();
        // region A, nearest to the first vertex of the top edge
        let (arena, keys) = arena_with(vec![
            square(Vec2::zero(), 0.0),
            circle(Vec2::new(-6.0, -6.0), 2.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        assert!(polygon_circle(a, b, &mut contacts));
        let c = contacts[0];
        let diag = Vec2::new(-1.0, -1.0).normalized();
        assert!((c.normal - diag).mag() < 1e-12);
        assert!((c.depth - (2.0 - 2.0f64.sqrt())).abs() < 1e-12);

        // region B, nearest to the second vertex
        let (arena, keys) = arena_with(vec![
            square(Vec2::zero(), 0.0),
            circle(Vec2::new(6.0, -6.0), 2.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        contacts.clear();
        assert!(polygon_circle(a, b, &mut contacts));
        let diag = Vec2::new(1.0, -1.0).normalized();
        assert!((contacts[0].normal - diag).mag() < 1e-12);

        // corner region but too far away
        let (arena, keys) = arena_with(vec![
            square(Vec2::zero(), 0.0),
            circle(Vec2::new(-6.0, -6.0), 1.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        contacts.clear();
        assert!(!polygon_circle(a, b, &mut contacts));
        assert!(contacts.is_empty());
    }

    #[test]
    fn circle_center_inside_box() {
        let (arena, keys) = arena_with(vec![
            square(Vec2::zero(), 0.0),
            circle(Vec2::new(0.0, -4.0), 2.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        let mut contacts = Vec::new();
        assert!(polygon_circle(a, b, &mut contacts));
        let c = contacts[0];
        assert_eq!(c.normal, Vec2::new(0.0, -1.0));
        assert_eq!(c.depth, 3.0);
        assert_eq!(c.start, Vec2::new(0.0, -2.0));
        assert_eq!(c.end, Vec2::new(0.0, -5.0));
    }

    #[test]
    fn circle_polygon_order_is_normalized() {
        let (arena, keys) = arena_with(vec![
            circle(Vec2::new(0.0, -6.0), 2.0),
            square(Vec2::zero(), 0.0),
        ]);
        let (a, b) = refs(&arena, &keys);
        let mut contacts = Vec::new();
        assert!(is_colliding(a, b, &mut contacts));
        assert_eq!(contacts[0].a, keys[1]);
        assert_eq!(contacts[0].b, keys[0]);
    }

    #[test]
    fn resolve_collision_swaps_equal_masses() {
        let (mut arena, keys) = arena_with(vec![
            circle(Vec2::zero(), 10.0)
                .with_velocity(Vec2::new(10.0, 0.0))
                .with_restitution(1.0)
                .with_friction(0.0),
            circle(Vec2::new(15.0, 0.0), 10.0)
                .with_velocity(Vec2::new(-10.0, 0.0))
                .with_restitution(1.0)
                .with_friction(0.0),
        ]);
        let mut contacts = Vec::new();
        {
            let (a, b) = refs(&arena, &keys);
            assert!(is_colliding(a, b, &mut contacts));
        }
        contacts[0].resolve_collision(&mut arena);

        let (a, b) = (&arena[keys[0].0], &arena[keys[1].0]);
        assert!((a.position.x + 2.5).abs() < 1e-12);
        assert!((b.position.x - 17.5).abs() < 1e-12);
        assert!((a.velocity.x + 10.0).abs() < 1e-9);
        assert!((b.velocity.x - 10.0).abs() < 1e-9);
    }

    #[test]
    fn resolve_penetration_leaves_static_alone() {
        let (mut arena, keys) = arena_with(vec![
            Body::new(Shape::rect(100.0, 10.0), Vec2::zero(), 0.0),
            circle(Vec2::new(0.0, -6.0), 2.0),
        ]);
        let mut contacts = Vec::new();
        {
            let (a, b) = refs(&arena, &keys);
            assert!(is_colliding(a, b, &mut contacts));
        }
        contacts[0].resolve_penetration(&mut arena);
        assert_eq!(arena[keys[0].0].position, Vec2::zero());
        assert!((arena[keys[1].0].position.y + 7.0).abs() < 1e-12);
    }
}
