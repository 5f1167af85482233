use crate::math::{self as m, Vec2};

/// Moment of inertia factor of a solid disc, per unit mass and squared radius.
const CIRCLE_INERTIA_FACTOR: f64 = 0.5;
/// Moment of inertia factor of a solid rectangle, per unit mass and squared diagonal.
const BOX_INERTIA_FACTOR: f64 = 1.0 / 12.0;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("A polygon needs at least 3 vertices, got {count}")]
    TooFewVertices { count: usize },
    #[error("Polygon vertex {index} is not finite")]
    NonFiniteVertex { index: usize },
}

/// Discriminant of a [`Shape`], for callers that only need to know what kind of shape it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeType {
    Circle,
    Polygon,
    Box,
}

/// The geometry of a rigid body.
///
/// Polygons and boxes carry a cache of world-space vertices
/// that is kept in sync with the owning body by [`Shape::update_vertices`].
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    Circle { radius: f64 },
    Polygon(Polygon),
    /// A rectangle centered on the body's origin.
    /// Behaves exactly like a polygon except for a closed-form moment of inertia.
    Box(Polygon),
}

impl Shape {
    #[inline]
    pub fn circle(radius: f64) -> Self {
        Shape::Circle { radius }
    }

    /// Create a convex polygon from vertices in body-local space.
    ///
    /// Vertices must be wound so that [`m::normal`] of every edge points out of the polygon,
    /// which is clockwise on screen when y grows downwards.
    pub fn polygon(vertices: Vec<Vec2>) -> Result<Self, ShapeError> {
        if vertices.len() < 3 {
            return Err(ShapeError::TooFewVertices {
                count: vertices.len(),
            });
        }
        if let Some(index) = vertices
            .iter()
            .position(|v| !(v.x.is_finite() && v.y.is_finite()))
        {
            return Err(ShapeError::NonFiniteVertex { index });
        }
        Ok(Shape::Polygon(Polygon::new(vertices)))
    }

    /// Create an axis-aligned (in local space) rectangle of the given size.
    pub fn rect(width: f64, height: f64) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Shape::Box(Polygon::new(vec![
            Vec2::new(-hw, -hh),
            Vec2::new(hw, -hh),
            Vec2::new(hw, hh),
            Vec2::new(-hw, hh),
        ]))
    }

    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Circle { .. } => ShapeType::Circle,
            Shape::Polygon(_) => ShapeType::Polygon,
            Shape::Box(_) => ShapeType::Box,
        }
    }

    /// Moment of inertia per unit mass. Multiply by the body's mass to get the real thing.
    pub fn moment_of_inertia(&self) -> f64 {
        match self {
            Shape::Circle { radius } => CIRCLE_INERTIA_FACTOR * radius * radius,
            Shape::Polygon(poly) => poly.moment_of_inertia(),
            Shape::Box(poly) => {
                BOX_INERTIA_FACTOR * (poly.width * poly.width + poly.height * poly.height)
            }
        }
    }

    /// Recompute the world-space vertex cache. No-op for circles.
    #[inline]
    pub fn update_vertices(&mut self, rotation: f64, position: Vec2) {
        match self {
            Shape::Circle { .. } => (),
            Shape::Polygon(poly) | Shape::Box(poly) => poly.update_vertices(rotation, position),
        }
    }

    #[inline]
    pub fn radius(&self) -> Option<f64> {
        match self {
            Shape::Circle { radius } => Some(*radius),
            _ => None,
        }
    }

    /// Get the polygon data of a polygon or a box.
    #[inline]
    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Shape::Circle { .. } => None,
            Shape::Polygon(poly) | Shape::Box(poly) => Some(poly),
        }
    }
}

/// Result of one direction of a separating axis test, see [`Polygon::find_min_separation`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Separation {
    /// Signed distance along the best axis. Negative means the polygons overlap on every axis.
    pub distance: f64,
    /// Index of the edge of the testing polygon whose normal is the best axis.
    pub edge_index: usize,
    /// The vertex of the other polygon that is deepest along that axis.
    pub support_point: Vec2,
}

/// A convex polygon with a local-space vertex list and a derived world-space cache.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    width: f64,
    height: f64,
    local_vertices: Vec<Vec2>,
    world_vertices: Vec<Vec2>,
}

impl Polygon {
    fn new(vertices: Vec<Vec2>) -> Self {
        let (mut min, mut max) = (
            Vec2::broadcast(f64::INFINITY),
            Vec2::broadcast(f64::NEG_INFINITY),
        );
        for v in &vertices {
            min = min.min_by_component(*v);
            max = max.max_by_component(*v);
        }
        let extent = max - min;
        Self {
            width: extent.x,
            height: extent.y,
            world_vertices: vertices.clone(),
            local_vertices: vertices,
        }
    }

    /// Width of the local-space bounding box.
    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height of the local-space bounding box.
    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn local_vertices(&self) -> &[Vec2] {
        &self.local_vertices
    }

    /// World-space vertices as of the last call to [`update_vertices`][Self::update_vertices].
    #[inline]
    pub fn world_vertices(&self) -> &[Vec2] {
        &self.world_vertices
    }

    pub fn update_vertices(&mut self, rotation: f64, position: Vec2) {
        for (world, local) in self.world_vertices.iter_mut().zip(&self.local_vertices) {
            *world = m::rotate(*local, rotation) + position;
        }
    }

    /// The world-space edge from vertex `index` to the next one, wrapping around.
    #[inline]
    pub fn edge_at(&self, index: usize) -> Vec2 {
        let next = (index + 1) % self.world_vertices.len();
        self.world_vertices[next] - self.world_vertices[index]
    }

    #[inline]
    fn edge_normals(&self) -> impl Iterator<Item = Vec2> + '_ {
        (0..self.world_vertices.len()).map(move |i| m::normal(self.edge_at(i)))
    }

    /// Signed area in local space. Positive for the winding [`Shape::polygon`] expects
    /// in a y-up frame.
    pub fn area(&self) -> f64 {
        self.local_edges()
            .map(|(a, b)| m::cross(a, b))
            .sum::<f64>()
            / 2.0
    }

    /// Center of mass in local space, assuming uniform density.
    pub fn centroid(&self) -> Vec2 {
        let area = self.area();
        if area == 0.0 {
            return Vec2::zero();
        }
        let weighted = self
            .local_edges()
            .fold(Vec2::zero(), |acc, (a, b)| acc + (a + b) * m::cross(a, b));
        weighted / (6.0 * area)
    }

    /// Moment of inertia per unit mass about the local origin.
    ///
    /// Uses local vertices so the result doesn't depend on the body's rotation.
    pub fn moment_of_inertia(&self) -> f64 {
        let (numerator, denominator) =
            self.local_edges().fold((0.0, 0.0), |(num, den), (a, b)| {
                let cross = m::cross(a, b).abs();
                (num + cross * (a.dot(a) + b.dot(b) + a.dot(b)), den + cross)
            });
        numerator / 6.0 / denominator
    }

    fn local_edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let n = self.local_vertices.len();
        (0..n).map(move |i| (self.local_vertices[i], self.local_vertices[(i + 1) % n]))
    }

    /// One direction of the separating axis test.
    ///
    /// For each edge of `self`, finds the vertex of `other` that is deepest behind the edge's normal.
    /// Returns the edge where that deepest vertex is least deep, i.e. the axis of least overlap.
    /// A non-negative distance means the edge separates the two polygons.
    pub fn find_min_separation(&self, other: &Polygon) -> Separation {
        let mut best = Separation {
            distance: f64::MIN,
            edge_index: 0,
            support_point: Vec2::zero(),
        };
        for (i, (&va, normal)) in self.world_vertices.iter().zip(self.edge_normals()).enumerate()
        {
            let mut min_sep = f64::MAX;
            let mut min_vertex = Vec2::zero();
            for &vb in &other.world_vertices {
                let proj = (vb - va).dot(normal);
                if proj < min_sep {
                    min_sep = proj;
                    min_vertex = vb;
                }
            }
            if min_sep > best.distance {
                best = Separation {
                    distance: min_sep,
                    edge_index: i,
                    support_point: min_vertex,
                };
            }
        }
        best
    }

    /// Index of the edge whose normal is most anti-parallel to `normal`.
    pub fn find_incident_edge(&self, normal: Vec2) -> usize {
        let mut incident = 0;
        let mut min_proj = f64::MAX;
        for (i, edge_normal) in self.edge_normals().enumerate() {
            let proj = edge_normal.dot(normal);
            if proj < min_proj {
                min_proj = proj;
                incident = i;
            }
        }
        incident
    }

    /// Clip the segment `points` against the line through `c0` and `c1`,
    /// keeping the part on the inner side (the side [`m::normal`] of `c1 - c0` points away from).
    ///
    /// Returns the output buffer and the number of valid points in it, which is 0, 1 or 2.
    pub fn clip_segment_to_line(points: [Vec2; 2], c0: Vec2, c1: Vec2) -> ([Vec2; 2], usize) {
        let mut out = [Vec2::zero(); 2];
        let mut count = 0;

        let dir = m::unit_vector(c1 - c0);
        let dist0 = m::cross(points[0] - c0, dir);
        let dist1 = m::cross(points[1] - c0, dir);

        if dist0 <= 0.0 {
            out[count] = points[0];
            count += 1;
        }
        if dist1 <= 0.0 {
            out[count] = points[1];
            count += 1;
        }
        // endpoints on opposite sides, add the crossing point
        if dist0 * dist1 < 0.0 {
            let t = dist0 / (dist0 - dist1);
            out[count] = points[0] + (points[1] - points[0]) * t;
            count += 1;
        }
        (out, count)
    }
}
