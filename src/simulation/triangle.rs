//! Triangle primitive used by the spatial index.
//!
//! A triangle stores its three world-space vertices and a precomputed unit
//! face normal. Adjacency (`neighbors`) and the two child links of the
//! KD-tree are filled in by [`crate::simulation::kd_tree::TriangleKdTree`]
//! while it is built; afterwards the triangle is never mutated.

use crate::simulation::states::{NVec3, EPS_LEN};

/// Index of a triangle inside the arena of its owning spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId(pub usize);

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: NVec3,
    pub max: NVec3,
}

impl Aabb {
    pub fn from_points(points: &[NVec3]) -> Self {
        let mut min = NVec3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = NVec3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min = min.inf(p);
            max = max.sup(p);
        }
        Self { min, max }
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Euclidean distance from `p` to the box (zero inside).
    pub fn distance_to(&self, p: &NVec3) -> f64 {
        let clamped = p.sup(&self.min).inf(&self.max);
        (p - clamped).norm()
    }
}

/// A mesh triangle in world space.
#[derive(Debug, Clone)]
pub struct Triangle {
    pub vertices: [NVec3; 3],
    pub normal: NVec3, // unit, counter-clockwise winding is outward
    pub neighbors: Vec<TriangleId>, // triangles sharing at least one vertex
    pub(crate) left: Option<TriangleId>,
    pub(crate) right: Option<TriangleId>,
}

impl Triangle {
    /// Build a triangle, or `None` when its area is zero and no normal exists.
    pub fn new(vertices: [NVec3; 3]) -> Option<Self> {
        let [a, b, c] = vertices;
        let normal = (b - a).cross(&(c - a)).try_normalize(EPS_LEN)?;
        Some(Self {
            vertices,
            normal,
            neighbors: Vec::new(),
            left: None,
            right: None,
        })
    }

    pub fn centroid(&self) -> NVec3 {
        (self.vertices[0] + self.vertices[1] + self.vertices[2]) / 3.0
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    pub fn left(&self) -> Option<TriangleId> {
        self.left
    }

    pub fn right(&self) -> Option<TriangleId> {
        self.right
    }

    /// Closest point on the triangle's surface to `p`.
    ///
    /// Classifies `p` against the Voronoi regions of the vertices, edges and
    /// face and projects onto the matching feature.
    pub fn closest_point(&self, p: &NVec3) -> NVec3 {
        let [a, b, c] = self.vertices;
        let ab = b - a;
        let ac = c - a;

        // vertex region a
        let ap = p - a;
        let d1 = ab.dot(&ap);
        let d2 = ac.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        // vertex region b
        let bp = p - b;
        let d3 = ab.dot(&bp);
        let d4 = ac.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        // edge region ab
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return a + ab * v;
        }

        // vertex region c
        let cp = p - c;
        let d5 = ab.dot(&cp);
        let d6 = ac.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        // edge region ac
        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return a + ac * w;
        }

        // edge region bc
        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return b + (c - b) * w;
        }

        // face region
        let denom = 1.0 / (va + vb + vc);
        let v = vb * denom;
        let w = vc * denom;
        a + ab * v + ac * w
    }

    pub fn centroid_distance(&self, p: &NVec3) -> f64 {
        (p - self.centroid()).norm()
    }

    pub fn surface_distance(&self, p: &NVec3) -> f64 {
        (p - self.closest_point(p)).norm()
    }
}
