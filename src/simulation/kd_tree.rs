//! # KD-tree over triangles
//!
//! This module implements the spatial index used by the mesh-based gravity
//! policies: given a query point, find the mesh triangle nearest to it.
//!
//! ## Core Concepts
//!
//! - Triangles live in an arena (`Vec<Triangle>`) and address each other by
//!   [`TriangleId`]. Every triangle doubles as a tree node through its
//!   `left` / `right` child links.
//! - Construction is a balanced median split: at depth `d` the remaining
//!   triangles are sorted by their centroid coordinate on axis `d mod 3`, the
//!   median becomes the node, and the two halves are built recursively.
//!   O(n log n) construction, O(log n) depth.
//! - Each node also stores the bounding box of its whole subtree. The query
//!   uses it as a lower bound on the distance of anything below that node,
//!   which makes the result exact (identical to a brute-force scan) for both
//!   the centroid and the closest-surface-point metric.
//! - Optionally, an adjacency graph is built once: two triangles are
//!   neighbors iff they share at least one vertex. Vertex identity is decided
//!   by welding positions within a tolerance through a spatial hash, so
//!   floating point drift after transforming a mesh into world space does not
//!   lose neighbors.

use hashbrown::HashMap;
use log::{debug, warn};

use crate::simulation::states::NVec3;
use crate::simulation::triangle::{Aabb, Triangle, TriangleId};

/// Default welding tolerance for neighbor detection (world units).
pub const DEFAULT_WELD_TOLERANCE: f64 = 1e-5;

/// Whether and how to build the neighbor graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NeighborLinking {
    /// No adjacency (high-poly meshes never need it).
    Skip,
    /// Vertices closer than `tolerance` count as the same vertex.
    Weld { tolerance: f64 },
}

impl Default for NeighborLinking {
    fn default() -> Self {
        NeighborLinking::Weld { tolerance: DEFAULT_WELD_TOLERANCE }
    }
}

/// Distance measure used to rank triangles against a query point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NearestMetric {
    /// Distance to the triangle's centroid (fast).
    #[default]
    Centroid,
    /// Distance to the closest point on the triangle (exact).
    Surface,
}

impl NearestMetric {
    fn distance(&self, tri: &Triangle, p: &NVec3) -> f64 {
        match self {
            NearestMetric::Centroid => tri.centroid_distance(p),
            NearestMetric::Surface => tri.surface_distance(p),
        }
    }
}

/// A balanced KD-tree over the triangles of one mesh.
///
/// This structure owns:
/// - the triangle arena (`triangles`), children linked by id
/// - the bounding box of each node's subtree (`bounds`, indexed like `triangles`)
/// - the id of the root node (`root`, `None` for an empty mesh)
#[derive(Debug, Clone)]
pub struct TriangleKdTree {
    triangles: Vec<Triangle>,
    bounds: Vec<Aabb>,
    root: Option<TriangleId>,
}

impl TriangleKdTree {
    /// Build the index from plain world-space triangles.
    ///
    /// Zero-area triangles have no normal and are skipped with a warning;
    /// every other input triangle ends up in the tree exactly once.
    ///
    /// # Parameters
    /// - `input`   : triangles as three world-space vertices each.
    /// - `linking` : whether to compute the neighbor graph afterwards.
    pub fn build(input: &[[NVec3; 3]], linking: NeighborLinking) -> Self {
        let triangles: Vec<Triangle> = input.iter().filter_map(|v| Triangle::new(*v)).collect();
        let skipped = input.len() - triangles.len();
        if skipped > 0 {
            warn!("skipped {} degenerate triangle(s) while building spatial index", skipped);
        }

        let bounds = triangles.iter().map(Triangle::bounds).collect();
        let mut tree = TriangleKdTree {
            triangles,
            bounds,
            root: None,
        };

        let mut ids: Vec<TriangleId> = (0..tree.triangles.len()).map(TriangleId).collect();
        tree.root = tree.build_node(&mut ids, 0);

        if let NeighborLinking::Weld { tolerance } = linking {
            tree.link_neighbors(tolerance);
        }

        debug!(
            "built triangle index: {} triangles, depth {}",
            tree.triangles.len(),
            tree.depth()
        );
        tree
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn root(&self) -> Option<TriangleId> {
        self.root
    }

    pub fn triangle(&self, id: TriangleId) -> &Triangle {
        &self.triangles[id.0]
    }

    /// Triangle `id`, or `None` when the id does not belong to this tree.
    pub fn get(&self, id: TriangleId) -> Option<&Triangle> {
        self.triangles.get(id.0)
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Height of the tree (0 when empty).
    pub fn depth(&self) -> usize {
        fn height(tree: &TriangleKdTree, node: Option<TriangleId>) -> usize {
            match node {
                None => 0,
                Some(id) => {
                    let t = tree.triangle(id);
                    1 + height(tree, t.left).max(height(tree, t.right))
                }
            }
        }
        height(self, self.root)
    }

    /// Nearest triangle by centroid distance.
    pub fn nearest(&self, target: &NVec3) -> Option<TriangleId> {
        self.nearest_with(target, NearestMetric::Centroid)
    }

    /// Nearest triangle under the given metric.
    ///
    /// Descends into the branch on the query's side of the splitting plane
    /// first, then into the other branch only if its subtree bounds are
    /// closer than the best triangle found so far.
    ///
    /// # Returns
    /// `None` only when the index holds no triangles.
    pub fn nearest_with(&self, target: &NVec3, metric: NearestMetric) -> Option<TriangleId> {
        let mut best: Option<(TriangleId, f64)> = None;
        self.search(self.root, target, 0, metric, &mut best);
        best.map(|(id, _)| id)
    }

    /// Linear scan over all triangles; reference answer for tests and benches.
    pub fn brute_force_nearest(&self, target: &NVec3, metric: NearestMetric) -> Option<TriangleId> {
        self.triangles
            .iter()
            .enumerate()
            .map(|(i, t)| (TriangleId(i), metric.distance(t, target)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    /// Distance from `target` to triangle `id` under `metric`.
    pub fn distance(&self, id: TriangleId, target: &NVec3, metric: NearestMetric) -> f64 {
        metric.distance(self.triangle(id), target)
    }

    // helpers ==============================================================================

    /// Recursively build the subtree over `ids` and return its root.
    ///
    /// Sorts the slice by centroid coordinate along `depth mod 3`, takes the
    /// median as node, recurses on both halves and folds the children's
    /// bounds into the node's own.
    fn build_node(&mut self, ids: &mut [TriangleId], depth: usize) -> Option<TriangleId> {
        if ids.is_empty() {
            return None;
        }

        let axis = depth % 3;
        {
            let triangles = &self.triangles;
            ids.sort_by(|a, b| {
                let ca = triangles[a.0].centroid()[axis];
                let cb = triangles[b.0].centroid()[axis];
                ca.total_cmp(&cb)
            });
        }

        let median = ids.len() / 2;
        let node = ids[median];
        let (lower, rest) = ids.split_at_mut(median);
        let upper = &mut rest[1..];

        let left = self.build_node(lower, depth + 1);
        let right = self.build_node(upper, depth + 1);

        let mut bounds = self.bounds[node.0];
        for child in [left, right].into_iter().flatten() {
            bounds = bounds.union(&self.bounds[child.0]);
        }

        let tri = &mut self.triangles[node.0];
        tri.left = left;
        tri.right = right;
        self.bounds[node.0] = bounds;

        Some(node)
    }

    /// Recursive nearest-neighbor descent.
    ///
    /// # Parameters
    /// - `node`   : current subtree root.
    /// - `target` : query point.
    /// - `depth`  : tree depth of `node`, selects the splitting axis.
    /// - `metric` : triangle distance measure.
    /// - `best`   : best (id, distance) so far, updated in place.
    fn search(
        &self,
        node: Option<TriangleId>,
        target: &NVec3,
        depth: usize,
        metric: NearestMetric,
        best: &mut Option<(TriangleId, f64)>,
    ) {
        let Some(id) = node else {
            return;
        };

        // nothing under this node can beat the current best
        if let Some((_, best_dist)) = *best {
            if self.bounds[id.0].distance_to(target) >= best_dist {
                return;
            }
        }

        let tri = &self.triangles[id.0];
        let d = metric.distance(tri, target);
        if best.map_or(true, |(_, best_dist)| d < best_dist) {
            *best = Some((id, d));
        }

        let axis = depth % 3;
        let (near, far) = if target[axis] < tri.centroid()[axis] {
            (tri.left, tri.right)
        } else {
            (tri.right, tri.left)
        };

        self.search(near, target, depth + 1, metric, best);
        self.search(far, target, depth + 1, metric, best);
    }

    /// Fill every triangle's `neighbors` list.
    ///
    /// Positions are welded into canonical vertices through a hash grid with
    /// cell size `tolerance`; a vertex joins an existing canonical vertex if
    /// one lies within `tolerance` in the surrounding 27 cells. Triangles are
    /// then neighbors when they reference a common canonical vertex.
    fn link_neighbors(&mut self, tolerance: f64) {
        let tol = tolerance.max(f64::EPSILON);
        let cell_of = |p: &NVec3| -> (i64, i64, i64) {
            (
                (p.x / tol).floor() as i64,
                (p.y / tol).floor() as i64,
                (p.z / tol).floor() as i64,
            )
        };

        let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
        let mut welded: Vec<NVec3> = Vec::new();
        let mut users: Vec<Vec<TriangleId>> = Vec::new(); // canonical vertex -> triangles
        let mut corners: Vec<[usize; 3]> = Vec::with_capacity(self.triangles.len());

        for (i, tri) in self.triangles.iter().enumerate() {
            let mut canon = [0usize; 3];
            for (k, p) in tri.vertices.iter().enumerate() {
                let (cx, cy, cz) = cell_of(p);
                let mut found = None;
                'search: for dx in -1..=1 {
                    for dy in -1..=1 {
                        for dz in -1..=1 {
                            if let Some(bucket) = grid.get(&(cx + dx, cy + dy, cz + dz)) {
                                if let Some(&v) = bucket.iter().find(|&&v| (welded[v] - p).norm() <= tol) {
                                    found = Some(v);
                                    break 'search;
                                }
                            }
                        }
                    }
                }

                let v = match found {
                    Some(v) => v,
                    None => {
                        welded.push(*p);
                        users.push(Vec::new());
                        let v = welded.len() - 1;
                        grid.entry((cx, cy, cz)).or_default().push(v);
                        v
                    }
                };
                if !users[v].contains(&TriangleId(i)) {
                    users[v].push(TriangleId(i));
                }
                canon[k] = v;
            }
            corners.push(canon);
        }

        for (i, canon) in corners.iter().enumerate() {
            let mut neighbors: Vec<TriangleId> = canon
                .iter()
                .flat_map(|&v| users[v].iter().copied())
                .filter(|&t| t != TriangleId(i))
                .collect();
            neighbors.sort_unstable();
            neighbors.dedup();
            self.triangles[i].neighbors = neighbors;
        }

        debug!("welded {} vertices into {} shared positions", corners.len() * 3, welded.len());
    }
}
