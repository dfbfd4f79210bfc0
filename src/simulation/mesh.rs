//! Indexed triangle meshes and primitive generators.
//!
//! The spatial index consumes plain arrays of world-space triangles; this
//! module is where those arrays come from. A [`TriangleMesh`] is an indexed
//! mesh in the local frame of a gravity field, turned into world-space
//! triangles with [`TriangleMesh::world_triangles`].

use hashbrown::HashMap;

use crate::error::ConfigError;
use crate::simulation::states::{NQuat, NVec3};

#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<NVec3>,
    pub indices: Vec<[usize; 3]>, // counter-clockwise seen from outside
}

impl TriangleMesh {
    /// Build a mesh from a flat index buffer, validating its shape.
    pub fn from_buffers(field: &str, vertices: Vec<NVec3>, flat: &[usize]) -> Result<Self, ConfigError> {
        if flat.len() % 3 != 0 {
            return Err(ConfigError::IndexBufferLength {
                field: field.to_string(),
                len: flat.len(),
            });
        }
        if let Some(&index) = flat.iter().find(|&&i| i >= vertices.len()) {
            return Err(ConfigError::IndexOutOfRange {
                field: field.to_string(),
                index,
                vertices: vertices.len(),
            });
        }
        let indices = flat.chunks_exact(3).map(|t| [t[0], t[1], t[2]]).collect();
        Ok(Self { vertices, indices })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Triangles transformed into world space by `origin + rotation * v`.
    pub fn world_triangles(&self, origin: &NVec3, rotation: &NQuat) -> Vec<[NVec3; 3]> {
        let world: Vec<NVec3> = self.vertices.iter().map(|v| origin + rotation * v).collect();
        self.indices
            .iter()
            .map(|&[a, b, c]| [world[a], world[b], world[c]])
            .collect()
    }

    /// Regular icosahedron projected onto a sphere, subdivided `subdivisions` times.
    ///
    /// Every subdivision splits each face into four; 20 * 4^n triangles.
    pub fn icosphere(radius: f64, subdivisions: u32) -> Self {
        let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
        let mut vertices: Vec<NVec3> = [
            [-1.0, t, 0.0], [1.0, t, 0.0], [-1.0, -t, 0.0], [1.0, -t, 0.0],
            [0.0, -1.0, t], [0.0, 1.0, t], [0.0, -1.0, -t], [0.0, 1.0, -t],
            [t, 0.0, -1.0], [t, 0.0, 1.0], [-t, 0.0, -1.0], [-t, 0.0, 1.0],
        ]
        .iter()
        .map(|p| NVec3::new(p[0], p[1], p[2]).normalize())
        .collect();

        let mut indices: Vec<[usize; 3]> = vec![
            [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
            [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
            [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
            [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            // edge (lo, hi) -> midpoint vertex, so shared edges reuse one vertex
            let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
            let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<NVec3>| -> usize {
                let key = if a < b { (a, b) } else { (b, a) };
                *midpoints.entry(key).or_insert_with(|| {
                    let m = ((vertices[a] + vertices[b]) * 0.5).normalize();
                    vertices.push(m);
                    vertices.len() - 1
                })
            };

            let mut next = Vec::with_capacity(indices.len() * 4);
            for &[a, b, c] in &indices {
                let ab = midpoint(a, b, &mut vertices);
                let bc = midpoint(b, c, &mut vertices);
                let ca = midpoint(c, a, &mut vertices);
                next.push([a, ab, ca]);
                next.push([b, bc, ab]);
                next.push([c, ca, bc]);
                next.push([ab, bc, ca]);
            }
            indices = next;
        }

        for v in vertices.iter_mut() {
            *v *= radius;
        }
        Self { vertices, indices }
    }

    /// Axis-aligned box centred on the origin, two triangles per face.
    pub fn cuboid(half_extents: NVec3) -> Self {
        // corner i: bit 0 -> +x, bit 1 -> +y, bit 2 -> +z
        let vertices = (0..8)
            .map(|i| {
                NVec3::new(
                    if i & 1 != 0 { half_extents.x } else { -half_extents.x },
                    if i & 2 != 0 { half_extents.y } else { -half_extents.y },
                    if i & 4 != 0 { half_extents.z } else { -half_extents.z },
                )
            })
            .collect();

        let quads = [
            [1, 3, 7, 5], // +x
            [0, 4, 6, 2], // -x
            [2, 6, 7, 3], // +y
            [0, 1, 5, 4], // -y
            [4, 5, 7, 6], // +z
            [0, 2, 3, 1], // -z
        ];
        let indices = quads
            .iter()
            .flat_map(|q| [[q[0], q[1], q[2]], [q[0], q[2], q[3]]])
            .collect();

        Self { vertices, indices }
    }

    /// Flat square grid in the XZ plane facing +Y, `cells` x `cells` quads.
    pub fn grid(half_size: f64, cells: usize) -> Self {
        let n = cells.max(1);
        let step = 2.0 * half_size / n as f64;
        let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
        for i in 0..=n {
            for j in 0..=n {
                vertices.push(NVec3::new(-half_size + step * i as f64, 0.0, -half_size + step * j as f64));
            }
        }

        let at = |i: usize, j: usize| i * (n + 1) + j;
        let mut indices = Vec::with_capacity(n * n * 2);
        for i in 0..n {
            for j in 0..n {
                let (p00, p10, p01, p11) = (at(i, j), at(i + 1, j), at(i, j + 1), at(i + 1, j + 1));
                indices.push([p00, p01, p11]);
                indices.push([p00, p11, p10]);
            }
        }

        Self { vertices, indices }
    }
}
