use std::time::Instant;

use crate::simulation::collider::TriggerVolume;
use crate::simulation::controller::{ControllerSettings, GravityController};
use crate::simulation::field::{GravityFields, GravitySource};
use crate::simulation::kd_tree::{NearestMetric, NeighborLinking, TriangleKdTree};
use crate::simulation::mesh::TriangleMesh;
use crate::simulation::policy::{Centerpoint, HighPolyMesh, LowPolyMesh};
use crate::simulation::states::{NQuat, NVec3, RigidBody};

/// Helper to build `n` deterministic query points around the origin
fn make_points(n: usize, scale: f64) -> Vec<NVec3> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            // deterministic positions, no rand needed
            NVec3::new(
                (i_f * 0.37).sin() * scale,
                (i_f * 0.13).cos() * scale,
                (i_f * 0.07).sin() * scale,
            )
        })
        .collect()
}

/// KD-tree nearest-triangle queries against a linear scan, on icospheres
/// of rising subdivision
pub fn bench_nearest_triangle() {
    let queries = make_points(2000, 15.0);

    for subdivisions in 0..=5 {
        let mesh = TriangleMesh::icosphere(10.0, subdivisions);
        let triangles = mesh.world_triangles(&NVec3::zeros(), &NQuat::identity());

        let t_build = Instant::now();
        let index = TriangleKdTree::build(&triangles, NeighborLinking::default());
        let dt_build = t_build.elapsed().as_secs_f64();

        // Warm up
        let _ = index.nearest(&queries[0]);
        let _ = index.brute_force_nearest(&queries[0], NearestMetric::Centroid);

        // Time kd-tree
        let t0 = Instant::now();
        let mut hits = 0;
        for q in &queries {
            hits += index.nearest(q).map_or(0, |id| id.0 & 1);
        }
        let dt_kd = t0.elapsed().as_secs_f64();

        // Time brute force
        let t1 = Instant::now();
        for q in &queries {
            hits += index.brute_force_nearest(q, NearestMetric::Centroid).map_or(0, |id| id.0 & 1);
        }
        let dt_brute = t1.elapsed().as_secs_f64();

        println!(
            "triangles = {:6}, build = {:8.6} s, kd = {:8.6} s, brute = {:8.6} s ({} odd hits)",
            index.len(),
            dt_build,
            dt_kd,
            dt_brute,
            hits
        );
    }
}

/// Cost of one controller tick with several overlapping sources active
pub fn bench_apply_gravitation() {
    let steps = 10_000;
    let dt = 0.02;

    for subdivisions in [1, 3, 5] {
        let triangles = TriangleMesh::icosphere(8.0, subdivisions).world_triangles(&NVec3::zeros(), &NQuat::identity());

        let fields = GravityFields::new()
            .with(GravitySource::new("core", NVec3::zeros(), TriggerVolume::Sphere { radius: 30.0 }, Centerpoint))
            .with(GravitySource::new(
                "low_poly",
                NVec3::zeros(),
                TriggerVolume::Sphere { radius: 30.0 },
                LowPolyMesh::new(Some(TriangleKdTree::build(&triangles, NeighborLinking::default()))),
            ))
            .with(GravitySource::new(
                "high_poly",
                NVec3::zeros(),
                TriggerVolume::Sphere { radius: 30.0 },
                HighPolyMesh {
                    index: Some(TriangleKdTree::build(&triangles, NeighborLinking::Skip)),
                },
            ));

        let mut body = RigidBody::new(NVec3::new(0.0, 12.0, 0.0), 1.0);
        let mut controller = GravityController::new(ControllerSettings::default());
        for (id, _) in fields.iter() {
            controller.on_overlap_begin(&fields, id, &body, false);
        }
        let path = make_points(steps, 12.0);

        let t0 = Instant::now();
        for p in &path {
            // stay off the exact centre
            body.x = p + NVec3::new(0.0, 9.0, 0.0);
            controller.apply_gravitation(&fields, &mut body, dt);
            controller.rotate_to_planet(&mut body, dt);
            body.acc = NVec3::zeros();
        }
        let per_tick = t0.elapsed().as_secs_f64() / steps as f64;

        println!(
            "triangles = {:6}, fields = {}, tick = {:10.3} us",
            triangles.len(),
            controller.active_count(),
            per_tick * 1.0e6
        );
    }
}
