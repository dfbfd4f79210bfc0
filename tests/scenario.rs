use approx::assert_relative_eq;
use rstest::rstest;

use planet_gravity::configuration::config::{MeshConfig, PolicyConfig, ScenarioConfig, TriggerConfig};
use planet_gravity::simulation::policy::{LocalAxis, PolicyKind, WorldDirection};
use planet_gravity::simulation::scenario::Scenario;
use planet_gravity::simulation::states::NVec3;
use planet_gravity::ConfigError;

const SINGLE_PLANET: &str = r#"
parameters:
  fixed_dt: 0.02
  t_end: 1.0
fields:
  - name: planet
    policy: { type: centerpoint }
    origin: [0.0, 0.0, 0.0]
    trigger: { shape: sphere, radius: 20.0 }
bodies:
  - name: player
    x: [0.0, 10.0, 0.0]
"#;

/// Parse and build, panicking on any configuration error
pub fn scenario(yaml: &str) -> Scenario {
    let cfg = ScenarioConfig::from_yaml(yaml).expect("yaml parses");
    Scenario::build(cfg).expect("scenario builds")
}

pub fn build_err(yaml: &str) -> ConfigError {
    let cfg = ScenarioConfig::from_yaml(yaml).expect("yaml parses");
    match Scenario::build(cfg) {
        Ok(_) => panic!("scenario should be rejected"),
        Err(e) => e,
    }
}

// ==================================================================================
// Config parsing tests
// ==================================================================================

#[test]
fn defaults_are_filled_in() {
    let cfg = ScenarioConfig::from_yaml(SINGLE_PLANET).expect("yaml parses");
    assert!(!cfg.engine.allow_free_flight);
    assert!(!cfg.engine.use_gravity_law);
    assert_eq!(cfg.parameters.log_every, 0);

    let field = &cfg.fields[0];
    assert_relative_eq!(field.strength, 9.81);
    assert_relative_eq!(field.mass, 10.0);
    assert_eq!(field.priority, 0);
    assert_relative_eq!(field.delay, 0.0);
    assert!(field.rotation.is_none());
    assert!(matches!(field.policy, PolicyConfig::Centerpoint));
    assert!(matches!(field.trigger, TriggerConfig::Sphere { radius } if radius == 20.0));

    let body = &cfg.bodies[0];
    assert_relative_eq!(body.m, 1.0);
    assert!(body.v.is_none());
    assert!(!body.grounded);
}

#[test]
fn every_policy_tag_parses() {
    let yaml = r#"
parameters: { fixed_dt: 0.02, t_end: 1.0 }
fields:
  - { name: a, policy: { type: centerpoint }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 1 } }
  - { name: b, policy: { type: centerpoint_inverse }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 1 } }
  - { name: c, policy: { type: transform_one_direction, axis: forward }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 1 } }
  - { name: d, policy: { type: one_direction, direction: left }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 1 } }
  - name: e
    policy: { type: simple_mesh, collider: { shape: capsule, a: [0, -1, 0], b: [0, 1, 0], radius: 0.5 } }
    origin: [0, 0, 0]
    trigger: { shape: cuboid, half_extents: [2, 2, 2] }
  - name: f
    policy: { type: low_poly_mesh, mesh: { shape: icosphere, radius: 2.0 }, smoothing_factor: 4.0 }
    origin: [0, 0, 0]
    trigger: { shape: sphere, radius: 5 }
  - name: g
    policy:
      type: high_poly_mesh
      mesh: { shape: triangles, vertices: [[0, 0, 0], [1, 0, 0], [0, 0, -1]], indices: [0, 1, 2] }
    origin: [0, 0, 0]
    trigger: { shape: sphere, radius: 5 }
"#;
    let cfg = ScenarioConfig::from_yaml(yaml).expect("yaml parses");
    assert!(matches!(cfg.fields[2].policy, PolicyConfig::TransformOneDirection { axis: LocalAxis::Forward }));
    assert!(matches!(cfg.fields[3].policy, PolicyConfig::OneDirection { direction: WorldDirection::Left }));
    match &cfg.fields[5].policy {
        PolicyConfig::LowPolyMesh {
            mesh: Some(MeshConfig::Icosphere { subdivisions, .. }),
            threshold_distance,
            smoothing_factor,
            ..
        } => {
            assert_eq!(*subdivisions, 0);
            assert_relative_eq!(*threshold_distance, 0.1);
            assert_relative_eq!(*smoothing_factor, 4.0);
        }
        other => panic!("unexpected policy {:?}", other),
    }

    let s = Scenario::build(cfg).expect("scenario builds");
    let kinds: Vec<PolicyKind> = s.fields.iter().map(|(_, f)| f.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            PolicyKind::Centerpoint,
            PolicyKind::CenterpointInverse,
            PolicyKind::TransformOneDirection,
            PolicyKind::OneDirection,
            PolicyKind::SimpleMesh,
            PolicyKind::LowPolyMesh,
            PolicyKind::HighPolyMesh,
        ]
    );
}

#[test]
fn unknown_policy_is_a_parse_error() {
    let yaml = r#"
parameters: { fixed_dt: 0.02, t_end: 1.0 }
fields:
  - { name: a, policy: { type: wormhole }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 1 } }
"#;
    assert!(matches!(ScenarioConfig::from_yaml(yaml), Err(ConfigError::Parse(_))));
}

#[rstest]
#[case::short_origin(
    "fields: [{ name: a, policy: { type: centerpoint }, origin: [0, 0], trigger: { shape: sphere, radius: 1 } }]",
    "VectorLength"
)]
#[case::zero_radius(
    "fields: [{ name: a, policy: { type: centerpoint }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 0 } }]",
    "NonPositive"
)]
#[case::negative_delay(
    "fields: [{ name: a, policy: { type: centerpoint }, origin: [0, 0, 0], delay: -1, trigger: { shape: sphere, radius: 1 } }]",
    "Negative"
)]
#[case::bad_indices(
    "fields: [{ name: a, policy: { type: high_poly_mesh, mesh: { shape: triangles, vertices: [[0, 0, 0]], indices: [0, 0] } }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 1 } }]",
    "IndexBufferLength"
)]
#[case::massless_body("bodies: [{ name: b, x: [0, 0, 0], m: 0 }]", "NonPositive")]
fn invalid_scenarios_are_rejected(#[case] tail: &str, #[case] expected: &str) {
    let yaml = format!("parameters: {{ fixed_dt: 0.02, t_end: 1.0 }}\n{tail}\n");
    let err = build_err(&yaml);
    assert!(format!("{:?}", err).starts_with(expected), "got {:?}", err);
}

#[test]
fn zero_step_is_rejected() {
    let err = build_err("parameters: { fixed_dt: 0.0, t_end: 1.0 }\n");
    assert!(matches!(err, ConfigError::NonPositive { .. }));
}

#[test]
fn bundled_scenarios_build() {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    for name in ["test_file.yaml", "planetoids.yaml"] {
        let cfg = ScenarioConfig::load(&dir.join(name)).expect("bundled scenario parses");
        let mut s = Scenario::build(cfg).expect("bundled scenario builds");
        for _ in 0..10 {
            s.step();
        }
        for b in &s.bodies {
            assert!(b.body.x.iter().all(|c| c.is_finite()), "{} left the map", b.name);
        }
    }
}

// ==================================================================================
// Driver tests
// ==================================================================================

#[test]
fn body_above_planet_falls_toward_it() {
    let mut s = scenario(SINGLE_PLANET);
    s.step();

    let player = s.body("player").expect("player exists");
    assert_relative_eq!(player.last_acceleration, NVec3::new(0.0, -9.81, 0.0), epsilon = 1e-12);
    assert_relative_eq!(player.controller.gravity_direction(), NVec3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(player.body.v, NVec3::new(0.0, -9.81 * 0.02, 0.0), epsilon = 1e-12);
    assert_relative_eq!(player.body.up(), NVec3::y(), epsilon = 1e-12);
    assert_eq!(player.body.acc, NVec3::zeros());
}

#[test]
fn run_stops_at_end_time() {
    let mut s = scenario(SINGLE_PLANET);
    s.run();
    assert_eq!(s.steps(), 50);
    assert_relative_eq!(s.t, 1.0, epsilon = 1e-9);
}

#[test]
fn leaving_every_trigger_keeps_last_field_by_default() {
    let yaml = r#"
parameters: { fixed_dt: 0.1, t_end: 1.0 }
fields:
  - { name: planet, policy: { type: centerpoint }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 5 } }
bodies:
  - { name: runner, x: [0, 4.5, 0], v: [0, 20, 0] }
"#;
    let mut s = scenario(yaml);
    s.step();
    assert_eq!(s.bodies[0].controller.active_count(), 1);
    s.step();
    // the body is outside the trigger now but still pulled back
    assert!(s.bodies[0].body.x.y > 5.0);
    assert_eq!(s.bodies[0].controller.active_count(), 1);
    assert!(s.bodies[0].last_acceleration.y < 0.0);
}

#[test]
fn free_flight_drops_field_after_exit() {
    let yaml = r#"
engine: { allow_free_flight: true }
parameters: { fixed_dt: 0.1, t_end: 1.0 }
fields:
  - { name: planet, policy: { type: centerpoint }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 5 } }
bodies:
  - { name: runner, x: [0, 4.5, 0], v: [0, 20, 0] }
"#;
    let mut s = scenario(yaml);
    s.step();
    s.step();
    s.step();
    assert_eq!(s.bodies[0].controller.active_count(), 0);
    assert_eq!(s.bodies[0].last_acceleration, NVec3::zeros());
}

#[test]
fn switching_by_distance_keeps_one_field() {
    let yaml = r#"
engine: { switch_fields_by_distance: true }
parameters: { fixed_dt: 0.02, t_end: 1.0 }
fields:
  - { name: west, policy: { type: centerpoint }, origin: [-5, 0, 0], trigger: { shape: sphere, radius: 20 } }
  - { name: east, policy: { type: centerpoint }, origin: [5, 0, 0], trigger: { shape: sphere, radius: 20 } }
bodies:
  - { name: b, x: [2, 0, 0] }
"#;
    let mut s = scenario(yaml);
    s.step();
    let east = s.fields.find("east").expect("east exists");
    assert_eq!(s.bodies[0].controller.active_sources(), vec![east]);
    assert_relative_eq!(s.bodies[0].last_acceleration, NVec3::new(9.81, 0.0, 0.0), epsilon = 1e-12);
}

#[test]
fn switching_by_distance_lets_delayed_field_engage() {
    let yaml = r#"
engine: { switch_fields_by_distance: true }
parameters: { fixed_dt: 0.1, t_end: 5.0 }
fields:
  - { name: west, policy: { type: centerpoint }, origin: [-5, 0, 0], delay: 0.3, trigger: { shape: sphere, radius: 20 } }
  - { name: east, policy: { type: centerpoint }, origin: [5, 0, 0], delay: 0.3, trigger: { shape: sphere, radius: 20 } }
bodies:
  - { name: b, x: [2, 0, 0] }
"#;
    let mut s = scenario(yaml);
    let east = s.fields.find("east").expect("east exists");

    // 0.3 s of delay at 0.1 s steps holds gravity back for three ticks
    for _ in 0..3 {
        s.step();
        assert_eq!(s.bodies[0].last_acceleration, NVec3::zeros());
    }
    // west is offered again every tick and must not restart east's countdown
    for _ in 0..7 {
        s.step();
        assert_eq!(s.bodies[0].controller.active_sources(), vec![east]);
        assert_relative_eq!(s.bodies[0].last_acceleration, NVec3::new(9.81, 0.0, 0.0), epsilon = 1e-12);
    }
}

#[test]
fn high_poly_fields_skip_the_neighbor_graph() {
    let yaml = r#"
parameters: { fixed_dt: 0.02, t_end: 1.0 }
fields:
  - name: dense
    policy: { type: high_poly_mesh, mesh: { shape: icosphere, radius: 4.0, subdivisions: 2 } }
    origin: [0, 0, 0]
    trigger: { shape: sphere, radius: 10 }
  - name: coarse
    policy: { type: low_poly_mesh, mesh: { shape: icosphere, radius: 4.0, subdivisions: 2 } }
    origin: [0, 0, 0]
    trigger: { shape: sphere, radius: 10 }
"#;
    let s = scenario(yaml);
    let dense = s.fields.find("dense").and_then(|id| s.fields.get(id)).expect("dense exists");
    let coarse = s.fields.find("coarse").and_then(|id| s.fields.get(id)).expect("coarse exists");

    let dense_index = dense.index().expect("dense mesh is indexed");
    assert!(!dense_index.is_empty());
    assert!(dense_index.triangles().iter().all(|t| t.neighbors.is_empty()));

    let coarse_index = coarse.index().expect("coarse mesh is indexed");
    assert!(coarse_index.triangles().iter().all(|t| !t.neighbors.is_empty()));
}

#[test]
fn grounded_body_stays_with_its_planet() {
    let yaml = r#"
parameters: { fixed_dt: 0.02, t_end: 1.0 }
fields:
  - { name: planet, policy: { type: centerpoint }, origin: [0, 0, 0], trigger: { shape: sphere, radius: 20 } }
  - { name: moon, policy: { type: one_direction, direction: right }, origin: [0, 10, 0], trigger: { shape: sphere, radius: 20 } }
bodies:
  - { name: b, x: [0, 10, 0], grounded: true }
"#;
    let mut s = scenario(yaml);
    s.step();
    let planet = s.fields.find("planet").expect("planet exists");
    // fields are offered in id order; the first one wins the empty set
    assert_eq!(s.bodies[0].controller.active_sources(), vec![planet]);
    assert_relative_eq!(s.bodies[0].last_acceleration, NVec3::new(0.0, -9.81, 0.0), epsilon = 1e-12);
}
