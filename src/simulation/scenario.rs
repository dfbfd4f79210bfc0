//! Build fully-initialized gravity scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces the runtime bundle
//! (`Scenario`) containing:
//! - engine settings (`Engine`)
//! - numerical parameters (`Parameters`)
//! - the gravity sources (`GravityFields`), mesh indices built up front
//! - every body with its own controller at t = 0
//!
//! `Scenario::step` plays the host engine's part: it detects trigger
//! overlaps, forwards them to the controllers, resolves gravity, turns the
//! bodies and integrates them

use hashbrown::HashSet;
use log::{debug, info, warn};

use crate::configuration::config::{
    BodyConfig, ColliderConfig, FieldConfig, MeshConfig, PolicyConfig, ScenarioConfig, TriggerConfig,
};
use crate::error::ConfigError;
use crate::simulation::collider::{SimpleCollider, TriggerVolume};
use crate::simulation::controller::{ControllerSettings, GravityController};
use crate::simulation::engine::Engine;
use crate::simulation::field::{GravityFields, GravitySource, SourceId};
use crate::simulation::integrator::integrate_body;
use crate::simulation::kd_tree::{NeighborLinking, TriangleKdTree};
use crate::simulation::mesh::TriangleMesh;
use crate::simulation::params::Parameters;
use crate::simulation::policy::{
    Centerpoint, CenterpointInverse, GravityPolicy, HighPolyMesh, LowPolyMesh, OneDirection, SimpleMesh,
    TransformOneDirection,
};
use crate::simulation::states::{NQuat, NVec3, RigidBody};

/// One moving body and everything the driver tracks for it
#[derive(Debug, Clone)]
pub struct BodyState {
    pub name: String,
    pub body: RigidBody,
    pub controller: GravityController,
    pub overlapping: HashSet<SourceId>, // trigger volumes containing the body last step
    pub grounded: bool,
    pub last_acceleration: NVec3, // gravity applied in the last step
}

/// A fully-initialized scene: sources, bodies and the clock
#[derive(Debug)]
pub struct Scenario {
    pub engine: Engine,
    pub parameters: Parameters,
    pub fields: GravityFields,
    pub bodies: Vec<BodyState>,
    pub t: f64,
    steps: usize,
}

impl Scenario {
    pub fn build(cfg: ScenarioConfig) -> Result<Self, ConfigError> {
        // Engine (runtime) from EngineConfig
        let engine = Engine {
            allow_free_flight: cfg.engine.allow_free_flight,
            use_gravity_law: cfg.engine.use_gravity_law,
            switch_fields_by_distance: cfg.engine.switch_fields_by_distance,
        };

        // Parameters (runtime) from ParametersConfig
        let p_cfg = cfg.parameters;
        positive("parameters.fixed_dt", p_cfg.fixed_dt)?;
        non_negative("parameters.t_end", p_cfg.t_end)?;
        let parameters = Parameters {
            fixed_dt: p_cfg.fixed_dt,
            t_end: p_cfg.t_end,
            log_every: p_cfg.log_every,
        };

        // Fields: policies, meshes and trigger volumes
        let mut fields = GravityFields::new();
        for fc in &cfg.fields {
            fields.insert(build_field(fc)?);
        }

        // Bodies: map `BodyConfig` -> runtime body + controller
        let bodies = cfg
            .bodies
            .iter()
            .map(|bc| build_body(bc, &engine))
            .collect::<Result<Vec<_>, _>>()?;

        info!("scenario ready: {} field(s), {} body(ies)", fields.len(), bodies.len());

        Ok(Self {
            engine,
            parameters,
            fields,
            bodies,
            t: 0.0,
            steps: 0,
        })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn body(&self, name: &str) -> Option<&BodyState> {
        self.bodies.iter().find(|b| b.name == name)
    }

    /// Advance every body by one fixed step.
    pub fn step(&mut self) {
        let dt = self.parameters.fixed_dt;

        for b in self.bodies.iter_mut() {
            let now: HashSet<SourceId> = self
                .fields
                .iter()
                .filter(|(_, s)| s.overlaps(&b.body.x))
                .map(|(id, _)| id)
                .collect();

            // Trigger exit first, then begin/stay for everything still overlapping
            let mut ended: Vec<SourceId> = b.overlapping.difference(&now).copied().collect();
            ended.sort();
            for id in ended {
                b.controller.on_overlap_end(&self.fields, id, &b.body);
            }

            let mut current: Vec<SourceId> = now.iter().copied().collect();
            current.sort();
            for id in current {
                b.controller.on_overlap_begin(&self.fields, id, &b.body, b.grounded);
            }
            b.overlapping = now;

            if self.engine.switch_fields_by_distance {
                b.controller.snap_to_closest_source(&self.fields, &b.body);
            }

            b.last_acceleration = b.controller.apply_gravitation(&self.fields, &mut b.body, dt);
            b.controller.rotate_to_planet(&mut b.body, dt);
            integrate_body(&mut b.body, dt);
        }

        self.t += dt;
        self.steps += 1;
    }

    /// Step until `t_end`, logging body states every `log_every` steps.
    pub fn run(&mut self) {
        // half a step of slack so accumulated rounding never adds a step
        while self.t + 0.5 * self.parameters.fixed_dt < self.parameters.t_end {
            self.step();

            let every = self.parameters.log_every;
            if every > 0 && self.steps % every == 0 {
                self.log_bodies();
            }
        }
        info!("finished {} step(s) at t = {:.3}", self.steps, self.t);
        self.log_bodies();
    }

    fn log_bodies(&self) {
        for b in &self.bodies {
            let g = b.controller.gravity_direction();
            info!(
                "t = {:7.3} {:>10}: x = ({:8.3}, {:8.3}, {:8.3}) g = ({:6.3}, {:6.3}, {:6.3}) fields = {}",
                self.t,
                b.name,
                b.body.x.x,
                b.body.x.y,
                b.body.x.z,
                g.x,
                g.y,
                g.z,
                b.controller.active_count(),
            );
        }
    }
}

// helpers ================================================================================

fn positive(what: &str, value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive {
            what: what.to_string(),
            value,
        })
    }
}

fn non_negative(what: &str, value: f64) -> Result<f64, ConfigError> {
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::Negative {
            what: what.to_string(),
            value,
        })
    }
}

/// `[x, y, z]` -> vector
fn vec3(what: &str, v: &[f64]) -> Result<NVec3, ConfigError> {
    match v {
        [x, y, z] => Ok(NVec3::new(*x, *y, *z)),
        _ => Err(ConfigError::VectorLength {
            what: what.to_string(),
            expected: 3,
            got: v.len(),
        }),
    }
}

/// Euler angles about x, y, z in degrees -> rotation, identity when omitted
fn rotation(what: &str, degrees: Option<&Vec<f64>>) -> Result<NQuat, ConfigError> {
    let Some(d) = degrees else {
        return Ok(NQuat::identity());
    };
    let r = vec3(what, d)?;
    Ok(NQuat::from_euler_angles(
        r.x.to_radians(),
        r.y.to_radians(),
        r.z.to_radians(),
    ))
}

fn build_trigger(field: &str, cfg: &TriggerConfig) -> Result<TriggerVolume, ConfigError> {
    match cfg {
        TriggerConfig::Sphere { radius } => Ok(TriggerVolume::Sphere {
            radius: positive(&format!("field `{field}` trigger radius"), *radius)?,
        }),
        TriggerConfig::Cuboid { half_extents } => {
            let h = vec3(&format!("field `{field}` trigger half_extents"), half_extents)?;
            positive(&format!("field `{field}` trigger half_extents"), h.min())?;
            Ok(TriggerVolume::Cuboid { half_extents: h })
        }
    }
}

fn build_mesh(field: &str, cfg: &MeshConfig) -> Result<TriangleMesh, ConfigError> {
    match cfg {
        MeshConfig::Icosphere { radius, subdivisions } => {
            let radius = positive(&format!("field `{field}` icosphere radius"), *radius)?;
            Ok(TriangleMesh::icosphere(radius, *subdivisions))
        }
        MeshConfig::Cuboid { half_extents } => {
            let h = vec3(&format!("field `{field}` mesh half_extents"), half_extents)?;
            positive(&format!("field `{field}` mesh half_extents"), h.min())?;
            Ok(TriangleMesh::cuboid(h))
        }
        MeshConfig::Triangles { vertices, indices } => {
            let vertices = vertices
                .iter()
                .enumerate()
                .map(|(i, v)| vec3(&format!("field `{field}` vertex {i}"), v))
                .collect::<Result<Vec<_>, _>>()?;
            TriangleMesh::from_buffers(field, vertices, indices)
        }
    }
}

fn build_collider(field: &str, cfg: &ColliderConfig) -> Result<SimpleCollider, ConfigError> {
    let center = |c: &Option<Vec<f64>>| match c {
        Some(c) => vec3(&format!("field `{field}` collider center"), c),
        None => Ok(NVec3::zeros()),
    };
    match cfg {
        ColliderConfig::Sphere { center: c, radius } => Ok(SimpleCollider::Sphere {
            center: center(c)?,
            radius: non_negative(&format!("field `{field}` collider radius"), *radius)?,
        }),
        ColliderConfig::Cuboid {
            center: c,
            half_extents,
            rotation: r,
        } => Ok(SimpleCollider::Cuboid {
            center: center(c)?,
            half_extents: vec3(&format!("field `{field}` collider half_extents"), half_extents)?,
            rotation: rotation(&format!("field `{field}` collider rotation"), r.as_ref())?,
        }),
        ColliderConfig::Capsule { a, b, radius } => Ok(SimpleCollider::Capsule {
            a: vec3(&format!("field `{field}` capsule a"), a)?,
            b: vec3(&format!("field `{field}` capsule b"), b)?,
            radius: non_negative(&format!("field `{field}` collider radius"), *radius)?,
        }),
    }
}

/// Spatial index over the mesh, placed in the field's frame
fn build_index(
    field: &str,
    mesh: &Option<MeshConfig>,
    origin: &NVec3,
    rot: &NQuat,
    linking: NeighborLinking,
) -> Result<Option<TriangleKdTree>, ConfigError> {
    let Some(mesh) = mesh else {
        warn!("field `{}` uses a mesh policy without a mesh", field);
        return Ok(None);
    };
    let mesh = build_mesh(field, mesh)?;
    let index = TriangleKdTree::build(&mesh.world_triangles(origin, rot), linking);
    info!(
        "field `{}`: indexed {} triangle(s), depth {}",
        field,
        index.len(),
        index.depth()
    );
    Ok(Some(index))
}

fn build_policy(
    fc: &FieldConfig,
    origin: &NVec3,
    rot: &NQuat,
) -> Result<Box<dyn GravityPolicy + Send + Sync>, ConfigError> {
    let field = fc.name.as_str();
    let policy: Box<dyn GravityPolicy + Send + Sync> = match &fc.policy {
        PolicyConfig::Centerpoint => Box::new(Centerpoint),
        PolicyConfig::CenterpointInverse => Box::new(CenterpointInverse),
        PolicyConfig::TransformOneDirection { axis } => Box::new(TransformOneDirection { axis: *axis }),
        PolicyConfig::OneDirection { direction } => Box::new(OneDirection {
            direction: *direction,
        }),
        PolicyConfig::SimpleMesh { collider } => {
            let collider = match collider {
                Some(c) => Some(build_collider(field, c)?.to_world(origin, rot)),
                None => {
                    warn!("field `{}` uses the simple-mesh policy without a collider", field);
                    None
                }
            };
            Box::new(SimpleMesh { collider })
        }
        PolicyConfig::LowPolyMesh {
            mesh,
            threshold_distance,
            neighbor_threshold_distance,
            smoothing_factor,
        } => Box::new(LowPolyMesh {
            index: build_index(field, mesh, origin, rot, NeighborLinking::default())?,
            threshold_distance: non_negative(&format!("field `{field}` threshold_distance"), *threshold_distance)?,
            neighbor_threshold_distance: non_negative(
                &format!("field `{field}` neighbor_threshold_distance"),
                *neighbor_threshold_distance,
            )?,
            smoothing_factor: non_negative(&format!("field `{field}` smoothing_factor"), *smoothing_factor)?,
        }),
        // dense meshes are never smoothed, so they skip the neighbor graph
        PolicyConfig::HighPolyMesh { mesh } => Box::new(HighPolyMesh {
            index: build_index(field, mesh, origin, rot, NeighborLinking::Skip)?,
        }),
    };
    Ok(policy)
}

fn build_field(fc: &FieldConfig) -> Result<GravitySource, ConfigError> {
    let field = fc.name.as_str();
    let origin = vec3(&format!("field `{field}` origin"), &fc.origin)?;
    let rot = rotation(&format!("field `{field}` rotation"), fc.rotation.as_ref())?;
    let trigger = build_trigger(field, &fc.trigger)?;
    let policy = build_policy(fc, &origin, &rot)?;
    let delay = non_negative(&format!("field `{field}` delay"), fc.delay)?;

    let source = GravitySource::with_boxed_policy(field, origin, trigger, policy)
        .with_rotation(rot)
        .with_strength(fc.strength)
        .with_mass(fc.mass)
        .with_priority(fc.priority)
        .with_delay(delay);
    debug!(
        "field `{}`: {:?}, priority {}, radius {:.3}",
        field,
        source.kind(),
        source.priority,
        source.radius()
    );
    Ok(source)
}

fn build_body(bc: &BodyConfig, engine: &Engine) -> Result<BodyState, ConfigError> {
    let name = bc.name.as_str();
    let x = vec3(&format!("body `{name}` x"), &bc.x)?;
    let m = positive(&format!("body `{name}` m"), bc.m)?;
    let mut body = RigidBody::new(x, m);
    if let Some(v) = &bc.v {
        body.v = vec3(&format!("body `{name}` v"), v)?;
    }

    let mut settings = ControllerSettings::from_engine(engine);
    if let Some(speed) = bc.rotation_speed {
        settings.rotation_speed = non_negative(&format!("body `{name}` rotation_speed"), speed)?;
    }
    if let Some(gate) = bc.ignore_fields_while_grounded {
        settings.ignore_fields_while_grounded = gate;
    }
    settings.push_back_strength = bc.push_back_strength;

    Ok(BodyState {
        name: bc.name.clone(),
        body,
        controller: GravityController::new(settings),
        overlapping: HashSet::new(),
        grounded: bc.grounded,
        last_acceleration: NVec3::zeros(),
    })
}
