//! Configuration types for loading gravity scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – scene-wide flags (free flight, gravity law, closest-field switching)
//! - [`ParametersConfig`] – fixed step, end time, logging cadence
//! - [`FieldConfig`]      – one gravity source with its policy and trigger volume
//! - [`BodyConfig`]       – initial state and controller options of a moving body
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! A small scenario matching these types:
//!
//! ```yaml
//! engine:
//!   allow_free_flight: false
//!   use_gravity_law: false
//!   switch_fields_by_distance: false
//!
//! parameters:
//!   fixed_dt: 0.02          # fixed physics step
//!   t_end: 5.0              # total simulated time
//!   log_every: 50           # log bodies every n steps (0 = never)
//!
//! fields:
//!   - name: planet
//!     policy: { type: centerpoint }
//!     origin: [0.0, 0.0, 0.0]
//!     rotation: [0.0, 0.0, 0.0]   # euler angles in degrees, optional
//!     strength: 9.81
//!     priority: 0
//!     trigger: { shape: sphere, radius: 20.0 }
//!   - name: rock
//!     policy:
//!       type: low_poly_mesh
//!       mesh: { shape: icosphere, radius: 4.0, subdivisions: 1 }
//!       smoothing_factor: 8.0
//!     origin: [40.0, 0.0, 0.0]
//!     trigger: { shape: sphere, radius: 10.0 }
//!
//! bodies:
//!   - name: player
//!     x: [0.0, 12.0, 0.0]
//!     m: 1.0
//! ```
//!
//! Omitted optional keys take the defaults of the runtime types. Mesh
//! vertices and colliders are given in the field's local frame.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::simulation::policy::{LocalAxis, WorldDirection};

/// Scene-wide gravity flags
#[derive(Deserialize, Debug, Clone, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub allow_free_flight: bool, // `true` - a body may lose every field and float
    #[serde(default)]
    pub use_gravity_law: bool, // `true` - inverse-square magnitude for non-fixed fields
    #[serde(default)]
    pub switch_fields_by_distance: bool, // `true` - keep only the closest top-priority field
}

/// Numerical parameters of the headless run
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub fixed_dt: f64, // time step size
    pub t_end: f64,    // time end
    #[serde(default)]
    pub log_every: usize, // log body states every n steps
}

/// Shape of a field's overlap volume, centred on the field origin
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum TriggerConfig {
    Sphere { radius: f64 },
    Cuboid { half_extents: Vec<f64> },
}

/// Triangle mesh of a mesh-based policy
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MeshConfig {
    Icosphere {
        radius: f64,
        #[serde(default)]
        subdivisions: u32,
    },
    Cuboid {
        half_extents: Vec<f64>,
    },
    /// Raw buffers: one `[x, y, z]` per vertex, three indices per triangle
    Triangles {
        vertices: Vec<Vec<f64>>,
        indices: Vec<usize>,
    },
}

/// Collider of the simple-mesh policy
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ColliderConfig {
    Sphere {
        #[serde(default)]
        center: Option<Vec<f64>>,
        radius: f64,
    },
    Cuboid {
        #[serde(default)]
        center: Option<Vec<f64>>,
        half_extents: Vec<f64>,
        #[serde(default)]
        rotation: Option<Vec<f64>>, // euler degrees, relative to the field
    },
    Capsule {
        a: Vec<f64>,
        b: Vec<f64>,
        radius: f64,
    },
}

fn default_threshold_distance() -> f64 {
    0.1
}

fn default_smoothing_factor() -> f64 {
    10.0
}

/// Gravity direction law of a field
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    Centerpoint,
    CenterpointInverse,
    TransformOneDirection {
        #[serde(default)]
        axis: LocalAxis,
    },
    OneDirection {
        #[serde(default)]
        direction: WorldDirection,
    },
    SimpleMesh {
        #[serde(default)]
        collider: Option<ColliderConfig>,
    },
    LowPolyMesh {
        #[serde(default)]
        mesh: Option<MeshConfig>,
        #[serde(default = "default_threshold_distance")]
        threshold_distance: f64,
        #[serde(default = "default_threshold_distance")]
        neighbor_threshold_distance: f64,
        #[serde(default = "default_smoothing_factor")]
        smoothing_factor: f64,
    },
    HighPolyMesh {
        #[serde(default)]
        mesh: Option<MeshConfig>,
    },
}

fn default_strength() -> f64 {
    9.81
}

fn default_field_mass() -> f64 {
    10.0
}

/// Configuration of a single gravity source
#[derive(Deserialize, Debug, Clone)]
pub struct FieldConfig {
    pub name: String,
    pub policy: PolicyConfig,
    pub origin: Vec<f64>,
    #[serde(default)]
    pub rotation: Option<Vec<f64>>, // euler angles (x, y, z) in degrees
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default = "default_field_mass")]
    pub mass: f64, // only read by the inverse-square law
    #[serde(default)]
    pub priority: i32, // higher wins
    #[serde(default)]
    pub delay: f64, // seconds before a newly dominant tier applies
    pub trigger: TriggerConfig,
}

fn default_body_mass() -> f64 {
    1.0
}

/// Configuration for a single body's initial state and controller
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub name: String,
    pub x: Vec<f64>, // initial position
    #[serde(default)]
    pub v: Option<Vec<f64>>, // initial velocity, zero when omitted
    #[serde(default = "default_body_mass")]
    pub m: f64,
    #[serde(default)]
    pub rotation_speed: Option<f64>,
    #[serde(default)]
    pub ignore_fields_while_grounded: Option<bool>,
    #[serde(default)]
    pub push_back_strength: Option<f64>,
    #[serde(default)]
    pub grounded: bool, // stands in for the host's ground check
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub bodies: Vec<BodyConfig>,
}

impl ScenarioConfig {
    /// Parse a scenario from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a scenario file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_yaml::from_reader(reader)?)
    }
}
