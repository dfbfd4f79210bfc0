pub mod simulation;
pub mod configuration;
pub mod benchmark;
pub mod error;
pub mod logging;

pub use simulation::states::{unit_or_zero, NQuat, NVec3, RigidBody};
pub use simulation::triangle::{Aabb, Triangle, TriangleId};
pub use simulation::mesh::TriangleMesh;
pub use simulation::kd_tree::{NearestMetric, NeighborLinking, TriangleKdTree, DEFAULT_WELD_TOLERANCE};
pub use simulation::collider::{SimpleCollider, TriggerVolume};
pub use simulation::smoothing::{DelayTimer, SmoothingState};
pub use simulation::policy::{
    Centerpoint, CenterpointInverse, GravityPolicy, HighPolyMesh, LocalAxis, LowPolyMesh, OneDirection, PolicyKind,
    SimpleMesh, SourceFrame, TransformOneDirection, WorldDirection,
};
pub use simulation::field::{GravityFields, GravitySource, SourceId};
pub use simulation::controller::{ControllerSettings, GravityController, FAR_FIELD_SLACK};
pub use simulation::engine::Engine;
pub use simulation::params::Parameters;
pub use simulation::integrator::integrate_body;
pub use simulation::scenario::{BodyState, Scenario};

pub use configuration::config::{
    BodyConfig, ColliderConfig, EngineConfig, FieldConfig, MeshConfig, ParametersConfig, PolicyConfig, ScenarioConfig,
    TriggerConfig,
};

pub use error::{ConfigError, GravityError};

pub use benchmark::benchmark::{bench_apply_gravitation, bench_nearest_triangle};
