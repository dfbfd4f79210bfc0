//! Core state types shared by the gravity core.
//!
//! Defines the vector aliases and the rigid-body state a controller acts on:
//! - `NVec3` / `NQuat` nalgebra aliases
//! - `RigidBody` position, velocity, mass, orientation and the per-tick
//!   acceleration accumulator

use nalgebra::{UnitQuaternion, Vector3};
pub type NVec3 = Vector3<f64>;
pub type NQuat = UnitQuaternion<f64>;

/// Threshold below which a vector is treated as zero-length.
pub const EPS_LEN: f64 = 1e-9;

/// Normalize `v`, or return the zero vector when it has no usable direction.
pub fn unit_or_zero(v: &NVec3) -> NVec3 {
    if !v.iter().all(|c| c.is_finite()) {
        return NVec3::zeros();
    }
    v.try_normalize(EPS_LEN).unwrap_or_else(NVec3::zeros)
}

/// Rigid motion state of a moving body, as seen by the gravity controller.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub x: NVec3, // position
    pub v: NVec3, // velocity
    pub m: f64, // mass
    pub orientation: NQuat, // local -> world rotation
    pub acc: NVec3, // acceleration accumulated this tick
}

impl RigidBody {
    pub fn new(x: NVec3, m: f64) -> Self {
        Self {
            x,
            v: NVec3::zeros(),
            m,
            orientation: NQuat::identity(),
            acc: NVec3::zeros(),
        }
    }

    /// Local +Y axis in world space.
    pub fn up(&self) -> NVec3 {
        self.orientation * NVec3::y()
    }

    /// Add an acceleration for this tick (mass independent).
    pub fn add_acceleration(&mut self, a: NVec3) {
        self.acc += a;
    }
}
