//! Gravity direction policies.
//!
//! Each policy is its own type implementing [`GravityPolicy`]; a
//! [`crate::simulation::field::GravitySource`] owns exactly one of them,
//! boxed, the same way an acceleration set owns its terms. A policy only
//! answers "which way is down from here"; every direction it returns is a
//! unit vector or zero, and the magnitude is resolved by the controller.

use log::debug;
use serde::Deserialize;

use crate::error::GravityError;
use crate::simulation::collider::SimpleCollider;
use crate::simulation::kd_tree::TriangleKdTree;
use crate::simulation::smoothing::SmoothingState;
use crate::simulation::states::{unit_or_zero, NQuat, NVec3, EPS_LEN};

/// Added to neighbor distances before inverting them into weights.
pub const WEIGHT_EPS: f64 = 0.001;

/// Placement of a gravity source in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFrame {
    pub origin: NVec3,
    pub rotation: NQuat,
}

impl SourceFrame {
    pub fn at(origin: NVec3) -> Self {
        Self {
            origin,
            rotation: NQuat::identity(),
        }
    }
}

/// Inputs of one direction query.
pub struct DirectionQuery<'a> {
    pub position: NVec3, // query position (the body)
    pub dt: f64, // elapsed time since the previous query, for smoothing
    pub smoothing: &'a mut SmoothingState, // caller-owned state
}

/// Enumerated policy kinds, used for magnitude rules and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    Centerpoint,
    CenterpointInverse,
    TransformOneDirection,
    OneDirection,
    SimpleMesh,
    LowPolyMesh,
    HighPolyMesh,
}

impl PolicyKind {
    /// Fixed-direction fields always pull with their flat strength.
    pub fn is_fixed_direction(&self) -> bool {
        matches!(self, PolicyKind::TransformOneDirection | PolicyKind::OneDirection)
    }
}

/// Why a policy could not produce a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyFault {
    MissingMesh,
    MissingCollider,
    EmptyIndex,
}

impl PolicyFault {
    pub fn for_field(self, field: &str) -> GravityError {
        let field = field.to_string();
        match self {
            PolicyFault::MissingMesh => GravityError::MissingMesh { field },
            PolicyFault::MissingCollider => GravityError::MissingCollider { field },
            PolicyFault::EmptyIndex => GravityError::EmptyIndex { field },
        }
    }
}

/// A gravity-direction law.
pub trait GravityPolicy: std::fmt::Debug {
    fn kind(&self) -> PolicyKind;

    /// Unit gravity direction at `query.position`, or zero when undefined.
    fn direction(&self, frame: &SourceFrame, query: &mut DirectionQuery<'_>) -> Result<NVec3, PolicyFault>;

    /// Triangle index of mesh policies.
    fn index(&self) -> Option<&TriangleKdTree> {
        None
    }
}

// =========================================================================================
// point laws
// =========================================================================================

/// Pulls toward the source origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Centerpoint;

impl GravityPolicy for Centerpoint {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Centerpoint
    }

    fn direction(&self, frame: &SourceFrame, query: &mut DirectionQuery<'_>) -> Result<NVec3, PolicyFault> {
        Ok(unit_or_zero(&(frame.origin - query.position)))
    }
}

/// Pushes away from the source origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct CenterpointInverse;

impl GravityPolicy for CenterpointInverse {
    fn kind(&self) -> PolicyKind {
        PolicyKind::CenterpointInverse
    }

    fn direction(&self, frame: &SourceFrame, query: &mut DirectionQuery<'_>) -> Result<NVec3, PolicyFault> {
        Ok(unit_or_zero(&(query.position - frame.origin)))
    }
}

// =========================================================================================
// fixed directions
// =========================================================================================

/// One of the six axes of the source's local frame.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocalAxis {
    Up,
    #[default]
    Down,
    Right,
    Left,
    Forward,
    Back,
}

impl LocalAxis {
    pub fn vector(&self) -> NVec3 {
        match self {
            LocalAxis::Up => NVec3::y(),
            LocalAxis::Down => -NVec3::y(),
            LocalAxis::Right => NVec3::x(),
            LocalAxis::Left => -NVec3::x(),
            LocalAxis::Forward => NVec3::z(),
            LocalAxis::Back => -NVec3::z(),
        }
    }
}

/// Pulls along a local axis of the source, following its rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformOneDirection {
    pub axis: LocalAxis,
}

impl GravityPolicy for TransformOneDirection {
    fn kind(&self) -> PolicyKind {
        PolicyKind::TransformOneDirection
    }

    fn direction(&self, frame: &SourceFrame, _query: &mut DirectionQuery<'_>) -> Result<NVec3, PolicyFault> {
        Ok(unit_or_zero(&(frame.rotation * self.axis.vector())))
    }
}

/// A world axis; left is -x and forward is +z.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorldDirection {
    #[default]
    Down,
    Up,
    Left,
    Right,
    Forward,
    Backward,
}

impl WorldDirection {
    pub fn vector(&self) -> NVec3 {
        match self {
            WorldDirection::Down => -NVec3::y(),
            WorldDirection::Up => NVec3::y(),
            WorldDirection::Left => -NVec3::x(),
            WorldDirection::Right => NVec3::x(),
            WorldDirection::Forward => NVec3::z(),
            WorldDirection::Backward => -NVec3::z(),
        }
    }
}

/// Pulls along a fixed world axis, ignoring position and source rotation.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneDirection {
    pub direction: WorldDirection,
}

impl GravityPolicy for OneDirection {
    fn kind(&self) -> PolicyKind {
        PolicyKind::OneDirection
    }

    fn direction(&self, _frame: &SourceFrame, _query: &mut DirectionQuery<'_>) -> Result<NVec3, PolicyFault> {
        Ok(self.direction.vector())
    }
}

// =========================================================================================
// surfaces
// =========================================================================================

/// Pulls toward the closest point of a simple collider.
#[derive(Debug, Clone, Default)]
pub struct SimpleMesh {
    pub collider: Option<SimpleCollider>, // world space
}

impl GravityPolicy for SimpleMesh {
    fn kind(&self) -> PolicyKind {
        PolicyKind::SimpleMesh
    }

    fn direction(&self, _frame: &SourceFrame, query: &mut DirectionQuery<'_>) -> Result<NVec3, PolicyFault> {
        let collider = self.collider.as_ref().ok_or(PolicyFault::MissingCollider)?;
        let closest = collider.closest_point(&query.position);
        Ok(unit_or_zero(&(closest - query.position)))
    }
}

/// Inverse normal of the nearest triangle of a dense mesh, unsmoothed.
#[derive(Debug, Clone, Default)]
pub struct HighPolyMesh {
    pub index: Option<TriangleKdTree>,
}

impl GravityPolicy for HighPolyMesh {
    fn kind(&self) -> PolicyKind {
        PolicyKind::HighPolyMesh
    }

    fn direction(&self, _frame: &SourceFrame, query: &mut DirectionQuery<'_>) -> Result<NVec3, PolicyFault> {
        let index = self.index.as_ref().ok_or(PolicyFault::MissingMesh)?;
        let nearest = index.nearest(&query.position).ok_or(PolicyFault::EmptyIndex)?;
        Ok(-index.triangle(nearest).normal)
    }

    fn index(&self) -> Option<&TriangleKdTree> {
        self.index.as_ref()
    }
}

/// Smoothed, neighbor-interpolated inverse normal for coarse meshes.
///
/// Crossing from one big triangle to the next would flip the direction in a
/// single step. Instead the normals of the nearest triangle's neighbors are
/// blended by inverse distance, and the result is low-pass filtered against
/// the previous query's direction. The filter factor is
/// `clamp01(dt * smoothing_factor)`, so it depends on the step length.
#[derive(Debug, Clone)]
pub struct LowPolyMesh {
    pub index: Option<TriangleKdTree>,
    pub threshold_distance: f64, // re-resolve once this far from the cached centroid
    pub neighbor_threshold_distance: f64, // or this close to a neighbor's centroid
    pub smoothing_factor: f64,
}

impl Default for LowPolyMesh {
    fn default() -> Self {
        Self {
            index: None,
            threshold_distance: 0.1,
            neighbor_threshold_distance: 0.1,
            smoothing_factor: 10.0,
        }
    }
}

impl LowPolyMesh {
    pub fn new(index: Option<TriangleKdTree>) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    fn needs_update(&self, index: &TriangleKdTree, state: &SmoothingState, p: &NVec3) -> bool {
        // a cached id from another mesh counts as stale
        let Some(current) = state.current.and_then(|id| index.get(id)) else {
            return true;
        };
        if (p - state.current_center).norm() > self.threshold_distance {
            return true;
        }
        current
            .neighbors
            .iter()
            .filter_map(|&n| index.get(n))
            .any(|n| (p - n.centroid()).norm() < self.neighbor_threshold_distance)
    }
}

impl GravityPolicy for LowPolyMesh {
    fn kind(&self) -> PolicyKind {
        PolicyKind::LowPolyMesh
    }

    fn direction(&self, _frame: &SourceFrame, query: &mut DirectionQuery<'_>) -> Result<NVec3, PolicyFault> {
        let index = self.index.as_ref().ok_or(PolicyFault::MissingMesh)?;
        let p = query.position;
        let state = &mut *query.smoothing;

        if self.needs_update(index, state, &p) {
            let nearest = index.nearest(&p).ok_or(PolicyFault::EmptyIndex)?;
            state.current = Some(nearest);
            state.current_center = index.triangle(nearest).centroid();
        }
        let current = state
            .current
            .and_then(|id| index.get(id))
            .ok_or(PolicyFault::EmptyIndex)?;
        state.sync_neighbors(&current.neighbors);

        let mut blended = NVec3::zeros();
        let mut total_weight = 0.0;
        for neighbor in state.neighbors.iter().filter_map(|&n| index.get(n)) {
            let weight = 1.0 / ((p - neighbor.centroid()).norm() + WEIGHT_EPS);
            blended += neighbor.normal * weight;
            total_weight += weight;
        }

        let averaged = if total_weight > 0.0 {
            blended / total_weight
        } else {
            debug!("no neighbors around nearest triangle, using its own normal");
            current.normal
        };
        // opposing neighbor normals can cancel out
        let target = -(averaged.try_normalize(EPS_LEN).unwrap_or(current.normal));

        let previous = *state.previous.get_or_insert(target);
        let t = (query.dt * self.smoothing_factor).clamp(0.0, 1.0);
        let result = previous.lerp(&target, t).try_normalize(EPS_LEN).unwrap_or(target);
        state.previous = Some(result);

        Ok(result)
    }

    fn index(&self) -> Option<&TriangleKdTree> {
        self.index.as_ref()
    }
}
