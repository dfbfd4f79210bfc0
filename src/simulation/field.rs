//! Gravity sources ("fields") and the collection bodies resolve against.
//!
//! A [`GravitySource`] is static configuration plus one direction policy.
//! It holds no per-body state, so one source can be read by any number of
//! bodies (and threads) at once; the per-body parts live in
//! [`crate::simulation::smoothing`].

use log::error;

use crate::error::GravityError;
use crate::simulation::collider::TriggerVolume;
use crate::simulation::kd_tree::TriangleKdTree;
use crate::simulation::policy::{DirectionQuery, GravityPolicy, PolicyKind, SourceFrame};
use crate::simulation::smoothing::SmoothingState;
use crate::simulation::states::{NQuat, NVec3};

/// Identity of a source within its [`GravityFields`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub usize);

/// A named region of space imposing a pull or push.
#[derive(Debug)]
pub struct GravitySource {
    pub name: String,
    pub strength: f64, // acceleration, or inverse-square scale
    pub mass: f64, // only used by the inverse-square law
    pub priority: i32, // higher wins
    pub delay: f64, // seconds before a newly dominant tier contributes
    frame: SourceFrame,
    trigger: TriggerVolume,
    radius: f64, // |trigger bounds extents|
    policy: Box<dyn GravityPolicy + Send + Sync>,
}

impl GravitySource {
    /// Source with default strength 9.81, mass 10, priority 0 and no delay.
    pub fn new(
        name: impl Into<String>,
        origin: NVec3,
        trigger: TriggerVolume,
        policy: impl GravityPolicy + Send + Sync + 'static,
    ) -> Self {
        Self::with_boxed_policy(name, origin, trigger, Box::new(policy))
    }

    /// Like [`GravitySource::new`] for a policy chosen at runtime.
    pub fn with_boxed_policy(
        name: impl Into<String>,
        origin: NVec3,
        trigger: TriggerVolume,
        policy: Box<dyn GravityPolicy + Send + Sync>,
    ) -> Self {
        let frame = SourceFrame::at(origin);
        let radius = trigger.extent_radius(&frame.rotation);
        Self {
            name: name.into(),
            strength: 9.81,
            mass: 10.0,
            priority: 0,
            delay: 0.0,
            frame,
            trigger,
            radius,
            policy,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_rotation(mut self, rotation: NQuat) -> Self {
        self.frame.rotation = rotation;
        self.radius = self.trigger.extent_radius(&rotation);
        self
    }

    pub fn kind(&self) -> PolicyKind {
        self.policy.kind()
    }

    /// Triangle index of a mesh policy, if it has one.
    pub fn index(&self) -> Option<&TriangleKdTree> {
        self.policy.index()
    }

    pub fn frame(&self) -> &SourceFrame {
        &self.frame
    }

    pub fn origin(&self) -> NVec3 {
        self.frame.origin
    }

    pub fn trigger(&self) -> &TriggerVolume {
        &self.trigger
    }

    /// Authoritative extent of the field.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn distance_to(&self, p: &NVec3) -> f64 {
        (p - self.frame.origin).norm()
    }

    /// Whether `p` lies inside this field's trigger volume.
    pub fn overlaps(&self, p: &NVec3) -> bool {
        self.trigger.contains(&self.frame.origin, &self.frame.rotation, p)
    }

    /// Gravity direction at `position`, failing on misconfiguration.
    pub fn try_gravity_direction(
        &self,
        position: &NVec3,
        smoothing: &mut SmoothingState,
        dt: f64,
    ) -> Result<NVec3, GravityError> {
        let mut query = DirectionQuery {
            position: *position,
            dt,
            smoothing,
        };
        self.policy
            .direction(&self.frame, &mut query)
            .map_err(|fault| fault.for_field(&self.name))
    }

    /// Unit gravity direction at `position`, or zero.
    ///
    /// `smoothing` is the caller's state for this source; only the low-poly
    /// mesh policy reads or writes it. Configuration problems are logged and
    /// yield the zero vector for this query.
    pub fn calculate_gravity_direction(&self, position: &NVec3, smoothing: &mut SmoothingState, dt: f64) -> NVec3 {
        match self.try_gravity_direction(position, smoothing, dt) {
            Ok(direction) => direction,
            Err(e) => {
                error!("{}", e);
                NVec3::zeros()
            }
        }
    }
}

/// All gravity sources of a scene, addressed by [`SourceId`].
#[derive(Debug, Default)]
pub struct GravityFields {
    sources: Vec<GravitySource>,
}

impl GravityFields {
    pub fn new() -> Self {
        Self { sources: Vec::new() }
    }

    /// Add a source (builder style)
    pub fn with(mut self, source: GravitySource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn insert(&mut self, source: GravitySource) -> SourceId {
        self.sources.push(source);
        SourceId(self.sources.len() - 1)
    }

    pub fn get(&self, id: SourceId) -> Option<&GravitySource> {
        self.sources.get(id.0)
    }

    /// Look up a source, reporting unknown ids as errors.
    pub fn source(&self, id: SourceId) -> Result<&GravitySource, GravityError> {
        self.get(id).ok_or(GravityError::UnknownSource(id.0))
    }

    pub fn find(&self, name: &str) -> Option<SourceId> {
        self.sources.iter().position(|s| s.name == name).map(SourceId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &GravitySource)> {
        self.sources.iter().enumerate().map(|(i, s)| (SourceId(i), s))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
