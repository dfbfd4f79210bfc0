//! Per-body gravity resolution.
//!
//! A [`GravityController`] tracks which sources currently affect its body,
//! arbitrates between them by priority, composes the gravity acceleration
//! and turns the body so its up axis stands against gravity.
//!
//! Every tick the host calls, in order:
//! 1. `on_overlap_begin` / `on_overlap_end` for trigger events,
//! 2. `apply_gravitation` to add this tick's acceleration,
//! 3. `rotate_to_planet` to align the body.

use std::f64::consts::PI;

use log::{debug, error};
use nalgebra::Unit;

use crate::simulation::engine::Engine;
use crate::simulation::field::{GravityFields, GravitySource, SourceId};
use crate::simulation::smoothing::{DelayTimer, SmoothingState};
use crate::simulation::states::{unit_or_zero, NQuat, NVec3, RigidBody, EPS_LEN};

/// Distance beyond a field's radius at which inverse-square falloff stops.
pub const FAR_FIELD_SLACK: f64 = 5.0;

/// Per-body controller configuration.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub rotation_speed: f64, // slerp rate toward the upright orientation
    pub use_gravity_law: bool, // inverse-square magnitude for non-fixed fields
    pub allow_free_flight: bool, // false = the active set never empties once engaged
    pub ignore_fields_while_grounded: bool, // grounded bodies skip incidental fields
    pub push_back_strength: Option<f64>, // far-field magnitude, None = field strength
    pub far_field_slack: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            rotation_speed: 10.0,
            use_gravity_law: false,
            allow_free_flight: false,
            ignore_fields_while_grounded: true,
            push_back_strength: None,
            far_field_slack: FAR_FIELD_SLACK,
        }
    }
}

impl ControllerSettings {
    /// Settings carrying the scene flags of `engine`.
    pub fn from_engine(engine: &Engine) -> Self {
        Self {
            use_gravity_law: engine.use_gravity_law,
            allow_free_flight: engine.allow_free_flight,
            ..Self::default()
        }
    }

    /// Magnitude of `source`'s pull on `body`.
    ///
    /// Fixed-direction fields use their flat strength. Other fields use the
    /// inverse-square law when enabled, but fall back to the push-back value
    /// once the body is past `radius + far_field_slack` so a drifting body is
    /// never left without a pull.
    pub fn magnitude(&self, source: &GravitySource, body: &RigidBody) -> f64 {
        if source.kind().is_fixed_direction() {
            return source.strength;
        }

        let distance = source.distance_to(&body.x);
        if distance > source.radius() + self.far_field_slack {
            return self.push_back_strength.unwrap_or(source.strength);
        }
        if self.use_gravity_law && distance > EPS_LEN {
            source.strength * (body.m * source.mass) / (distance * distance)
        } else {
            source.strength
        }
    }
}

/// Membership record of one active source, with this body's state for it.
#[derive(Debug, Clone)]
struct ActiveField {
    id: SourceId,
    delay: DelayTimer,
    smoothing: SmoothingState,
}

impl ActiveField {
    fn new(id: SourceId, source: &GravitySource) -> Self {
        let mut delay = DelayTimer::new();
        delay.reset(source.delay);
        Self {
            id,
            delay,
            smoothing: SmoothingState::new(),
        }
    }
}

/// Gravity resolution for one moving body.
#[derive(Debug, Clone)]
pub struct GravityController {
    settings: ControllerSettings,
    active: Vec<ActiveField>, // unique ids
    last_applied_priority: Option<i32>,
    snapped: Option<SourceId>, // survivor of the last distance switch
    direction: NVec3, // unit or zero
}

impl GravityController {
    pub fn new(settings: ControllerSettings) -> Self {
        Self {
            settings,
            active: Vec::new(),
            last_applied_priority: None,
            snapped: None,
            direction: NVec3::zeros(),
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Last resolved gravity direction (unit, or zero with no active field).
    pub fn gravity_direction(&self) -> NVec3 {
        self.direction
    }

    pub fn active_sources(&self) -> Vec<SourceId> {
        self.active.iter().map(|a| a.id).collect()
    }

    pub fn is_active(&self, id: SourceId) -> bool {
        self.active.iter().any(|a| a.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// This body's delay timer for an active source.
    pub fn delay_timer(&self, id: SourceId) -> Option<DelayTimer> {
        self.active.iter().find(|a| a.id == id).map(|a| a.delay)
    }

    /// This body's smoothing state for an active source.
    pub fn smoothing_state(&self, id: SourceId) -> Option<&SmoothingState> {
        self.active.iter().find(|a| a.id == id).map(|a| &a.smoothing)
    }

    /// Highest priority among the active sources.
    pub fn highest_priority(&self, fields: &GravityFields) -> Option<i32> {
        self.active
            .iter()
            .filter_map(|a| fields.get(a.id))
            .map(|s| s.priority)
            .max()
    }

    /// Active sources tied at the highest priority.
    pub fn highest_priority_sources(&self, fields: &GravityFields) -> Vec<SourceId> {
        let Some(top) = self.highest_priority(fields) else {
            return Vec::new();
        };
        self.active
            .iter()
            .filter(|a| fields.get(a.id).is_some_and(|s| s.priority == top))
            .map(|a| a.id)
            .collect()
    }

    // overlap events ========================================================================

    /// The body's trigger volume overlaps source `id` (begin or stay).
    ///
    /// The source joins the active set unless the body is grounded (and the
    /// grounded gate is on) while an equal or higher tier is already active.
    /// Repeated calls for a member are harmless. Distances are re-checked
    /// afterwards.
    ///
    /// # Returns
    /// `true` when the source was newly added.
    pub fn on_overlap_begin(&mut self, fields: &GravityFields, id: SourceId, body: &RigidBody, grounded: bool) -> bool {
        let source = match fields.source(id) {
            Ok(s) => s,
            Err(e) => {
                error!("{}", e);
                return false;
            }
        };

        let gate_open = !(self.settings.ignore_fields_while_grounded && grounded);
        let outranks = self.highest_priority(fields).map_or(true, |top| source.priority > top);
        if !gate_open && !outranks {
            return false;
        }

        let added = if self.is_active(id) {
            false
        } else {
            debug!("field `{}` (priority {}) became active", source.name, source.priority);
            self.active.push(ActiveField::new(id, source));
            true
        };

        self.prune_by_distance(fields, body);
        added
    }

    /// The body's trigger volume stopped overlapping source `id`.
    ///
    /// With free flight disallowed, the last remaining source is kept.
    ///
    /// # Returns
    /// `true` when the source was removed.
    pub fn on_overlap_end(&mut self, fields: &GravityFields, id: SourceId, body: &RigidBody) -> bool {
        let removed = if !self.is_active(id) {
            false
        } else if !self.settings.allow_free_flight && self.active.len() == 1 {
            debug!("keeping last gravity field {:?}, free flight is disabled", id);
            false
        } else {
            self.active.retain(|a| a.id != id);
            debug!("field {:?} left the active set", id);
            true
        };

        self.prune_by_distance(fields, body);
        removed
    }

    /// Drop active sources farther from the body than their own radius.
    ///
    /// Handles trigger volumes larger than the authoritative radius and stale
    /// entries. Without free flight the set is never emptied: if every source
    /// is out of range, the nearest one stays.
    pub fn prune_by_distance(&mut self, fields: &GravityFields, body: &RigidBody) {
        let before = self.active.len();
        let in_range = |a: &ActiveField| {
            fields
                .get(a.id)
                .is_some_and(|s| s.distance_to(&body.x) <= s.radius())
        };

        if !self.settings.allow_free_flight && !self.active.is_empty() && !self.active.iter().any(in_range) {
            let nearest = self
                .active
                .iter()
                .filter_map(|a| fields.get(a.id).map(|s| (a.id, s.distance_to(&body.x))))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(id, _)| id);
            if let Some(keep) = nearest {
                self.active.retain(|a| a.id == keep);
            }
        } else {
            self.active.retain(in_range);
        }

        if self.active.len() != before {
            debug!("pruned {} out-of-range field(s)", before - self.active.len());
        }
    }

    /// Reduce the active set to the closest source of the top tier.
    ///
    /// The survivor's delay restarts only when the closest source changes;
    /// sources re-offered by overlap events and dropped again leave it alone.
    pub fn snap_to_closest_source(&mut self, fields: &GravityFields, body: &RigidBody) {
        let closest = self
            .highest_priority_sources(fields)
            .into_iter()
            .filter_map(|id| fields.get(id).map(|s| (id, s.distance_to(&body.x), s.delay)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        let Some((keep, _, delay)) = closest else {
            return;
        };
        let switched = self.snapped.replace(keep) != Some(keep);
        if self.active.len() == 1 {
            return;
        }

        self.active.retain(|a| a.id == keep);
        if switched {
            for a in self.active.iter_mut() {
                a.delay.reset(delay);
            }
            debug!("switched to closest field {:?}", keep);
        }
    }

    // resolution ============================================================================

    /// Resolve this tick's gravity and add it to the body's acceleration.
    ///
    /// - ticks every delay timer by `dt`,
    /// - on a priority tier change, restarts the delay of every top-tier source,
    /// - sums `direction * magnitude` over top-tier sources whose delay expired,
    /// - stores the normalized sum as the resolved direction (zero if it vanishes).
    ///
    /// # Returns
    /// The acceleration added to the body.
    pub fn apply_gravitation(&mut self, fields: &GravityFields, body: &mut RigidBody, dt: f64) -> NVec3 {
        let Some(top) = self.highest_priority(fields) else {
            self.direction = NVec3::zeros();
            body.add_acceleration(NVec3::zeros());
            return NVec3::zeros();
        };

        for a in self.active.iter_mut() {
            a.delay.update(dt);
        }

        if self.last_applied_priority != Some(top) {
            debug!("priority tier changed {:?} -> {}", self.last_applied_priority, top);
            self.last_applied_priority = Some(top);
            for a in self.active.iter_mut() {
                if let Some(source) = fields.get(a.id).filter(|s| s.priority == top) {
                    a.delay.reset(source.delay);
                }
            }
        }

        let settings = &self.settings;
        let mut total = NVec3::zeros();
        for a in self.active.iter_mut() {
            let Some(source) = fields.get(a.id) else {
                continue;
            };
            if source.priority != top || a.delay.is_active() {
                continue;
            }

            let direction = source.calculate_gravity_direction(&body.x, &mut a.smoothing, dt);
            total += direction * settings.magnitude(source, body);
        }

        self.direction = unit_or_zero(&total);
        body.add_acceleration(total);
        total
    }

    /// Turn the body so its up axis moves toward the negated gravity direction.
    ///
    /// Interpolates from the current orientation toward the orientation whose
    /// up axis points against gravity by `clamp01(fixed_dt * rotation_speed)`.
    /// Leaves the body alone when no gravity is resolved.
    pub fn rotate_to_planet(&self, body: &mut RigidBody, fixed_dt: f64) {
        let target_up = -self.direction;
        if target_up.norm() < EPS_LEN {
            return;
        }

        let up = body.up();
        let from_to = NQuat::rotation_between(&up, &target_up)
            .unwrap_or_else(|| NQuat::from_axis_angle(&perpendicular(&up), PI));
        let target = from_to * body.orientation;

        let t = (fixed_dt * self.settings.rotation_speed).clamp(0.0, 1.0);
        // None only when both orientations already coincide
        body.orientation = body.orientation.try_slerp(&target, t, EPS_LEN).unwrap_or(target);
    }
}

/// Some unit vector perpendicular to `n`.
fn perpendicular(n: &NVec3) -> Unit<NVec3> {
    let (ax, ay, az) = (n.x.abs(), n.y.abs(), n.z.abs());
    let base = if ax <= ay && ax <= az {
        NVec3::x()
    } else if ay <= az {
        NVec3::y()
    } else {
        NVec3::z()
    };
    Unit::new_normalize(base.cross(n))
}
