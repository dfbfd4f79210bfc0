//! Per-(body, source) transient state.
//!
//! Gravity sources are shared by every body in the scene, so anything that
//! changes over time for one body lives here and is owned by that body's
//! controller:
//! - [`SmoothingState`]: nearest-triangle cache and low-pass filter memory of
//!   the low-poly mesh policy
//! - [`DelayTimer`]: activation grace period after a priority tier change

use hashbrown::HashSet;

use crate::simulation::states::NVec3;
use crate::simulation::triangle::TriangleId;

/// Temporal continuity for the smoothed mesh policy.
#[derive(Debug, Clone, Default)]
pub struct SmoothingState {
    pub current: Option<TriangleId>, // current nearest triangle
    pub current_center: NVec3, // centroid of `current`
    pub neighbors: HashSet<TriangleId>, // working set, mirrors current's neighbors
    pub previous: Option<NVec3>, // last resolved direction, set on first query
}

impl SmoothingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the working neighbor set in line with `wanted`.
    ///
    /// Drops entries no longer wanted and adds the missing ones; the result
    /// equals `wanted` as a set.
    pub fn sync_neighbors(&mut self, wanted: &[TriangleId]) {
        let next: HashSet<TriangleId> = wanted.iter().copied().collect();
        self.neighbors.retain(|t| next.contains(t));
        for t in next {
            self.neighbors.insert(t);
        }
    }
}

/// Countdown before a newly dominant source starts contributing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DelayTimer {
    remaining: f64,
}

impl DelayTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restart the countdown at `delay` seconds.
    pub fn reset(&mut self, delay: f64) {
        self.remaining = delay;
    }

    /// Count down by `dt`; stops once expired.
    pub fn update(&mut self, dt: f64) {
        if self.remaining > 0.0 {
            self.remaining -= dt;
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    pub fn remaining(&self) -> f64 {
        self.remaining.max(0.0)
    }
}
