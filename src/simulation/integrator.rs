//! Fixed-step body integrator for the headless driver
//!
//! Stands in for the host engine's rigid-body step: the controller only
//! accumulates accelerations, this consumes them

use super::states::{NVec3, RigidBody};

/// Advance one body by `dt` using semi-implicit (symplectic) Euler.
/// Consumes the acceleration accumulated this tick and clears it
pub fn integrate_body(body: &mut RigidBody, dt: f64) {
    if dt <= 0.0 { // nothing to advance, keep the accumulator for the next step
        return;
    }

    // Kick: v_n+1 = v_n + dt * a_n
    body.v += dt * body.acc;

    // Drift with the new velocity: x_n+1 = x_n + dt * v_n+1
    body.x += dt * body.v;

    // accelerations are per tick
    body.acc = NVec3::zeros();
}
