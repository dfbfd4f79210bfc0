//! Numerical parameters for the headless driver
//!
//! `Parameters` holds runtime settings:
//! - fixed physics step `fixed_dt`,
//! - end time `t_end`,
//! - how often body states are logged

#[derive(Debug, Clone)]
pub struct Parameters {
    pub fixed_dt: f64, // fixed physics step
    pub t_end: f64, // time end
    pub log_every: usize, // log body states every n steps, 0 = never
}
