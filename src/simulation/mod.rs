pub mod states;
pub mod params;
pub mod engine;
pub mod triangle;
pub mod mesh;
pub mod kd_tree;
pub mod collider;
pub mod smoothing;
pub mod policy;
pub mod field;
pub mod controller;
pub mod integrator;
pub mod scenario;
