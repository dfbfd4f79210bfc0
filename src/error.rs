//! Error types for gravity sources and scenario configuration.
//!
//! Direction queries never fail outward: a [`GravityError`] is logged by the
//! source and the query degrades to the zero vector. [`ConfigError`] is
//! returned while building a scenario from YAML.

use thiserror::Error;

/// Problems raised by a gravity source while resolving a direction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GravityError {
    #[error("field `{field}` uses a mesh policy but has no mesh assigned")]
    MissingMesh { field: String },

    #[error("field `{field}` uses the simple-mesh policy but has no collider assigned")]
    MissingCollider { field: String },

    #[error("field `{field}` has a spatial index without any triangles")]
    EmptyIndex { field: String },

    #[error("unknown gravity source id {0}")]
    UnknownSource(usize),
}

/// Validation failures while turning a scenario file into runtime state.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{what} must have {expected} components, got {got}")]
    VectorLength {
        what: String,
        expected: usize,
        got: usize,
    },

    #[error("mesh of field `{field}`: index buffer length {len} is not a multiple of 3")]
    IndexBufferLength { field: String, len: usize },

    #[error("mesh of field `{field}`: index {index} out of range for {vertices} vertices")]
    IndexOutOfRange {
        field: String,
        index: usize,
        vertices: usize,
    },

    #[error("{what} must be positive, got {value}")]
    NonPositive { what: String, value: f64 },

    #[error("{what} must not be negative, got {value}")]
    Negative { what: String, value: f64 },

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),
}
