//! Scene-wide gravity settings
//!
//! Flags that used to be ambient game state (free flight, gravity law,
//! switching to the closest field) are explicit configuration here and are
//! handed to every controller built for the scene

#[derive(Debug, Clone, Default)]
pub struct Engine {
    pub allow_free_flight: bool, // false = a body never loses its last field
    pub use_gravity_law: bool, // true = inverse-square magnitude for non-fixed fields
    pub switch_fields_by_distance: bool, // true = keep only the closest top-priority field
}
