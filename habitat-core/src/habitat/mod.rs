//! The player's habitat: a growing tree of modules and its spatial layout.

mod graph;
mod layout;

pub use graph::{HabitatGraph, HabitatIntegrityError, HabitatKind, HabitatModule};
pub use layout::{layout, Layout, Placement, Position, ANGLE_STEP_DEGREES, PLACEMENT_RADIUS};
