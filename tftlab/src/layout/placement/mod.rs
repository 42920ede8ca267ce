//! Placement of cells relative to each other.

pub mod align;
pub mod array;
pub mod grid;
pub mod pack;
