//! Conversion between the layout data model and foreign formats.

pub mod gds;
