//! Mask-layout generators and probe-station analysis for thin-film transistor test structures.

pub mod chips;
pub mod component;
pub mod config;
pub mod data;
pub mod deps;
pub mod devices;
pub mod error;
pub mod io;
pub mod layout;
pub mod probe;

pub(crate) mod generation;
pub(crate) mod log;

pub use crate::log::Log;
