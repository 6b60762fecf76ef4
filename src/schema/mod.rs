//! Schema module - Configuration and persisted record types for animat evolution.

mod config;
mod evolution;

pub use config::*;
pub use evolution::*;
