//! Compute module - Simulation and evolution for animats.

mod brain;
mod simulator;

pub mod evolution;

pub use brain::*;
pub use simulator::*;
