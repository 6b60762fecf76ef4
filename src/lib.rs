//! Animats - Genetic-algorithm evolution of genome-encoded agents.
//!
//! This crate evolves populations of small agents ("animats") whose genomes
//! encode Markov-brain logic gates. Each generation is selected by fitness,
//! varied by mutation, duplication and deletion, and scored by a pluggable
//! fitness function, while ancestry and statistics are tracked over the run.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Experiment configuration and persisted record types
//! - `compute`: The reference simulator and the evolutionary engine
//!
//! # Example
//!
//! ```rust,no_run
//! use animats::{
//!     schema::ExperimentConfig,
//!     compute::{BlockWorld, evolution::{EvolutionEngine, FitnessRegistry}},
//! };
//!
//! let mut config = ExperimentConfig::default();
//! config.run.ngen = 100;
//!
//! let world = Box::new(BlockWorld::new(config.world.clone()));
//! let mut engine = EvolutionEngine::new(config, &FitnessRegistry::with_builtins(), world)?;
//! let result = engine.run()?;
//!
//! println!("Best fitness after 100 generations: {}", result.stats.best_fitness);
//! # Ok::<(), animats::compute::evolution::EvolutionError>(())
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionEngine, EvolutionError, FitnessRegistry, SnapshotManager};
pub use compute::{BlockWorld, Simulator};
pub use schema::{ConfigOverrides, ExperimentConfig};
