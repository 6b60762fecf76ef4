//! Evolutionary engine for animat populations.
//!
//! # Overview
//!
//! The engine consists of:
//!
//! - **Genome Operations** (`genome`): Initial genomes, mutation, duplication and deletion
//! - **Lineage Tracking** (`lineage`): Animats and the ancestry arena
//! - **Selection** (`selection`): Fitness-proportionate rejection sampling
//! - **Fitness Functions** (`fitness`): Registry, evaluation modes and parallel dispatch
//! - **Statistics** (`archive`): Hall of fame and logbook
//! - **Snapshots** (`snapshot`): Periodic and final persistence
//! - **Generation Loop** (`search`): Orchestration
//!
//! # Example
//!
//! ```rust,no_run
//! use animats::compute::BlockWorld;
//! use animats::compute::evolution::{EvolutionEngine, FitnessRegistry, SnapshotManager};
//! use animats::schema::ExperimentConfig;
//!
//! let config = ExperimentConfig::default();
//! let registry = FitnessRegistry::with_builtins();
//! let world = Box::new(BlockWorld::new(config.world.clone()));
//! let mut snapshots = SnapshotManager::from_config("output", &config.run);
//!
//! let mut engine = EvolutionEngine::new(config, &registry, world)?;
//! let result = engine.run_with_callback(Some(&mut snapshots), |progress| {
//!     println!("Generation {}: best fitness = {:.3}",
//!         progress.generation, progress.best_fitness);
//! })?;
//!
//! println!("Best fitness: {:.3}", result.stats.best_fitness);
//! # Ok::<(), animats::compute::evolution::EvolutionError>(())
//! ```

mod archive;
mod fitness;
mod genome;
mod lineage;
mod selection;
mod snapshot;
mod search;

pub use archive::{HallOfFame, Logbook, StatisticsRecorder};
pub use fitness::{
    EvalContext, Evaluation, EvaluationError, FitnessEvaluator, FitnessFunction, FitnessMode,
    FitnessOutput, FitnessRegistry, average_over_states, most_common_states, mutual_information,
};
pub use genome::{FILLER_CODON, GenomeRng, enforce_bounds};
pub use lineage::{Animat, AnimatId, Fitness, LineageTracker};
pub use search::{EvolutionEngine, EvolutionError};
pub use selection::select_roulette;
pub use snapshot::{
    FINAL_SNAPSHOT_DIR, SnapshotData, SnapshotError, SnapshotManager, SnapshotSchedule,
    load_initial_genome,
};
