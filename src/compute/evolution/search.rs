//! Generation loop for animat evolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::compute::simulator::Simulator;
use crate::schema::{
    ConfigError, EvolutionProgress, EvolutionResult, EvolutionStats, ExperimentConfig, Genome,
    SnapshotMetadata, StopReason,
};

use super::archive::{HallOfFame, Logbook, StatisticsRecorder};
use super::fitness::{EvaluationError, FitnessEvaluator, FitnessRegistry};
use super::genome::{GenomeRng, enforce_bounds};
use super::lineage::{Animat, LineageTracker};
use super::selection::select_roulette;
use super::snapshot::{SnapshotData, SnapshotError, SnapshotManager, load_initial_genome};

/// Evolution engine that runs the generation loop.
///
/// Selection and variation consume one random stream on the calling thread;
/// only fitness evaluation runs in parallel, and its results are joined back
/// in population order before the next random draw.
pub struct EvolutionEngine {
    config: ExperimentConfig,
    rng: GenomeRng,
    evaluator: FitnessEvaluator,
    simulator: Box<dyn Simulator>,
    lineages: LineageTracker,
    population: Vec<Animat>,
    recorder: StatisticsRecorder,
    generation: u64,
    total_evaluations: u64,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create a new evolution engine. Fails if the configuration is invalid,
    /// the simulator was built for a different world, or the configuration
    /// names an unregistered fitness function.
    pub fn new(
        config: ExperimentConfig,
        registry: &FitnessRegistry,
        simulator: Box<dyn Simulator>,
    ) -> Result<Self, EvolutionError> {
        config.validate()?;
        if simulator.world() != &config.world {
            return Err(ConfigError::WorldMismatch {
                config: config.world.clone(),
                simulator: simulator.world().clone(),
            }
            .into());
        }

        let name = &config.run.fitness_function;
        let function = registry
            .get(name)
            .cloned()
            .ok_or_else(|| EvolutionError::UnknownFitness {
                name: name.clone(),
                available: registry.names().join(", "),
            })?;
        let evaluator =
            FitnessEvaluator::new(function, config.run.fitness_base, config.evaluation.workers)?;

        Ok(Self {
            rng: GenomeRng::new(config.run.rng_seed),
            recorder: StatisticsRecorder::new(config.run.popsize, config.run.log_interval),
            config,
            evaluator,
            simulator,
            lineages: LineageTracker::new(),
            population: Vec::new(),
            generation: 0,
            total_evaluations: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Get cancellation handle. Cancellation takes effect between generations.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn population(&self) -> &[Animat] {
        &self.population
    }

    pub fn hall_of_fame(&self) -> &HallOfFame {
        self.recorder.hall_of_fame()
    }

    pub fn logbook(&self) -> &Logbook {
        self.recorder.logbook()
    }

    pub fn lineages(&self) -> &LineageTracker {
        &self.lineages
    }

    /// Genome every generation-0 animat starts from.
    fn initial_genome(&mut self) -> Result<Genome, EvolutionError> {
        let constraints = &self.config.genome;
        match &constraints.init_genome {
            Some(path) => {
                let mut genome = load_initial_genome(path)?;
                log::info!(
                    "Loaded initial genome of {} codons from {}",
                    genome.len(),
                    path.display()
                );
                if enforce_bounds(&mut genome, constraints.min_length, constraints.max_length) {
                    log::warn!(
                        "Initial genome resized to {} codons to fit [{}, {}]",
                        genome.len(),
                        constraints.min_length,
                        constraints.max_length
                    );
                }
                Ok(genome)
            }
            None => Ok(self.rng.initial_genome(constraints)),
        }
    }

    /// Build, evaluate and record generation 0.
    pub fn initialize(&mut self) -> Result<(), EvolutionError> {
        self.rng = GenomeRng::new(self.config.run.rng_seed);
        self.lineages = LineageTracker::new();
        self.recorder =
            StatisticsRecorder::new(self.config.run.popsize, self.config.run.log_interval);
        self.generation = 0;
        self.total_evaluations = 0;

        let genome = self.initial_genome()?;
        let mut population: Vec<Animat> = (0..self.config.run.popsize)
            .map(|_| Animat::founder(self.lineages.next_id(), genome.clone()))
            .collect();

        self.evaluate(&mut population)?;
        for animat in &population {
            self.lineages.insert(animat.clone());
        }
        self.population = population;
        self.recorder.record(&self.population, 0);
        Ok(())
    }

    /// Evaluate `population` and store the results on each animat.
    fn evaluate(&mut self, population: &mut [Animat]) -> Result<(), EvolutionError> {
        let evaluations = self
            .evaluator
            .evaluate_population(population, self.simulator.as_ref())?;
        for (animat, evaluation) in population.iter_mut().zip(evaluations) {
            evaluation.apply(animat);
        }
        self.total_evaluations += population.len() as u64;
        Ok(())
    }

    /// Select, clone, vary, evaluate and record one generation.
    pub fn step_generation(&mut self) -> Result<(), EvolutionError> {
        let next = self.generation + 1;

        let fitnesses: Vec<f64> = self.population.iter().map(Animat::value).collect();
        let parents = select_roulette(&fitnesses, self.config.run.popsize, &mut self.rng);

        let mut offspring = Vec::with_capacity(parents.len());
        for index in parents {
            let mut child = self.population[index].offspring(self.lineages.next_id(), next);
            self.rng
                .vary(&mut child.genome, &self.config.variation, &self.config.genome);
            offspring.push(child);
        }

        self.evaluate(&mut offspring)?;

        for animat in &offspring {
            self.lineages.insert(animat.clone());
        }
        let previous = std::mem::replace(&mut self.population, offspring);
        for animat in &previous {
            self.lineages.retire(animat.id);
        }

        self.generation = next;
        self.recorder.record(&self.population, next);
        log::debug!("Generation {next}: {} tracked ancestors", self.lineages.len());
        Ok(())
    }

    /// Fittest live animat; the earliest wins ties.
    fn fittest(&self) -> Option<&Animat> {
        self.population
            .iter()
            .reduce(|best, animat| if animat.value() > best.value() { animat } else { best })
    }

    /// Current progress.
    pub fn progress(&self, elapsed_seconds: f64) -> EvolutionProgress {
        let best_raw_fitness = self
            .population
            .iter()
            .filter_map(Animat::raw_fitness)
            .fold(f64::NEG_INFINITY, f64::max);
        let record = self
            .recorder
            .logbook()
            .last()
            .filter(|r| r.generation == self.generation)
            .cloned();

        EvolutionProgress {
            generation: self.generation,
            total_generations: self.config.run.ngen,
            best_raw_fitness,
            best_fitness: self.hall_of_fame().best().map_or(0.0, Animat::value),
            record,
            elapsed_seconds,
        }
    }

    /// Full persistable state at the current generation.
    pub fn capture(&self, elapsed_seconds: f64, snapshot: Option<u32>) -> SnapshotData {
        let stride = self.config.run.lineage_stride(self.generation);
        let lineages = if self.config.run.save_all_lineages {
            self.population
                .iter()
                .map(|animat| self.lineages.sampled_lineage(animat.id, stride))
                .collect()
        } else {
            self.fittest()
                .map(|animat| self.lineages.sampled_lineage(animat.id, stride))
                .into_iter()
                .collect()
        };

        SnapshotData {
            config: self.config.clone(),
            metadata: SnapshotMetadata {
                elapsed: (elapsed_seconds * 100.0).round() / 100.0,
                version: env!("CARGO_PKG_VERSION").to_string(),
                generation: self.generation,
                snapshot,
                rng_seed: self.config.run.rng_seed,
            },
            logbook: self.logbook().records().to_vec(),
            lineages,
            hall_of_fame: self.hall_of_fame().records(),
        }
    }

    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }
        if self.generation >= self.config.run.ngen {
            return Some(StopReason::MaxGenerations);
        }
        None
    }

    /// Run evolution with progress callback.
    ///
    /// The callback fires after generation 0 and after every later generation.
    /// With a [`SnapshotManager`], periodic snapshots are written at generation
    /// boundaries and a final persist is always written when the loop ends.
    pub fn run_with_callback<F>(
        &mut self,
        mut snapshots: Option<&mut SnapshotManager>,
        mut callback: F,
    ) -> Result<EvolutionResult, EvolutionError>
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        log::info!(
            "Simulating {} generations of {} animats with fitness function '{}'",
            self.config.run.ngen,
            self.config.run.popsize,
            self.evaluator.function().name
        );

        self.initialize()?;
        callback(&self.progress(start_time.elapsed().as_secs_f64()));

        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.step_generation()?;
            callback(&self.progress(start_time.elapsed().as_secs_f64()));

            if let Some(manager) = snapshots.as_deref_mut() {
                let elapsed = start_time.elapsed().as_secs_f64();
                manager.maybe_snapshot(Instant::now(), self.generation, |number| {
                    self.capture(elapsed, Some(number))
                })?;
            }
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        if stop_reason == StopReason::Cancelled {
            log::warn!("Evolution cancelled at generation {}", self.generation);
        }

        let snapshots_written = match snapshots {
            Some(manager) => {
                manager.finalize(&self.capture(elapsed, None))?;
                manager.snapshots_written()
            }
            None => 0,
        };

        log::info!("Simulated {} generations in {elapsed:.2}s", self.generation);

        Ok(EvolutionResult {
            best: self.hall_of_fame().best().map(Animat::to_record),
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.total_evaluations,
                best_fitness: self.hall_of_fame().best().map_or(0.0, Animat::value),
                elapsed_seconds: elapsed,
                evaluations_per_second: if elapsed > 0.0 {
                    self.total_evaluations as f64 / elapsed
                } else {
                    0.0
                },
                snapshots_written,
                stop_reason,
            },
        })
    }

    /// Run evolution (blocking) without persistence.
    pub fn run(&mut self) -> Result<EvolutionResult, EvolutionError> {
        self.run_with_callback(None, |_| {})
    }
}

/// Errors that abort a run.
#[derive(Debug, thiserror::Error)]
pub enum EvolutionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Unknown fitness function '{name}' (available: {available})")]
    UnknownFitness { name: String, available: String },
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error("Snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Failed to build evaluation thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::simulator::{BlockWorld, SimulationError, SimulationOutput};
    use crate::compute::evolution::fitness::FitnessFunction;
    use crate::schema::{GenomeConstraints, RunConfig, WorldConfig};

    struct ConstantSimulator(WorldConfig);

    impl Simulator for ConstantSimulator {
        fn world(&self) -> &WorldConfig {
            &self.0
        }

        fn simulate(&self, _genome: &Genome) -> Result<SimulationOutput, SimulationError> {
            let state = vec![0; self.0.num_units()];
            Ok(SimulationOutput {
                trials: vec![vec![state; 2]],
                correct: 1,
                incorrect: 0,
            })
        }
    }

    fn small_config(popsize: usize, ngen: u64, fitness_function: &str) -> ExperimentConfig {
        ExperimentConfig {
            run: RunConfig {
                rng_seed: 11,
                ngen,
                popsize,
                fitness_function: fitness_function.to_string(),
                ..Default::default()
            },
            world: WorldConfig {
                world_width: 8,
                world_height: 6,
                ..Default::default()
            },
            genome: GenomeConstraints {
                min_length: 50,
                max_length: 400,
                init_length: 200,
                init_start_codons: 4,
                init_genome: None,
            },
            ..Default::default()
        }
    }

    fn block_engine(config: ExperimentConfig) -> EvolutionEngine {
        let world = Box::new(BlockWorld::new(config.world.clone()));
        EvolutionEngine::new(config, &FitnessRegistry::with_builtins(), world).unwrap()
    }

    #[test]
    fn test_unknown_fitness_function() {
        let config = small_config(4, 2, "nope");
        let world = Box::new(BlockWorld::new(config.world.clone()));
        let err = EvolutionEngine::new(config, &FitnessRegistry::with_builtins(), world)
            .err()
            .unwrap();
        assert!(matches!(err, EvolutionError::UnknownFitness { .. }));
        assert!(err.to_string().contains("nat_mi"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config(4, 2, "nat");
        config.run.popsize = 0;
        let world = Box::new(BlockWorld::new(config.world.clone()));
        assert!(matches!(
            EvolutionEngine::new(config, &FitnessRegistry::with_builtins(), world),
            Err(EvolutionError::Config(ConfigError::EmptyPopulation))
        ));
    }

    #[test]
    fn test_simulator_world_must_match_config() {
        let config = small_config(4, 2, "nat");
        let mut world = config.world.clone();
        world.num_sensors = 12;
        world.num_motors = 12;
        let simulator = Box::new(ConstantSimulator(world));

        let err = EvolutionEngine::new(config, &FitnessRegistry::with_builtins(), simulator)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            EvolutionError::Config(ConfigError::WorldMismatch { .. })
        ));
    }

    #[test]
    fn test_initialize() {
        let mut engine = block_engine(small_config(6, 3, "nat"));
        engine.initialize().unwrap();

        assert_eq!(engine.population().len(), 6);
        assert!(engine.population().iter().all(|a| a.fitness.is_some()));
        assert!(engine.population().iter().all(|a| a.generation == 0));
        assert_eq!(engine.logbook().len(), 1);
        assert_eq!(engine.hall_of_fame().len(), 6);
    }

    #[test]
    fn test_evolution_run() {
        let mut engine = block_engine(small_config(5, 4, "nat"));
        let result = engine.run().unwrap();

        assert_eq!(result.stats.generations, 4);
        assert_eq!(result.stats.total_evaluations, 25);
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert!(result.best.is_some());
        assert!(engine
            .population()
            .iter()
            .all(|a| a.genome.within_bounds(50, 400)));
    }

    #[test]
    fn test_deterministic_under_parallel_evaluation() {
        let mut single = small_config(8, 5, "nat_mi");
        single.evaluation.workers = 1;
        let mut parallel = single.clone();
        parallel.evaluation.workers = 4;

        let mut a = block_engine(single);
        let mut b = block_engine(parallel);
        a.run().unwrap();
        b.run().unwrap();

        assert_eq!(a.logbook().records(), b.logbook().records());
        let genomes = |e: &EvolutionEngine| -> Vec<Genome> {
            e.population().iter().map(|x| x.genome.clone()).collect()
        };
        assert_eq!(genomes(&a), genomes(&b));
    }

    #[test]
    fn test_lineage_of_live_animats() {
        let mut engine = block_engine(small_config(4, 6, "nat"));
        engine.run().unwrap();

        for animat in engine.population() {
            let lineage = engine.lineages().lineage(animat.id);
            assert_eq!(lineage.len(), 7);
            assert_eq!(lineage.last().map(|a| a.generation), Some(0));
        }
    }

    #[test]
    fn test_cancellation() {
        let mut engine = block_engine(small_config(4, 100, "nat"));
        let cancel = engine.cancel_handle();

        // Cancel immediately
        cancel.store(true, Ordering::Relaxed);

        let result = engine.run().unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
        assert_eq!(result.stats.generations, 0);
    }

    #[test]
    fn test_callback_per_generation() {
        let mut engine = block_engine(small_config(3, 4, "nat"));
        let mut seen = Vec::new();
        engine
            .run_with_callback(None, |progress| seen.push(progress.generation))
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_underflowing_fitness_uses_uniform_selection() {
        let mut registry = FitnessRegistry::new();
        registry.register(FitnessFunction::single("sink", "underflows", |_| Ok(-1.0e6)));
        let config = small_config(4, 3, "sink");
        let simulator = Box::new(ConstantSimulator(config.world.clone()));
        let mut engine = EvolutionEngine::new(config, &registry, simulator).unwrap();

        let result = engine.run().unwrap();
        assert_eq!(result.stats.generations, 3);
        assert!(engine.population().iter().all(|a| a.value() == 0.0));
    }

    #[test]
    fn test_evaluation_failure_aborts() {
        let mut registry = FitnessRegistry::new();
        registry.register(FitnessFunction::single("fails", "always fails", |_| {
            Err(SimulationError::Failed("boom".to_string()))
        }));
        let config = small_config(4, 3, "fails");
        let simulator = Box::new(ConstantSimulator(config.world.clone()));
        let mut engine = EvolutionEngine::new(config, &registry, simulator).unwrap();

        let err = engine.run().unwrap_err();
        assert!(matches!(
            err,
            EvolutionError::Evaluation(EvaluationError::Simulation { generation: 0, .. })
        ));
        assert!(err.to_string().contains("fails"));
    }

    #[test]
    fn test_capture_single_lineage() {
        let mut config = small_config(4, 10, "nat");
        config.run.num_samples = 5;
        let mut engine = block_engine(config);
        engine.run().unwrap();

        let data = engine.capture(1.234, None);
        assert_eq!(data.metadata.elapsed, 1.23);
        assert_eq!(data.metadata.generation, 10);
        assert_eq!(data.lineages.len(), 1);
        // Stride 2 over 11 generations: 10, 8, 6, 4, 2, 0.
        let generations: Vec<u64> = data.lineages[0].iter().map(|r| r.generation).collect();
        assert_eq!(generations, vec![10, 8, 6, 4, 2, 0]);
        assert_eq!(data.hall_of_fame.len(), 4);
    }

    #[test]
    fn test_capture_all_lineages() {
        let mut config = small_config(4, 2, "nat");
        config.run.save_all_lineages = true;
        let mut engine = block_engine(config);
        engine.run().unwrap();
        assert_eq!(engine.capture(0.0, None).lineages.len(), 4);
    }
}
