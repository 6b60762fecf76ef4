//! End-to-end runs of the evolution engine against a stub simulator.

use animats::compute::evolution::{
    EvolutionEngine, FINAL_SNAPSHOT_DIR, FitnessFunction, FitnessRegistry, SnapshotData,
    SnapshotManager,
};
use animats::compute::{SimulationError, SimulationOutput, Simulator};
use animats::schema::{
    ExperimentConfig, Genome, GenomeConstraints, RunConfig, StopReason, WorldConfig,
};

/// Every genome sees the same single all-zero trial.
struct StubSimulator(WorldConfig);

impl Simulator for StubSimulator {
    fn world(&self) -> &WorldConfig {
        &self.0
    }

    fn simulate(&self, _genome: &Genome) -> Result<SimulationOutput, SimulationError> {
        Ok(SimulationOutput {
            trials: vec![vec![vec![0; self.0.num_units()]; 3]],
            correct: 2,
            incorrect: 1,
        })
    }
}

/// Registry whose only function scores an animat by its generation index.
fn generation_registry() -> FitnessRegistry {
    let mut registry = FitnessRegistry::new();
    registry.register(FitnessFunction::single(
        "generation",
        "Generation index of the animat",
        |ctx| Ok(ctx.animat().generation as f64),
    ));
    registry
}

fn stub_config(popsize: usize, ngen: u64) -> ExperimentConfig {
    ExperimentConfig {
        run: RunConfig {
            rng_seed: 3,
            ngen,
            popsize,
            fitness_function: "generation".to_string(),
            log_interval: 1,
            ..Default::default()
        },
        genome: GenomeConstraints {
            min_length: 20,
            max_length: 200,
            init_length: 60,
            init_start_codons: 2,
            init_genome: None,
        },
        ..Default::default()
    }
}

fn stub_engine(config: ExperimentConfig) -> EvolutionEngine {
    let simulator = Box::new(StubSimulator(config.world.clone()));
    EvolutionEngine::new(config, &generation_registry(), simulator).unwrap()
}

#[test]
fn test_generation_scored_run() {
    let mut engine = stub_engine(stub_config(4, 3));
    let result = engine.run().unwrap();

    assert_eq!(result.stats.generations, 3);
    assert_eq!(result.stats.total_evaluations, 16);
    assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);

    let generations: Vec<u64> = engine
        .logbook()
        .records()
        .iter()
        .map(|r| r.generation)
        .collect();
    assert_eq!(generations, vec![0, 1, 2, 3]);
    assert_eq!(engine.logbook().last().map(|r| r.fitness_max), Some(3.0));

    let best = engine.hall_of_fame().best().unwrap();
    assert_eq!(best.generation, 3);
    assert_eq!(result.best.map(|r| r.generation), Some(3));

    let lineage = engine.lineages().lineage(best.id);
    assert_eq!(lineage.len(), 4);
    let oldest_first: Vec<f64> = lineage.iter().rev().map(|a| a.value()).collect();
    assert!(oldest_first.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(lineage.last().map(|a| a.generation), Some(0));
}

#[test]
fn test_logbook_follows_log_interval() {
    for (log_interval, ngen, expected) in [
        (2, 3, vec![0, 2]),
        (2, 6, vec![0, 2, 4, 6]),
        (3, 7, vec![0, 3, 6]),
    ] {
        let mut config = stub_config(4, ngen);
        config.run.log_interval = log_interval;
        let mut engine = stub_engine(config);
        engine.run().unwrap();

        let generations: Vec<u64> = engine
            .logbook()
            .records()
            .iter()
            .map(|r| r.generation)
            .collect();
        assert_eq!(generations, expected, "log_interval {log_interval}, ngen {ngen}");
        // Skipped generations still reach the hall of fame.
        assert_eq!(engine.hall_of_fame().best().map(|a| a.generation), Some(ngen));
    }
}

#[test]
fn test_stub_counts_reach_records() {
    let mut engine = stub_engine(stub_config(3, 2));
    engine.run().unwrap();

    // The generation function never simulates, so trial counts stay at zero.
    assert!(engine.population().iter().all(|a| a.correct == 0 && a.incorrect == 0));
    assert_eq!(engine.logbook().last().map(|r| r.correct_max), Some(0));
}

#[test]
fn test_snapshot_cadence() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = stub_config(3, 10);
    config.run.min_snapshots = 2;

    let mut snapshots = SnapshotManager::from_config(dir.path(), &config.run);
    let mut engine = stub_engine(config);
    let result = engine.run_with_callback(Some(&mut snapshots), |_| {}).unwrap();

    assert_eq!(result.stats.snapshots_written, 2);
    assert!(dir.path().join("snapshot-1-gen-5").is_dir());
    assert!(dir.path().join("snapshot-2-gen-10").is_dir());
    assert!(dir.path().join(FINAL_SNAPSHOT_DIR).is_dir());

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["final", "snapshot-1-gen-5", "snapshot-2-gen-10"]);
}

#[test]
fn test_final_snapshot_contents() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = stub_config(4, 6);
    config.run.num_samples = 3;

    let mut snapshots = SnapshotManager::from_config(dir.path(), &config.run);
    let mut engine = stub_engine(config.clone());
    engine.run_with_callback(Some(&mut snapshots), |_| {}).unwrap();

    let data = SnapshotData::load(dir.path().join(FINAL_SNAPSHOT_DIR)).unwrap();
    assert_eq!(data.config, config);
    assert_eq!(data.metadata.generation, 6);
    assert_eq!(data.metadata.snapshot, None);
    assert_eq!(data.metadata.rng_seed, 3);
    assert_eq!(data.logbook.len(), 7);
    assert_eq!(data.hall_of_fame.len(), 4);

    // Stride 2 over generations 6..=0.
    assert_eq!(data.lineages.len(), 1);
    let generations: Vec<u64> = data.lineages[0].iter().map(|r| r.generation).collect();
    assert_eq!(generations, vec![6, 4, 2, 0]);

    let best = engine.hall_of_fame().best().unwrap();
    assert_eq!(data.lineages[0][0].id, best.id.0);
    assert_eq!(data.lineages[0][0].genome, best.genome);
}

#[test]
fn test_cancelled_run_still_persists() {
    let dir = tempfile::tempdir().unwrap();
    let config = stub_config(3, 50);
    let mut snapshots = SnapshotManager::from_config(dir.path(), &config.run);
    let mut engine = stub_engine(config);
    let cancel = engine.cancel_handle();

    let result = engine
        .run_with_callback(Some(&mut snapshots), |progress| {
            if progress.generation == 2 {
                cancel.store(true, std::sync::atomic::Ordering::Relaxed);
            }
        })
        .unwrap();

    assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
    assert_eq!(result.stats.generations, 2);
    let data = SnapshotData::load(dir.path().join(FINAL_SNAPSHOT_DIR)).unwrap();
    assert_eq!(data.metadata.generation, 2);
}

#[test]
fn test_initial_genome_from_previous_run() {
    let first_dir = tempfile::tempdir().unwrap();
    let first = stub_config(4, 4);
    let mut snapshots = SnapshotManager::from_config(first_dir.path(), &first.run);
    let mut engine = stub_engine(first);
    engine.run_with_callback(Some(&mut snapshots), |_| {}).unwrap();

    let final_dir = first_dir.path().join(FINAL_SNAPSHOT_DIR);
    let previous = SnapshotData::load(&final_dir).unwrap();
    let seed_genome = previous.lineages[0][0].genome.clone();

    for source in [final_dir.clone(), final_dir.join("lineages.json")] {
        let mut second = stub_config(5, 1);
        second.run.rng_seed = 99;
        second.genome.init_genome = Some(source);

        let mut resumed = stub_engine(second);
        resumed.initialize().unwrap();
        assert_eq!(resumed.population().len(), 5);
        assert!(resumed.population().iter().all(|a| a.genome == seed_genome));
    }
}

#[test]
fn test_missing_initial_genome_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = stub_config(2, 1);
    config.genome.init_genome = Some(dir.path().join("missing.json"));

    let mut engine = stub_engine(config);
    assert!(engine.initialize().is_err());
}
