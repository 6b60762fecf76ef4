//! Animats CLI - Evolve animats from a JSON experiment file.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};

use animats::{
    compute::{
        BlockWorld,
        evolution::{
            EvolutionEngine, EvolutionError, FINAL_SNAPSHOT_DIR, FitnessRegistry, SnapshotManager,
        },
    },
    schema::{ConfigOverrides, EvolutionProgress, ExperimentConfig, LogRecord},
};

/// Animats: evolve genome-encoded agents with a genetic algorithm.
///
/// Command-line options override the parameters given in the experiment file.
#[derive(Parser, Debug)]
#[command(name = "animats")]
#[command(author, version, about = "Evolves animats with a genetic algorithm", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an experiment, writing snapshots and final results to OUTPUT_DIR.
    Run(Box<RunArgs>),

    /// List available fitness functions with their descriptions.
    List,

    /// Print an example experiment file with every default filled in.
    Example,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Directory for snapshots and final results
    output_dir: PathBuf,

    /// Experiment file (JSON)
    experiment: PathBuf,

    /// Random number generator seed
    #[arg(short = 'r', long)]
    rng_seed: Option<u64>,

    /// Snapshot interval (minutes)
    #[arg(short = 't', long)]
    snapshot: Option<f64>,

    /// Status-printing interval (generations)
    #[arg(short = 's', long)]
    status_interval: Option<u64>,

    /// Minimum number of snapshots to take
    #[arg(short = 'o', long)]
    min_snapshots: Option<i64>,

    /// Logbook recording interval (generations)
    #[arg(short = 'l', long)]
    log_interval: Option<u64>,

    /// Number of lineage samples to keep (0 saves the entire lineage)
    #[arg(short = 'i', long)]
    num_samples: Option<i64>,

    /// Fitness function
    #[arg(short = 'f', long)]
    fitness: Option<String>,

    /// Number of generations to simulate
    #[arg(short = 'n', long)]
    num_gen: Option<u64>,

    /// Population size
    #[arg(short = 'p', long)]
    pop_size: Option<usize>,

    /// Lineage file (or snapshot directory) to take the initial genome from
    #[arg(short = 'g', long)]
    init_genome: Option<PathBuf>,

    /// Begin with this many start codons
    #[arg(short = 'j', long)]
    jumpstart: Option<usize>,

    /// Save lineages of the entire final population
    #[arg(short = 'a', long)]
    all_lineages: bool,

    /// Number of sensors in an animat
    #[arg(long)]
    num_sensors: Option<usize>,

    /// Number of hidden units in an animat
    #[arg(long)]
    num_hidden: Option<usize>,

    /// Number of motors in an animat
    #[arg(long)]
    num_motors: Option<usize>,

    /// Width of the animats' environment
    #[arg(long)]
    world_width: Option<usize>,

    /// Height of the animats' environment
    #[arg(long)]
    world_height: Option<usize>,

    /// Point mutation probability
    #[arg(short = 'm', long)]
    mut_prob: Option<f64>,

    /// Duplication probability
    #[arg(long)]
    dup_prob: Option<f64>,

    /// Deletion probability
    #[arg(long)]
    del_prob: Option<f64>,

    /// Minimum length of duplicated/deleted genome part
    #[arg(long)]
    min_dup_del: Option<usize>,

    /// Maximum length of duplicated/deleted genome part
    #[arg(long)]
    max_dup_del: Option<usize>,

    /// Minimum genome length
    #[arg(long)]
    min_length: Option<usize>,

    /// Maximum genome length
    #[arg(long)]
    max_length: Option<usize>,

    /// Number of evaluation worker threads (0 uses every logical CPU)
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Write a heap profile to PATH (requires the `dhat-heap` feature)
    #[arg(long)]
    profile: Option<PathBuf>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            rng_seed: self.rng_seed,
            snapshot_minutes: self.snapshot,
            status_interval: self.status_interval,
            min_snapshots: self.min_snapshots,
            log_interval: self.log_interval,
            num_samples: self.num_samples,
            fitness_function: self.fitness.clone(),
            ngen: self.num_gen,
            popsize: self.pop_size,
            init_genome: self.init_genome.clone(),
            init_start_codons: self.jumpstart,
            save_all_lineages: self.all_lineages,
            num_sensors: self.num_sensors,
            num_hidden: self.num_hidden,
            num_motors: self.num_motors,
            world_width: self.world_width,
            world_height: self.world_height,
            mutation_prob: self.mut_prob,
            duplication_prob: self.dup_prob,
            deletion_prob: self.del_prob,
            min_dup_del_width: self.min_dup_del,
            max_dup_del_width: self.max_dup_del,
            min_length: self.min_length,
            max_length: self.max_length,
            workers: self.workers,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let registry = FitnessRegistry::with_builtins();

    match cli.command {
        Commands::List => print!("{}", registry.describe()),
        Commands::Example => print_example_config(),
        Commands::Run(args) => {
            if let Err(e) = run(&args, &registry) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}

fn run(args: &RunArgs, registry: &FitnessRegistry) -> Result<(), EvolutionError> {
    let mut config = ExperimentConfig::load(&args.experiment)?;
    args.overrides().apply(&mut config);
    config.validate()?;

    let _profiler = start_profiler(args.profile.as_deref());

    let seed = config.run.rng_seed;
    let ngen = config.run.ngen;
    let status_interval = config.run.status_interval;
    let mut snapshots = SnapshotManager::from_config(&args.output_dir, &config.run);

    let world = Box::new(BlockWorld::new(config.world.clone()));
    let mut engine = EvolutionEngine::new(config, registry, world)?;

    println!("\nSimulating {ngen} generations...\n");
    println!("[Seed {seed}] {}", LogRecord::header());

    let mut last_status = Instant::now();
    let result = engine.run_with_callback(Some(&mut snapshots), |progress| {
        if progress.generation % status_interval == 0 {
            print_status(seed, progress, last_status.elapsed().as_secs_f64());
            last_status = Instant::now();
        }
    })?;

    let stats = &result.stats;
    println!(
        "\nSimulated {} generations in {}.",
        stats.generations,
        compress_duration(stats.elapsed_seconds)
    );
    println!(
        "Best fitness: {:.4} ({:.1} evaluations/s, {} snapshots)",
        stats.best_fitness, stats.evaluations_per_second, stats.snapshots_written
    );
    println!(
        "Final results written to {}",
        snapshots.output_dir().join(FINAL_SNAPSHOT_DIR).display()
    );
    Ok(())
}

#[cfg(feature = "dhat-heap")]
fn start_profiler(path: Option<&Path>) -> Option<dhat::Profiler> {
    path.map(|path| {
        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            log::warn!("Could not create profile directory {}: {e}", parent.display());
        }
        dhat::Profiler::builder().file_name(path).build()
    })
}

#[cfg(not(feature = "dhat-heap"))]
fn start_profiler(path: Option<&Path>) {
    if path.is_some() {
        log::warn!("--profile ignored: built without the `dhat-heap` feature");
    }
}

fn print_status(seed: u64, progress: &EvolutionProgress, since_last: f64) {
    match &progress.record {
        Some(record) => println!("[Seed {seed}] {record} {}", compress_duration(since_last)),
        None => println!(
            "[Seed {seed}] {}\t{:.4}\t(best ever {:.4}) {}",
            progress.generation,
            progress.best_raw_fitness,
            progress.best_fitness,
            compress_duration(since_last)
        ),
    }
}

/// Render seconds as e.g. `1h2m3.4s`.
fn compress_duration(seconds: f64) -> String {
    let hours = (seconds / 3600.0).floor();
    let minutes = ((seconds - hours * 3600.0) / 60.0).floor();
    let rest = seconds - hours * 3600.0 - minutes * 60.0;
    if hours > 0.0 {
        format!("{hours}h{minutes}m{rest:.1}s")
    } else if minutes > 0.0 {
        format!("{minutes}m{rest:.1}s")
    } else {
        format!("{rest:.2}s")
    }
}

fn print_example_config() {
    let config = ExperimentConfig::default();

    println!("Example experiment (experiment.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error serializing example: {e}"),
    }
}
