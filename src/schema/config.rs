//! Experiment configuration for animat evolution runs.
//!
//! An experiment is described by a JSON file whose sections mirror the
//! structs below. Every field has a default, so a file only needs to name the
//! parameters it changes. Command-line overrides are applied on top through
//! [`ConfigOverrides`] before validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest sensor + motor count for which sensor/motor state tables are built.
pub const MAX_SENSOR_MOTOR_UNITS: usize = 16;

/// Narrowest world that fits the animat's body.
pub const MIN_WORLD_WIDTH: usize = 3;

/// Top-level experiment configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Run length, population and bookkeeping intervals.
    #[serde(default)]
    pub run: RunConfig,
    /// Agent and environment dimensions handed to the simulator.
    #[serde(default)]
    pub world: WorldConfig,
    /// Genome length bounds and the initial genome.
    #[serde(default)]
    pub genome: GenomeConstraints,
    /// Mutation, duplication and deletion parameters.
    #[serde(default)]
    pub variation: VariationConfig,
    /// Fitness evaluation settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// Run length, population and bookkeeping intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Seed of the single random stream used for selection and variation.
    #[serde(default)]
    pub rng_seed: u64,
    /// Number of generations to simulate after generation 0.
    #[serde(default = "default_ngen")]
    pub ngen: u64,
    /// Population size.
    #[serde(default = "default_popsize")]
    pub popsize: usize,
    /// Name of the registered fitness function.
    #[serde(default = "default_fitness_function")]
    pub fitness_function: String,
    /// Base of the exponential fitness transform (`base ^ raw`).
    #[serde(default = "default_fitness_base")]
    pub fitness_base: f64,
    /// Logbook recording interval (generations).
    #[serde(default = "default_log_interval")]
    pub log_interval: u64,
    /// Status-printing interval (generations).
    #[serde(default = "default_status_interval")]
    pub status_interval: u64,
    /// Wall-clock snapshot interval in minutes (<= 0 disables).
    #[serde(default)]
    pub snapshot_minutes: f64,
    /// Minimum number of snapshots spread over the run (<= 0 disables).
    #[serde(default)]
    pub min_snapshots: i64,
    /// Number of lineage samples kept when persisting (<= 0 keeps all).
    #[serde(default = "default_num_samples")]
    pub num_samples: i64,
    /// Persist the lineage of every animat instead of only the fittest.
    #[serde(default)]
    pub save_all_lineages: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            rng_seed: 0,
            ngen: default_ngen(),
            popsize: default_popsize(),
            fitness_function: default_fitness_function(),
            fitness_base: default_fitness_base(),
            log_interval: default_log_interval(),
            status_interval: default_status_interval(),
            snapshot_minutes: 0.0,
            min_snapshots: 0,
            num_samples: default_num_samples(),
            save_all_lineages: false,
        }
    }
}

fn default_ngen() -> u64 {
    1000
}
fn default_popsize() -> usize {
    100
}
fn default_fitness_function() -> String {
    "nat".to_string()
}
fn default_fitness_base() -> f64 {
    1.02
}
fn default_log_interval() -> u64 {
    1
}
fn default_status_interval() -> u64 {
    100
}
fn default_num_samples() -> i64 {
    1000
}

impl RunConfig {
    /// Wall-clock interval between snapshots, if enabled.
    ///
    /// Intervals too large to represent as a [`Duration`] are treated as disabled;
    /// [`ExperimentConfig::validate`] rejects them.
    pub fn snapshot_time_interval(&self) -> Option<Duration> {
        if self.snapshot_minutes > 0.0 {
            Duration::try_from_secs_f64(self.snapshot_minutes * 60.0).ok()
        } else {
            None
        }
    }

    /// Generation interval between snapshots (`ngen / min_snapshots`), if enabled.
    pub fn snapshot_generation_interval(&self) -> Option<u64> {
        if self.min_snapshots <= 0 {
            return None;
        }
        Some((self.ngen / self.min_snapshots as u64).max(1))
    }

    /// Stride used when sampling a lineage persisted at `generation`.
    pub fn lineage_stride(&self, generation: u64) -> usize {
        if self.num_samples <= 0 {
            1
        } else {
            (generation / self.num_samples as u64).max(1) as usize
        }
    }
}

/// Agent and environment dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default = "default_num_sensors")]
    pub num_sensors: usize,
    #[serde(default = "default_num_hidden")]
    pub num_hidden: usize,
    #[serde(default = "default_num_motors")]
    pub num_motors: usize,
    #[serde(default = "default_world_width")]
    pub world_width: usize,
    #[serde(default = "default_world_height")]
    pub world_height: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            num_sensors: default_num_sensors(),
            num_hidden: default_num_hidden(),
            num_motors: default_num_motors(),
            world_width: default_world_width(),
            world_height: default_world_height(),
        }
    }
}

fn default_num_sensors() -> usize {
    2
}
fn default_num_hidden() -> usize {
    4
}
fn default_num_motors() -> usize {
    2
}
fn default_world_width() -> usize {
    16
}
fn default_world_height() -> usize {
    36
}

impl WorldConfig {
    /// Total number of units (sensors, then hidden, then motors).
    #[inline]
    pub fn num_units(&self) -> usize {
        self.num_sensors + self.num_hidden + self.num_motors
    }

    /// Index of the first hidden unit.
    #[inline]
    pub fn hidden_offset(&self) -> usize {
        self.num_sensors
    }

    /// Index of the first motor unit.
    #[inline]
    pub fn motor_offset(&self) -> usize {
        self.num_sensors + self.num_hidden
    }
}

/// Genome length bounds and the initial genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeConstraints {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Length of a freshly generated initial genome.
    #[serde(default = "default_init_length")]
    pub init_length: usize,
    /// Number of start codons written into a freshly generated initial genome.
    #[serde(default)]
    pub init_start_codons: usize,
    /// Lineage file of a previous run to take the initial genome from.
    #[serde(default)]
    pub init_genome: Option<PathBuf>,
}

impl Default for GenomeConstraints {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            max_length: default_max_length(),
            init_length: default_init_length(),
            init_start_codons: 0,
            init_genome: None,
        }
    }
}

fn default_min_length() -> usize {
    1000
}
fn default_max_length() -> usize {
    10000
}
fn default_init_length() -> usize {
    5000
}

/// Genome variation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariationConfig {
    /// Per-locus point mutation probability.
    #[serde(default = "default_mutation_prob")]
    pub mutation_prob: f64,
    /// Per-offspring segmental duplication probability.
    #[serde(default = "default_duplication_prob")]
    pub duplication_prob: f64,
    /// Per-offspring segmental deletion probability.
    #[serde(default = "default_deletion_prob")]
    pub deletion_prob: f64,
    /// Minimum width of a duplicated or deleted segment.
    #[serde(default = "default_min_dup_del_width")]
    pub min_dup_del_width: usize,
    /// Maximum width of a duplicated or deleted segment.
    #[serde(default = "default_max_dup_del_width")]
    pub max_dup_del_width: usize,
}

impl Default for VariationConfig {
    fn default() -> Self {
        Self {
            mutation_prob: default_mutation_prob(),
            duplication_prob: default_duplication_prob(),
            deletion_prob: default_deletion_prob(),
            min_dup_del_width: default_min_dup_del_width(),
            max_dup_del_width: default_max_dup_del_width(),
        }
    }
}

fn default_mutation_prob() -> f64 {
    0.005
}
fn default_duplication_prob() -> f64 {
    0.05
}
fn default_deletion_prob() -> f64 {
    0.02
}
fn default_min_dup_del_width() -> usize {
    15
}
fn default_max_dup_del_width() -> usize {
    511
}

/// Fitness evaluation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Number of evaluation worker threads (0 = rayon's global pool).
    #[serde(default)]
    pub workers: usize,
}

/// Command-line overrides applied on top of an experiment file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rng_seed: Option<u64>,
    pub snapshot_minutes: Option<f64>,
    pub status_interval: Option<u64>,
    pub min_snapshots: Option<i64>,
    pub log_interval: Option<u64>,
    pub num_samples: Option<i64>,
    pub fitness_function: Option<String>,
    pub ngen: Option<u64>,
    pub popsize: Option<usize>,
    pub init_genome: Option<PathBuf>,
    pub init_start_codons: Option<usize>,
    pub save_all_lineages: bool,
    pub num_sensors: Option<usize>,
    pub num_hidden: Option<usize>,
    pub num_motors: Option<usize>,
    pub world_width: Option<usize>,
    pub world_height: Option<usize>,
    pub mutation_prob: Option<f64>,
    pub duplication_prob: Option<f64>,
    pub deletion_prob: Option<f64>,
    pub min_dup_del_width: Option<usize>,
    pub max_dup_del_width: Option<usize>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub workers: Option<usize>,
}

impl ConfigOverrides {
    /// Apply every override that is set.
    pub fn apply(&self, config: &mut ExperimentConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }

        let run = &mut config.run;
        set(&mut run.rng_seed, &self.rng_seed);
        set(&mut run.snapshot_minutes, &self.snapshot_minutes);
        set(&mut run.status_interval, &self.status_interval);
        set(&mut run.min_snapshots, &self.min_snapshots);
        set(&mut run.log_interval, &self.log_interval);
        set(&mut run.num_samples, &self.num_samples);
        set(&mut run.fitness_function, &self.fitness_function);
        set(&mut run.ngen, &self.ngen);
        set(&mut run.popsize, &self.popsize);
        if self.save_all_lineages {
            run.save_all_lineages = true;
        }

        let world = &mut config.world;
        set(&mut world.num_sensors, &self.num_sensors);
        set(&mut world.num_hidden, &self.num_hidden);
        set(&mut world.num_motors, &self.num_motors);
        set(&mut world.world_width, &self.world_width);
        set(&mut world.world_height, &self.world_height);

        let variation = &mut config.variation;
        set(&mut variation.mutation_prob, &self.mutation_prob);
        set(&mut variation.duplication_prob, &self.duplication_prob);
        set(&mut variation.deletion_prob, &self.deletion_prob);
        set(&mut variation.min_dup_del_width, &self.min_dup_del_width);
        set(&mut variation.max_dup_del_width, &self.max_dup_del_width);

        let genome = &mut config.genome;
        set(&mut genome.min_length, &self.min_length);
        set(&mut genome.max_length, &self.max_length);
        set(&mut genome.init_start_codons, &self.init_start_codons);
        if self.init_genome.is_some() {
            genome.init_genome = self.init_genome.clone();
        }

        set(&mut config.evaluation.workers, &self.workers);
    }
}

impl ExperimentConfig {
    /// Read an experiment file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let run = &self.run;
        if run.popsize == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if run.ngen == 0 {
            return Err(ConfigError::NoGenerations);
        }
        if run.log_interval == 0 {
            return Err(ConfigError::ZeroInterval("log_interval"));
        }
        if run.status_interval == 0 {
            return Err(ConfigError::ZeroInterval("status_interval"));
        }
        if run.fitness_function.is_empty() {
            return Err(ConfigError::MissingFitnessFunction);
        }
        if !(run.fitness_base.is_finite() && run.fitness_base > 0.0) {
            return Err(ConfigError::InvalidFitnessBase(run.fitness_base));
        }
        if run.snapshot_minutes.is_nan()
            || (run.snapshot_minutes > 0.0
                && Duration::try_from_secs_f64(run.snapshot_minutes * 60.0).is_err())
        {
            return Err(ConfigError::InvalidSnapshotInterval(run.snapshot_minutes));
        }

        let world = &self.world;
        if world.num_sensors == 0 || world.num_motors == 0 {
            return Err(ConfigError::InvalidWorld(
                "at least one sensor and one motor are required".to_string(),
            ));
        }
        if world.num_sensors + world.num_motors > MAX_SENSOR_MOTOR_UNITS {
            return Err(ConfigError::InvalidWorld(format!(
                "sensors + motors must not exceed {MAX_SENSOR_MOTOR_UNITS}"
            )));
        }
        if world.world_width == 0 || world.world_height == 0 {
            return Err(ConfigError::InvalidWorld(
                "world dimensions must be non-zero".to_string(),
            ));
        }
        if world.world_width < MIN_WORLD_WIDTH {
            return Err(ConfigError::InvalidWorld(format!(
                "world width {} is narrower than the body ({MIN_WORLD_WIDTH})",
                world.world_width
            )));
        }

        let check_prob = |value: f64, name: &'static str| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidProbability { name, value })
            }
        };
        check_prob(self.variation.mutation_prob, "mutation_prob")?;
        check_prob(self.variation.duplication_prob, "duplication_prob")?;
        check_prob(self.variation.deletion_prob, "deletion_prob")?;

        let variation = &self.variation;
        if variation.min_dup_del_width == 0
            || variation.min_dup_del_width > variation.max_dup_del_width
        {
            return Err(ConfigError::InvalidBounds(format!(
                "duplication/deletion width [{}, {}]",
                variation.min_dup_del_width, variation.max_dup_del_width
            )));
        }

        let genome = &self.genome;
        if genome.min_length == 0 || genome.min_length > genome.max_length {
            return Err(ConfigError::InvalidBounds(format!(
                "genome length [{}, {}]",
                genome.min_length, genome.max_length
            )));
        }

        Ok(())
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read experiment file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse experiment file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Population size must be non-zero")]
    EmptyPopulation,
    #[error("Number of generations must be non-zero")]
    NoGenerations,
    #[error("{0} must be non-zero")]
    ZeroInterval(&'static str),
    #[error("No fitness function specified")]
    MissingFitnessFunction,
    #[error("Fitness base must be positive and finite, got {0}")]
    InvalidFitnessBase(f64),
    #[error("Snapshot interval of {0} minutes is out of range")]
    InvalidSnapshotInterval(f64),
    #[error("Invalid world: {0}")]
    InvalidWorld(String),
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),
    #[error("Simulator world {simulator:?} does not match the configured world {config:?}")]
    WorldMismatch {
        config: WorldConfig,
        simulator: WorldConfig,
    },
}
