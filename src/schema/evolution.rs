//! Genome, statistics and persisted record types for animat evolution.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Genome Representation
// ============================================================================

/// Ordered sequence of codons interpreted by the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Genome {
    codons: Vec<u8>,
}

impl Genome {
    /// Create a genome from raw codons.
    pub fn new(codons: Vec<u8>) -> Self {
        Self { codons }
    }

    /// Number of codons.
    #[inline]
    pub fn len(&self) -> usize {
        self.codons.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codons.is_empty()
    }

    /// Codons as a slice.
    #[inline]
    pub fn codons(&self) -> &[u8] {
        &self.codons
    }

    /// Mutable access to the codon vector.
    #[inline]
    pub(crate) fn codons_mut(&mut self) -> &mut Vec<u8> {
        &mut self.codons
    }

    /// Whether the length lies within `[min_length, max_length]`.
    pub fn within_bounds(&self, min_length: usize, max_length: usize) -> bool {
        (min_length..=max_length).contains(&self.len())
    }
}

impl From<Vec<u8>> for Genome {
    fn from(codons: Vec<u8>) -> Self {
        Self::new(codons)
    }
}

// ============================================================================
// Persisted Records
// ============================================================================

/// Serialized animat, used for lineage samples and hall-of-fame entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatRecord {
    /// Arena identifier.
    pub id: u64,
    /// Identifier of the animat this one was cloned from.
    pub parent: Option<u64>,
    /// Generation the animat was created in.
    pub generation: u64,
    pub genome: Genome,
    /// Fitness-function output (element 0 for multi-objective functions).
    pub raw_fitness: Option<f64>,
    /// Transformed selection fitness.
    pub fitness: Option<f64>,
    /// Auxiliary metrics from multi-objective functions.
    #[serde(default)]
    pub aux: Vec<f64>,
    pub correct: u32,
    pub incorrect: u32,
}

/// One Logbook row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "gen")]
    pub generation: u64,
    /// Maximum raw fitness.
    pub fitness_max: f64,
    /// Maximum transformed fitness.
    pub real_fitness_max: f64,
    pub correct_max: u32,
    pub incorrect_max: u32,
    /// Element-wise maxima of the auxiliary metrics.
    #[serde(default)]
    pub aux_max: Vec<f64>,
}

impl LogRecord {
    /// Column header matching the `Display` output.
    pub fn header() -> &'static str {
        "gen\tfitness\treal_fitness\tcorrect\tincorrect\taux"
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{:.4}\t{:.4}\t{}\t{}",
            self.generation,
            self.fitness_max,
            self.real_fitness_max,
            self.correct_max,
            self.incorrect_max
        )?;
        for value in &self.aux_max {
            write!(f, "\t{value:.4}")?;
        }
        Ok(())
    }
}

/// Metadata written alongside every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Wall-clock seconds since the run started, rounded to hundredths.
    pub elapsed: f64,
    /// Crate version that wrote the snapshot.
    pub version: String,
    /// Generation the snapshot was taken at.
    pub generation: u64,
    /// Periodic snapshot number (`None` for the final persist).
    pub snapshot: Option<u32>,
    pub rng_seed: u64,
}

// ============================================================================
// Progress and Result Types
// ============================================================================

/// Progress update delivered after every generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionProgress {
    /// Generation just completed.
    pub generation: u64,
    /// Total generations planned.
    pub total_generations: u64,
    /// Best raw fitness in the current population.
    pub best_raw_fitness: f64,
    /// Best transformed fitness ever seen (hall-of-fame top).
    pub best_fitness: f64,
    /// Logbook row, if this generation was logged.
    pub record: Option<LogRecord>,
    /// Seconds since the run started.
    pub elapsed_seconds: f64,
}

/// Final result of an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    /// Best animat ever seen.
    pub best: Option<AnimatRecord>,
    pub stats: EvolutionStats,
}

/// Statistics from an evolution run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Generations simulated after generation 0.
    pub generations: u64,
    /// Total fitness evaluations performed.
    pub total_evaluations: u64,
    /// Best transformed fitness achieved.
    pub best_fitness: f64,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    pub evaluations_per_second: f64,
    /// Periodic snapshots written (the final persist is not counted).
    pub snapshots_written: u32,
    pub stop_reason: StopReason,
}

/// Reason evolution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Reached the configured generation count.
    MaxGenerations,
    /// Cancelled between generations.
    Cancelled,
}
