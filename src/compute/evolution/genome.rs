//! Genome manipulation utilities for evolutionary search.
//!
//! Provides initial genome generation, point mutation, segmental duplication
//! and segmental deletion. All randomness comes from one [`GenomeRng`]; the
//! order in which operations draw from it is part of the reproducibility
//! contract: per offspring, mutation, then duplication, then deletion.

use crate::compute::START_CODON;
use crate::schema::{Genome, GenomeConstraints, VariationConfig};
use rand::prelude::*;

/// Codon used to fill freshly generated genomes.
pub const FILLER_CODON: u8 = 127;

/// The run's single random stream, shared by selection and variation.
pub struct GenomeRng {
    rng: StdRng,
}

impl GenomeRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform index in `0..n`.
    #[inline]
    pub fn index(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Uniform sample in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Generate the initial genome: `init_length` filler codons (clamped to
    /// the length bounds) with `init_start_codons` start codons written at
    /// random positions.
    pub fn initial_genome(&mut self, constraints: &GenomeConstraints) -> Genome {
        let length = constraints
            .init_length
            .clamp(constraints.min_length, constraints.max_length);
        let mut codons = vec![FILLER_CODON; length];

        if length >= 2 {
            for _ in 0..constraints.init_start_codons {
                let position = self.rng.gen_range(0..length - 1);
                codons[position] = START_CODON[0];
                codons[position + 1] = START_CODON[1];
            }
        }

        Genome::new(codons)
    }

    /// Replace each codon with a random one with probability `mutation_prob`.
    ///
    /// One draw is taken per locus regardless of the outcome.
    pub fn mutate(&mut self, genome: &mut Genome, mutation_prob: f64) {
        for codon in genome.codons_mut().iter_mut() {
            if self.rng.r#gen::<f64>() < mutation_prob {
                *codon = self.rng.r#gen::<u8>();
            }
        }
    }

    /// With probability `prob`, copy a random segment and insert it at a
    /// random position. Returns whether the genome changed.
    ///
    /// The segment width is drawn from `[min_width, max_width]` and clipped to
    /// the genome length. If the result would exceed `max_length` the genome is
    /// left unchanged and no positions are drawn.
    pub fn duplicate(
        &mut self,
        genome: &mut Genome,
        prob: f64,
        min_width: usize,
        max_width: usize,
        max_length: usize,
    ) -> bool {
        if self.rng.r#gen::<f64>() >= prob || genome.is_empty() {
            return false;
        }

        let len = genome.len();
        let width = self.rng.gen_range(min_width..=max_width).min(len);
        if len + width > max_length {
            return false;
        }

        let start = self.rng.gen_range(0..=len - width);
        let insert_at = self.rng.gen_range(0..=len);

        let codons = genome.codons_mut();
        let segment = codons[start..start + width].to_vec();
        codons.splice(insert_at..insert_at, segment);
        true
    }

    /// With probability `prob`, remove a random segment. Returns whether the
    /// genome changed.
    ///
    /// If the result would fall below `min_length` the genome is left unchanged.
    pub fn delete(
        &mut self,
        genome: &mut Genome,
        prob: f64,
        min_width: usize,
        max_width: usize,
        min_length: usize,
    ) -> bool {
        if self.rng.r#gen::<f64>() >= prob || genome.is_empty() {
            return false;
        }

        let len = genome.len();
        let width = self.rng.gen_range(min_width..=max_width).min(len);
        if len < width + min_length {
            return false;
        }

        let start = self.rng.gen_range(0..=len - width);
        genome.codons_mut().drain(start..start + width);
        true
    }

    /// Apply mutation, duplication and deletion, in that order.
    pub fn vary(
        &mut self,
        genome: &mut Genome,
        variation: &VariationConfig,
        constraints: &GenomeConstraints,
    ) {
        self.mutate(genome, variation.mutation_prob);
        self.duplicate(
            genome,
            variation.duplication_prob,
            variation.min_dup_del_width,
            variation.max_dup_del_width,
            constraints.max_length,
        );
        self.delete(
            genome,
            variation.deletion_prob,
            variation.min_dup_del_width,
            variation.max_dup_del_width,
            constraints.min_length,
        );
    }
}

/// Bring a genome within `[min_length, max_length]`: truncate from the end or
/// pad with filler codons. Returns whether the genome changed.
pub fn enforce_bounds(genome: &mut Genome, min_length: usize, max_length: usize) -> bool {
    let len = genome.len();
    if len > max_length {
        genome.codons_mut().truncate(max_length);
        true
    } else if len < min_length {
        genome.codons_mut().resize(min_length, FILLER_CODON);
        true
    } else {
        false
    }
}
