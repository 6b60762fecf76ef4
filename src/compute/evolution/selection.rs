//! Fitness-proportionate parent selection.

use super::genome::GenomeRng;

/// Select `k` indices with replacement by rejection sampling ("roulette").
///
/// A uniformly drawn candidate is accepted with probability
/// `fitness / max_fitness`. When the maximum is not positive, every candidate
/// is accepted, which degrades to uniform selection.
pub fn select_roulette(fitnesses: &[f64], k: usize, rng: &mut GenomeRng) -> Vec<usize> {
    if fitnesses.is_empty() {
        return Vec::new();
    }

    let max_fitness = fitnesses.iter().copied().fold(0.0f64, f64::max);
    let mut selected = Vec::with_capacity(k);

    if max_fitness <= 0.0 {
        log::debug!("All fitness values are zero; selecting uniformly");
        for _ in 0..k {
            selected.push(rng.index(fitnesses.len()));
        }
        return selected;
    }

    while selected.len() < k {
        let candidate = rng.index(fitnesses.len());
        if rng.unit() <= fitnesses[candidate] / max_fitness {
            selected.push(candidate);
        }
    }
    selected
}
