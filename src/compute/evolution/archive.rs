//! Hall of fame and per-generation statistics.

use crate::schema::{AnimatRecord, LogRecord};

use super::lineage::Animat;

/// Bounded best-ever set of animats, ordered by descending transformed fitness.
///
/// Entries are independent copies. On equal fitness the earlier entry ranks
/// first and is the one kept when the set is full.
#[derive(Debug, Clone)]
pub struct HallOfFame {
    maxsize: usize,
    entries: Vec<Animat>,
}

impl HallOfFame {
    /// Create an empty hall of fame holding at most `maxsize` entries.
    pub fn new(maxsize: usize) -> Self {
        Self {
            maxsize,
            entries: Vec::with_capacity(maxsize),
        }
    }

    /// Merge `population` into the set.
    pub fn update<'a>(&mut self, population: impl IntoIterator<Item = &'a Animat>) {
        for animat in population {
            self.insert(animat);
        }
    }

    /// Offer a single animat. Returns whether it was retained.
    pub fn insert(&mut self, animat: &Animat) -> bool {
        if self.maxsize == 0 {
            return false;
        }
        let value = animat.value();
        if self.entries.len() >= self.maxsize {
            match self.entries.last() {
                Some(worst) if value > worst.value() => {
                    self.entries.pop();
                }
                _ => return false,
            }
        }
        let position = self.entries.partition_point(|e| e.value() >= value);
        self.entries.insert(position, animat.clone());
        true
    }

    /// Highest-ranked entry.
    pub fn best(&self) -> Option<&Animat> {
        self.entries.first()
    }

    /// Entries, best first.
    pub fn iter(&self) -> impl Iterator<Item = &Animat> {
        self.entries.iter()
    }

    /// Get number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get capacity.
    pub fn maxsize(&self) -> usize {
        self.maxsize
    }

    /// Serializable copies of every entry, best first.
    pub fn records(&self) -> Vec<AnimatRecord> {
        self.entries.iter().map(Animat::to_record).collect()
    }
}

/// Append-only sequence of per-generation statistics.
#[derive(Debug, Clone, Default)]
pub struct Logbook {
    records: Vec<LogRecord>,
}

impl Logbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute and append the statistics row for `population`.
    pub fn record(&mut self, population: &[Animat], generation: u64) -> &LogRecord {
        let row = compile_record(population, generation);
        self.records.push(row);
        &self.records[self.records.len() - 1]
    }

    /// Every row, oldest first.
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Most recent row.
    pub fn last(&self) -> Option<&LogRecord> {
        self.records.last()
    }

    /// Get number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Column maxima over a population.
fn compile_record(population: &[Animat], generation: u64) -> LogRecord {
    let mut record = LogRecord {
        generation,
        fitness_max: f64::NEG_INFINITY,
        real_fitness_max: f64::NEG_INFINITY,
        correct_max: 0,
        incorrect_max: 0,
        aux_max: Vec::new(),
    };

    for animat in population {
        if let Some(fitness) = animat.fitness {
            record.fitness_max = record.fitness_max.max(fitness.raw);
            record.real_fitness_max = record.real_fitness_max.max(fitness.value);
        }
        record.correct_max = record.correct_max.max(animat.correct);
        record.incorrect_max = record.incorrect_max.max(animat.incorrect);

        for (i, &value) in animat.aux.iter().enumerate() {
            match record.aux_max.get_mut(i) {
                Some(max) => *max = max.max(value),
                None => record.aux_max.push(value),
            }
        }
    }

    if population.iter().all(|a| a.fitness.is_none()) {
        record.fitness_max = 0.0;
        record.real_fitness_max = 0.0;
    }
    record
}

/// Hall of fame plus logbook, updated once per generation.
#[derive(Debug, Clone)]
pub struct StatisticsRecorder {
    hall_of_fame: HallOfFame,
    logbook: Logbook,
    log_interval: u64,
}

impl StatisticsRecorder {
    pub fn new(hof_size: usize, log_interval: u64) -> Self {
        Self {
            hall_of_fame: HallOfFame::new(hof_size),
            logbook: Logbook::new(),
            log_interval: log_interval.max(1),
        }
    }

    /// Merge `population` into the hall of fame and, on logging generations,
    /// append a logbook row. Returns the row if one was written.
    pub fn record(&mut self, population: &[Animat], generation: u64) -> Option<&LogRecord> {
        self.hall_of_fame.update(population);
        if generation % self.log_interval == 0 {
            Some(self.logbook.record(population, generation))
        } else {
            None
        }
    }

    /// Best-ever animats.
    pub fn hall_of_fame(&self) -> &HallOfFame {
        &self.hall_of_fame
    }

    /// Recorded statistics rows.
    pub fn logbook(&self) -> &Logbook {
        &self.logbook
    }
}
