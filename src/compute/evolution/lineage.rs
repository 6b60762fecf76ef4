//! Animats and the arena that tracks their ancestry.
//!
//! Every animat gets a monotonically increasing [`AnimatId`]. The
//! [`LineageTracker`] stores each animat under its id together with the
//! number of tracked children; a node is dropped once it is no longer in the
//! live population and has no remaining descendants, so memory stays
//! proportional to the surviving ancestry rather than to the run length.

use std::collections::HashMap;
use std::fmt;

use crate::schema::{AnimatRecord, Genome};

/// Arena identifier of an animat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnimatId(pub u64);

impl fmt::Display for AnimatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Raw fitness and its exponential transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fitness {
    /// Fitness-function output.
    pub raw: f64,
    /// Selection fitness, `base ^ raw`.
    pub value: f64,
}

impl Fitness {
    /// Transform a raw score with `base`.
    pub fn from_raw(raw: f64, base: f64) -> Self {
        Self {
            raw,
            value: base.powf(raw),
        }
    }
}

/// A single evolvable agent.
#[derive(Debug, Clone)]
pub struct Animat {
    pub id: AnimatId,
    pub parent: Option<AnimatId>,
    pub generation: u64,
    pub genome: Genome,
    /// Unset until evaluated.
    pub fitness: Option<Fitness>,
    /// Reporting-only metrics from multi-objective fitness functions.
    pub aux: Vec<f64>,
    pub correct: u32,
    pub incorrect: u32,
}

impl Animat {
    /// A generation-0 animat.
    pub fn founder(id: AnimatId, genome: Genome) -> Self {
        Self {
            id,
            parent: None,
            generation: 0,
            genome,
            fitness: None,
            aux: Vec::new(),
            correct: 0,
            incorrect: 0,
        }
    }

    /// An unevaluated clone of `self` tagged with `generation`.
    pub fn offspring(&self, id: AnimatId, generation: u64) -> Self {
        Self {
            id,
            parent: Some(self.id),
            generation,
            genome: self.genome.clone(),
            fitness: None,
            aux: Vec::new(),
            correct: 0,
            incorrect: 0,
        }
    }

    /// Transformed fitness, or 0 if not yet evaluated.
    #[inline]
    pub fn value(&self) -> f64 {
        self.fitness.map_or(0.0, |f| f.value)
    }

    /// Fitness-function output, if evaluated.
    #[inline]
    pub fn raw_fitness(&self) -> Option<f64> {
        self.fitness.map(|f| f.raw)
    }

    /// Serializable copy.
    pub fn to_record(&self) -> AnimatRecord {
        AnimatRecord {
            id: self.id.0,
            parent: self.parent.map(|p| p.0),
            generation: self.generation,
            genome: self.genome.clone(),
            raw_fitness: self.raw_fitness(),
            fitness: self.fitness.map(|f| f.value),
            aux: self.aux.clone(),
            correct: self.correct,
            incorrect: self.incorrect,
        }
    }
}

#[derive(Debug)]
struct LineageNode {
    animat: Animat,
    /// Tracked nodes whose parent is this one.
    children: usize,
    /// Whether the animat belongs to the current population.
    live: bool,
}

/// Arena of animats reachable from the live population.
#[derive(Debug, Default)]
pub struct LineageTracker {
    nodes: HashMap<AnimatId, LineageNode>,
    next_id: u64,
}

impl LineageTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next animat id.
    pub fn next_id(&mut self) -> AnimatId {
        let id = AnimatId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Track `animat` as a member of the live population.
    pub fn insert(&mut self, animat: Animat) {
        if let Some(parent) = animat.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children += 1;
        }
        self.nodes.insert(
            animat.id,
            LineageNode {
                animat,
                children: 0,
                live: true,
            },
        );
    }

    /// Remove `id` from the live population, pruning every ancestor left
    /// without live descendants.
    pub fn retire(&mut self, id: AnimatId) {
        let Some(node) = self.nodes.get_mut(&id) else {
            return;
        };
        node.live = false;

        let mut current = id;
        loop {
            let prunable = self
                .nodes
                .get(&current)
                .is_some_and(|n| !n.live && n.children == 0);
            if !prunable {
                break;
            }
            let Some(removed) = self.nodes.remove(&current) else {
                break;
            };
            let Some(parent) = removed.animat.parent else {
                break;
            };
            match self.nodes.get_mut(&parent) {
                Some(node) => {
                    node.children = node.children.saturating_sub(1);
                    current = parent;
                }
                None => break,
            }
        }
    }

    /// Get a tracked animat by ID.
    pub fn get(&self, id: AnimatId) -> Option<&Animat> {
        self.nodes.get(&id).map(|n| &n.animat)
    }

    /// Ancestry of `id`, newest first: the animat itself, its parent, and so
    /// on down to its generation-0 root.
    pub fn lineage(&self, id: AnimatId) -> Vec<&Animat> {
        let mut lineage = Vec::new();
        let mut current = self.get(id);
        while let Some(animat) = current {
            lineage.push(animat);
            current = animat.parent.and_then(|p| self.get(p));
        }
        lineage
    }

    /// Every `stride`-th entry of [`lineage`](Self::lineage), starting with
    /// the animat itself.
    pub fn sampled_lineage(&self, id: AnimatId, stride: usize) -> Vec<AnimatRecord> {
        self.lineage(id)
            .into_iter()
            .step_by(stride.max(1))
            .map(Animat::to_record)
            .collect()
    }

    /// Number of tracked animats.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
