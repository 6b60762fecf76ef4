//! Simulator contract and the reference block-catching world.
//!
//! The evolutionary engine only knows the [`Simulator`] trait: given a genome
//! it produces raw trials of unit states plus correct/incorrect trial counts.
//! [`run_simulation`] normalizes that output into a flat [`Trajectory`] that
//! fitness functions consume.

use crate::schema::{Genome, MIN_WORLD_WIDTH, WorldConfig};

use super::brain::MarkovBrain;

/// Raw simulator output: trials × timesteps × unit states.
#[derive(Debug, Clone, Default)]
pub struct SimulationOutput {
    pub trials: Vec<Vec<Vec<u8>>>,
    pub correct: u32,
    pub incorrect: u32,
}

/// Turns a genome into a behavioral trajectory.
///
/// Implementations must be deterministic for a fixed genome and world.
pub trait Simulator: Send + Sync {
    /// World dimensions the simulator was built for.
    fn world(&self) -> &WorldConfig;

    /// Play every trial for `genome`.
    fn simulate(&self, genome: &Genome) -> Result<SimulationOutput, SimulationError>;
}

/// Normalized trajectory: every timestep of every trial is a fixed-width
/// vector of binary unit states (sensors, hidden, motors).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trajectory {
    num_units: usize,
    num_trials: usize,
    steps_per_trial: usize,
    states: Vec<u8>,
}

impl Trajectory {
    /// Flatten raw trials, checking that every state has `num_units` binary entries
    /// and every trial has the same length.
    pub fn from_trials(trials: &[Vec<Vec<u8>>], num_units: usize) -> Result<Self, SimulationError> {
        let steps_per_trial = trials.first().map_or(0, Vec::len);
        let mut states = Vec::with_capacity(trials.len() * steps_per_trial * num_units);

        for (trial_index, trial) in trials.iter().enumerate() {
            if trial.len() != steps_per_trial {
                return Err(SimulationError::MalformedTrajectory(format!(
                    "trial {trial_index} has {} timesteps, expected {steps_per_trial}",
                    trial.len()
                )));
            }
            for (step, state) in trial.iter().enumerate() {
                if state.len() != num_units {
                    return Err(SimulationError::MalformedTrajectory(format!(
                        "trial {trial_index} step {step} has {} units, expected {num_units}",
                        state.len()
                    )));
                }
                if state.iter().any(|&v| v > 1) {
                    return Err(SimulationError::MalformedTrajectory(format!(
                        "trial {trial_index} step {step} contains non-binary unit states"
                    )));
                }
                states.extend_from_slice(state);
            }
        }

        Ok(Self {
            num_units,
            num_trials: trials.len(),
            steps_per_trial,
            states,
        })
    }

    #[inline]
    pub fn num_units(&self) -> usize {
        self.num_units
    }

    #[inline]
    pub fn num_trials(&self) -> usize {
        self.num_trials
    }

    #[inline]
    pub fn steps_per_trial(&self) -> usize {
        self.steps_per_trial
    }

    /// Total number of recorded timesteps.
    #[inline]
    pub fn len(&self) -> usize {
        self.num_trials * self.steps_per_trial
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Every timestep state in trial order.
    pub fn states(&self) -> impl Iterator<Item = &[u8]> {
        self.states.chunks_exact(self.num_units.max(1))
    }

    /// States of a single trial.
    pub fn trial(&self, index: usize) -> impl Iterator<Item = &[u8]> {
        let width = self.num_units * self.steps_per_trial;
        self.states[index * width..(index + 1) * width].chunks_exact(self.num_units.max(1))
    }
}

/// Normalized simulation result handed to fitness functions.
#[derive(Debug, Clone)]
pub struct Simulation {
    pub trajectory: Trajectory,
    pub correct: u32,
    pub incorrect: u32,
}

/// Run `simulator` once and normalize its output.
pub fn run_simulation(
    simulator: &dyn Simulator,
    genome: &Genome,
) -> Result<Simulation, SimulationError> {
    let output = simulator.simulate(genome)?;
    let trajectory = Trajectory::from_trials(&output.trials, simulator.world().num_units())?;
    Ok(Simulation {
        trajectory,
        correct: output.correct,
        incorrect: output.incorrect,
    })
}

/// Simulator failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("Malformed trajectory: {0}")]
    MalformedTrajectory(String),
    #[error("Invalid world: {0}")]
    InvalidWorld(String),
    #[error("Simulator failed: {0}")]
    Failed(String),
}

// ============================================================================
// Reference world
// ============================================================================

/// Width of the animat's body in cells.
const BODY_WIDTH: usize = MIN_WORLD_WIDTH;

/// A falling block and whether it should be caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPattern {
    pub width: usize,
    pub catch: bool,
}

/// Default task: catch small blocks, avoid large ones.
pub const DEFAULT_BLOCKS: [BlockPattern; 2] = [
    BlockPattern {
        width: 3,
        catch: true,
    },
    BlockPattern {
        width: 4,
        catch: false,
    },
];

/// Markov-brain animat in a wrapping block-catching world.
///
/// Every block pattern is dropped from every start column, drifting one cell
/// left or right per timestep, for `world_height` timesteps. The animat starts
/// at column 0; its sensors are spread across its body and its first two
/// motors move it left or right when exactly one of them is active.
#[derive(Debug, Clone)]
pub struct BlockWorld {
    world: WorldConfig,
    blocks: Vec<BlockPattern>,
}

impl BlockWorld {
    pub fn new(world: WorldConfig) -> Self {
        Self {
            world,
            blocks: DEFAULT_BLOCKS.to_vec(),
        }
    }

    /// Replace the block patterns.
    pub fn with_blocks(mut self, blocks: Vec<BlockPattern>) -> Self {
        self.blocks = blocks;
        self
    }

    /// Body offset of each sensor.
    fn sensor_offsets(&self) -> Vec<usize> {
        let n = self.world.num_sensors;
        if n == 1 {
            return vec![BODY_WIDTH / 2];
        }
        (0..n).map(|k| k * (BODY_WIDTH - 1) / (n - 1)).collect()
    }

    fn covers(&self, left: usize, width: usize, cell: usize) -> bool {
        let w = self.world.world_width;
        (cell + w - left) % w < width
    }

    fn play_trial(
        &self,
        brain: &MarkovBrain,
        block: BlockPattern,
        direction: isize,
        start: usize,
    ) -> (Vec<Vec<u8>>, bool) {
        let width = self.world.world_width;
        let num_units = self.world.num_units();
        let motor_offset = self.world.motor_offset();
        let sensor_offsets = self.sensor_offsets();

        let mut state = vec![0u8; num_units];
        let mut next = vec![0u8; num_units];
        let mut animat_x = 0usize;
        let mut block_x = start;
        let mut states = Vec::with_capacity(self.world.world_height);

        for _ in 0..self.world.world_height {
            for (k, &offset) in sensor_offsets.iter().enumerate() {
                let cell = (animat_x + offset) % width;
                state[k] = self.covers(block_x, block.width, cell) as u8;
            }
            states.push(state.clone());

            brain.step(&state, &mut next);
            std::mem::swap(&mut state, &mut next);

            let left = state[motor_offset] == 1;
            let right = self.world.num_motors > 1 && state[motor_offset + 1] == 1;
            match (left, right) {
                (true, false) if self.world.num_motors > 1 => {
                    animat_x = (animat_x + width - 1) % width
                }
                (true, false) => animat_x = (animat_x + 1) % width,
                (false, true) => animat_x = (animat_x + 1) % width,
                _ => {}
            }

            block_x = (block_x as isize + direction).rem_euclid(width as isize) as usize;
        }

        let caught = (0..BODY_WIDTH).any(|offset| {
            self.covers(block_x, block.width, (animat_x + offset) % width)
        });
        (states, caught == block.catch)
    }
}

impl Simulator for BlockWorld {
    fn world(&self) -> &WorldConfig {
        &self.world
    }

    fn simulate(&self, genome: &Genome) -> Result<SimulationOutput, SimulationError> {
        if self.world.world_width < BODY_WIDTH {
            return Err(SimulationError::InvalidWorld(format!(
                "world width {} is narrower than the body ({BODY_WIDTH})",
                self.world.world_width
            )));
        }

        let brain = MarkovBrain::from_genome(genome.codons(), self.world.num_units());
        let mut output = SimulationOutput::default();

        for &block in &self.blocks {
            for direction in [-1isize, 1] {
                for start in 0..self.world.world_width {
                    let (states, correct) = self.play_trial(&brain, block, direction, start);
                    output.trials.push(states);
                    if correct {
                        output.correct += 1;
                    } else {
                        output.incorrect += 1;
                    }
                }
            }
        }

        Ok(output)
    }
}
