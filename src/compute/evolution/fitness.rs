//! Fitness functions for driving animat evolution.
//!
//! Fitness functions are registered by name in a [`FitnessRegistry`] built at
//! start-up. Each receives an [`EvalContext`] that runs the simulator lazily
//! and at most once, so a function deriving several statistics from the same
//! trajectory never replays the game.
//!
//! Single-objective functions return one score. Multi-objective functions
//! return a vector whose first element drives selection; the remaining
//! elements are reporting-only auxiliary metrics.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::compute::simulator::{
    Simulation, SimulationError, Simulator, Trajectory, run_simulation,
};
use crate::schema::WorldConfig;

use super::lineage::{Animat, AnimatId, Fitness};

/// Whether a function returns one score or a score plus auxiliary metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitnessMode {
    Single,
    Multi,
}

impl fmt::Display for FitnessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessMode::Single => write!(f, "single-objective"),
            FitnessMode::Multi => write!(f, "multi-objective"),
        }
    }
}

/// Value returned by a fitness function.
#[derive(Debug, Clone, PartialEq)]
pub enum FitnessOutput {
    Single(f64),
    /// Element 0 is the selection score; the rest are auxiliary metrics.
    Multi(Vec<f64>),
}

/// Everything a fitness function may look at for one animat.
pub struct EvalContext<'a> {
    animat: &'a Animat,
    simulator: &'a dyn Simulator,
    simulation: OnceCell<Simulation>,
}

impl<'a> EvalContext<'a> {
    pub fn new(animat: &'a Animat, simulator: &'a dyn Simulator) -> Self {
        Self {
            animat,
            simulator,
            simulation: OnceCell::new(),
        }
    }

    /// Animat under evaluation.
    pub fn animat(&self) -> &Animat {
        self.animat
    }

    /// World the simulator was built for.
    pub fn world(&self) -> &WorldConfig {
        self.simulator.world()
    }

    /// Play the game for this animat, or return the cached result.
    pub fn simulation(&self) -> Result<&Simulation, SimulationError> {
        if let Some(simulation) = self.simulation.get() {
            return Ok(simulation);
        }
        let simulation = run_simulation(self.simulator, &self.animat.genome)?;
        Ok(self.simulation.get_or_init(|| simulation))
    }

    fn into_simulation(self) -> Option<Simulation> {
        self.simulation.into_inner()
    }
}

type FitnessFn =
    Arc<dyn Fn(&EvalContext<'_>) -> Result<FitnessOutput, SimulationError> + Send + Sync>;

fn shared<F>(func: F) -> FitnessFn
where
    F: Fn(&EvalContext<'_>) -> Result<FitnessOutput, SimulationError> + Send + Sync + 'static,
{
    Arc::new(func)
}

/// A named, documented fitness function.
#[derive(Clone)]
pub struct FitnessFunction {
    pub name: String,
    pub description: String,
    pub mode: FitnessMode,
    func: FitnessFn,
}

impl FitnessFunction {
    /// Register a function returning one score.
    pub fn single<F>(name: &str, description: &str, func: F) -> Self
    where
        F: Fn(&EvalContext<'_>) -> Result<f64, SimulationError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            mode: FitnessMode::Single,
            func: shared(move |ctx| func(ctx).map(FitnessOutput::Single)),
        }
    }

    /// Register a function returning a selection score plus auxiliary metrics.
    pub fn multi<F>(name: &str, description: &str, func: F) -> Self
    where
        F: Fn(&EvalContext<'_>) -> Result<Vec<f64>, SimulationError> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            mode: FitnessMode::Multi,
            func: shared(move |ctx| func(ctx).map(FitnessOutput::Multi)),
        }
    }

    /// Run the function on one animat.
    pub fn call(&self, ctx: &EvalContext<'_>) -> Result<FitnessOutput, SimulationError> {
        (self.func)(ctx)
    }
}

impl fmt::Debug for FitnessFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FitnessFunction")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Name-to-function mapping, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FitnessRegistry {
    functions: Vec<FitnessFunction>,
}

impl FitnessRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in functions.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(FitnessFunction::single(
            "nat",
            "Natural: Animats are evaluated based on the number of game trials they \
             successfully complete.",
            nat,
        ));
        registry.register(FitnessFunction::single(
            "mi",
            "Mutual information: Animats are evaluated based on the mutual information \
             between their sensors and motors.",
            mi,
        ));
        registry.register(FitnessFunction::single(
            "hid",
            "Hidden activity: Animats are evaluated based on the fraction of active \
             hidden units, averaged over every unique state the animat goes into during \
             a game.",
            hid,
        ));
        registry.register(FitnessFunction::multi(
            "nat_mi",
            "Natural with information: Animats are selected on the number of trials \
             they successfully complete; sensor-motor mutual information and the number \
             of unique states are recorded alongside.",
            nat_mi,
        ));
        registry
    }

    /// Add a function, replacing and returning any previous one of the same name.
    pub fn register(&mut self, function: FitnessFunction) -> Option<FitnessFunction> {
        match self.functions.iter_mut().find(|f| f.name == function.name) {
            Some(existing) => Some(std::mem::replace(existing, function)),
            None => {
                self.functions.push(function);
                None
            }
        }
    }

    /// Get a function by name.
    pub fn get(&self, name: &str) -> Option<&FitnessFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Functions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FitnessFunction> {
        self.functions.iter()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.name.as_str()).collect()
    }

    /// Human-readable listing of every function.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for function in &self.functions {
            out.push_str(&format!(
                "\n{} ({})\n    {}\n",
                function.name, function.mode, function.description
            ));
        }
        out.push_str(
            "\nNB: In order to make selection pressure more even, the fitness used in \
             the selection algorithm is transformed so that it is exponential: \
             `fitness_base` is the base and the fitnesses described above are the \
             exponent.\n",
        );
        out
    }
}

/// Outcome of evaluating one animat.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub fitness: Fitness,
    pub aux: Vec<f64>,
    pub correct: u32,
    pub incorrect: u32,
}

impl Evaluation {
    /// Copy the results onto `animat`.
    pub fn apply(self, animat: &mut Animat) {
        animat.fitness = Some(self.fitness);
        animat.aux = self.aux;
        animat.correct = self.correct;
        animat.incorrect = self.incorrect;
    }
}

/// Runs a fitness function over populations, in parallel.
pub struct FitnessEvaluator {
    function: FitnessFunction,
    base: f64,
    pool: Option<rayon::ThreadPool>,
}

impl FitnessEvaluator {
    /// Create an evaluator. `workers == 0` uses rayon's global pool.
    pub fn new(
        function: FitnessFunction,
        base: f64,
        workers: usize,
    ) -> Result<Self, rayon::ThreadPoolBuildError> {
        let pool = if workers > 0 {
            Some(rayon::ThreadPoolBuilder::new().num_threads(workers).build()?)
        } else {
            None
        };
        Ok(Self {
            function,
            base,
            pool,
        })
    }

    /// Function being evaluated.
    pub fn function(&self) -> &FitnessFunction {
        &self.function
    }

    /// Evaluate a single animat.
    pub fn evaluate(
        &self,
        animat: &Animat,
        simulator: &dyn Simulator,
    ) -> Result<Evaluation, EvaluationError> {
        let ctx = EvalContext::new(animat, simulator);
        let output = self
            .function
            .call(&ctx)
            .map_err(|source| EvaluationError::Simulation {
                animat: animat.id,
                generation: animat.generation,
                function: self.function.name.clone(),
                source,
            })?;

        let (raw, aux) = match (self.function.mode, output) {
            (FitnessMode::Single, FitnessOutput::Single(raw)) => (raw, Vec::new()),
            (FitnessMode::Multi, FitnessOutput::Multi(mut values)) => {
                if values.is_empty() {
                    return Err(EvaluationError::Empty {
                        animat: animat.id,
                        generation: animat.generation,
                        function: self.function.name.clone(),
                    });
                }
                let raw = values.remove(0);
                (raw, values)
            }
            (expected, _) => {
                return Err(EvaluationError::ModeMismatch {
                    function: self.function.name.clone(),
                    expected,
                });
            }
        };

        let fitness = Fitness::from_raw(raw, self.base);
        if !raw.is_finite() || !fitness.value.is_finite() {
            return Err(EvaluationError::NonFinite {
                animat: animat.id,
                generation: animat.generation,
                function: self.function.name.clone(),
                value: raw,
            });
        }

        let (correct, incorrect) = ctx
            .into_simulation()
            .map_or((0, 0), |s| (s.correct, s.incorrect));

        Ok(Evaluation {
            fitness,
            aux,
            correct,
            incorrect,
        })
    }

    /// Evaluate every animat on the worker pool. Results are in population
    /// order; on failure the error of the lowest-indexed animat is returned.
    pub fn evaluate_population(
        &self,
        population: &[Animat],
        simulator: &dyn Simulator,
    ) -> Result<Vec<Evaluation>, EvaluationError> {
        let run = || -> Vec<Result<Evaluation, EvaluationError>> {
            population
                .par_iter()
                .map(|animat| self.evaluate(animat, simulator))
                .collect()
        };
        let results = match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        };
        results.into_iter().collect()
    }
}

/// Fitness evaluation failures. All are fatal for the run.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("Simulation failed for animat {animat} (generation {generation}, fitness function '{function}'): {source}")]
    Simulation {
        animat: AnimatId,
        generation: u64,
        function: String,
        #[source]
        source: SimulationError,
    },
    #[error("Non-finite fitness {value} for animat {animat} (generation {generation}, fitness function '{function}')")]
    NonFinite {
        animat: AnimatId,
        generation: u64,
        function: String,
        value: f64,
    },
    #[error("Fitness function '{function}' returned no values for animat {animat} (generation {generation})")]
    Empty {
        animat: AnimatId,
        generation: u64,
        function: String,
    },
    #[error("Fitness function '{function}' did not return a {expected} result")]
    ModeMismatch {
        function: String,
        expected: FitnessMode,
    },
}

// ============================================================================
// State Statistics
// ============================================================================

/// Distinct states of `trajectory` with their occurrence counts, most common
/// first. Ties keep first-encountered order. `n` restricts the result to the
/// `n` most common states.
pub fn most_common_states(trajectory: &Trajectory, n: Option<usize>) -> Vec<(&[u8], usize)> {
    let mut index: HashMap<&[u8], usize> = HashMap::new();
    let mut counts: Vec<(&[u8], usize)> = Vec::new();
    for state in trajectory.states() {
        match index.get(state) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(state, counts.len());
                counts.push((state, 1));
            }
        }
    }
    // Stable sort keeps first-encountered order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    if let Some(n) = n {
        counts.truncate(n);
    }
    counts
}

/// Mean of `metric` over each distinct state, every state weighted equally
/// regardless of how often it occurs. Returns 0 for an empty trajectory.
pub fn average_over_states<F>(trajectory: &Trajectory, n: Option<usize>, metric: F) -> f64
where
    F: Fn(&[u8], usize) -> f64,
{
    let states = most_common_states(trajectory, n);
    if states.is_empty() {
        return 0.0;
    }
    let sum: f64 = states.iter().map(|&(state, count)| metric(state, count)).sum();
    sum / states.len() as f64
}

/// Pack `bits` into an integer, first bit most significant.
fn state_index(bits: &[u8]) -> usize {
    bits.iter().fold(0usize, |acc, &b| (acc << 1) | (b & 1) as usize)
}

/// Mutual information, in bits, between sensor and motor states over every
/// timestep of `trajectory`.
pub fn mutual_information(trajectory: &Trajectory, world: &WorldConfig) -> f64 {
    let num_sensor_states = 1usize << world.num_sensors;
    let num_motor_states = 1usize << world.num_motors;
    let motor_offset = world.motor_offset();

    let mut contingency = vec![0usize; num_sensor_states * num_motor_states];
    let mut total = 0usize;
    for state in trajectory.states() {
        let sensor = state_index(&state[..world.num_sensors]);
        let motor = state_index(&state[motor_offset..motor_offset + world.num_motors]);
        contingency[sensor * num_motor_states + motor] += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let mut sensor_marginal = vec![0usize; num_sensor_states];
    let mut motor_marginal = vec![0usize; num_motor_states];
    for s in 0..num_sensor_states {
        for m in 0..num_motor_states {
            let count = contingency[s * num_motor_states + m];
            sensor_marginal[s] += count;
            motor_marginal[m] += count;
        }
    }

    let total = total as f64;
    let mut mi = 0.0;
    for s in 0..num_sensor_states {
        for m in 0..num_motor_states {
            let joint = contingency[s * num_motor_states + m];
            if joint == 0 {
                continue;
            }
            let p_joint = joint as f64 / total;
            let p_sensor = sensor_marginal[s] as f64 / total;
            let p_motor = motor_marginal[m] as f64 / total;
            mi += p_joint * (p_joint / (p_sensor * p_motor)).log2();
        }
    }
    mi.max(0.0)
}

// ============================================================================
// Built-in Functions
// ============================================================================

fn nat(ctx: &EvalContext<'_>) -> Result<f64, SimulationError> {
    Ok(ctx.simulation()?.correct as f64)
}

fn mi(ctx: &EvalContext<'_>) -> Result<f64, SimulationError> {
    let simulation = ctx.simulation()?;
    Ok(mutual_information(&simulation.trajectory, ctx.world()))
}

fn hid(ctx: &EvalContext<'_>) -> Result<f64, SimulationError> {
    let world = ctx.world();
    if world.num_hidden == 0 {
        return Ok(0.0);
    }
    let hidden = world.hidden_offset()..world.motor_offset();
    let simulation = ctx.simulation()?;
    Ok(average_over_states(&simulation.trajectory, None, |state, _| {
        let active = state[hidden.clone()].iter().filter(|&&u| u == 1).count();
        active as f64 / world.num_hidden as f64
    }))
}

fn nat_mi(ctx: &EvalContext<'_>) -> Result<Vec<f64>, SimulationError> {
    let simulation = ctx.simulation()?;
    let trajectory = &simulation.trajectory;
    Ok(vec![
        simulation.correct as f64,
        mutual_information(trajectory, ctx.world()),
        most_common_states(trajectory, None).len() as f64,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::simulator::SimulationOutput;
    use crate::schema::Genome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays fixed trials and counts calls.
    struct FixedSimulator {
        world: WorldConfig,
        trials: Vec<Vec<Vec<u8>>>,
        calls: AtomicUsize,
    }

    impl FixedSimulator {
        fn new(
            num_sensors: usize,
            num_hidden: usize,
            num_motors: usize,
            trials: Vec<Vec<Vec<u8>>>,
        ) -> Self {
            Self {
                world: WorldConfig {
                    num_sensors,
                    num_hidden,
                    num_motors,
                    ..Default::default()
                },
                trials,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Simulator for FixedSimulator {
        fn world(&self) -> &WorldConfig {
            &self.world
        }

        fn simulate(&self, _genome: &Genome) -> Result<SimulationOutput, SimulationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(SimulationOutput {
                trials: self.trials.clone(),
                correct: 3,
                incorrect: 1,
            })
        }
    }

    fn animat() -> Animat {
        Animat::founder(AnimatId(0), Genome::new(vec![127; 10]))
    }

    fn trajectory(trials: &[Vec<Vec<u8>>], num_units: usize) -> Trajectory {
        Trajectory::from_trials(trials, num_units).unwrap()
    }

    #[test]
    fn test_builtins_registered() {
        let registry = FitnessRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["nat", "mi", "hid", "nat_mi"]);
        assert_eq!(registry.get("nat_mi").map(|f| f.mode), Some(FitnessMode::Multi));
        assert!(registry.get("missing").is_none());

        let listing = registry.describe();
        assert!(listing.contains("nat (single-objective)"));
        assert!(listing.contains("fitness_base"));
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = FitnessRegistry::with_builtins();
        let previous = registry.register(FitnessFunction::single("nat", "constant", |_| Ok(1.0)));
        assert!(previous.is_some());
        assert_eq!(registry.names().len(), 4);
        assert_eq!(registry.get("nat").map(|f| f.description.as_str()), Some("constant"));
    }

    #[test]
    fn test_simulator_called_once() {
        let simulator = FixedSimulator::new(1, 0, 1, vec![vec![vec![1, 0]]]);
        let function = FitnessFunction::single("twice", "uses the game twice", |ctx| {
            let a = ctx.simulation()?.correct;
            let b = ctx.simulation()?.incorrect;
            Ok((a + b) as f64)
        });
        let evaluator = FitnessEvaluator::new(function, 1.02, 0).unwrap();

        let evaluation = evaluator.evaluate(&animat(), &simulator).unwrap();
        assert_eq!(evaluation.fitness.raw, 4.0);
        assert_eq!(evaluation.correct, 3);
        assert_eq!(simulator.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_multi_objective_aux() {
        let simulator = FixedSimulator::new(1, 0, 1, vec![]);
        let function =
            FitnessFunction::multi("multi", "score plus aux", |_| Ok(vec![2.0, 100.0, -5.0]));
        let evaluator = FitnessEvaluator::new(function, 1.02, 0).unwrap();

        let evaluation = evaluator.evaluate(&animat(), &simulator).unwrap();
        assert_eq!(evaluation.fitness.raw, 2.0);
        assert!((evaluation.fitness.value - 1.0404).abs() < 1e-12);
        assert_eq!(evaluation.aux, vec![100.0, -5.0]);
        // The function never asked for the game.
        assert_eq!(simulator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(evaluation.correct, 0);
    }

    #[test]
    fn test_non_finite_fitness_is_fatal() {
        let simulator = FixedSimulator::new(1, 0, 1, vec![]);
        let function = FitnessFunction::single("nan", "broken", |_| Ok(f64::NAN));
        let evaluator = FitnessEvaluator::new(function, 1.02, 0).unwrap();

        let mut subject = animat();
        subject.id = AnimatId(17);
        subject.generation = 4;
        let err = evaluator.evaluate(&subject, &simulator).unwrap_err();
        match &err {
            EvaluationError::NonFinite {
                animat,
                generation,
                function,
                ..
            } => {
                assert_eq!(*animat, AnimatId(17));
                assert_eq!(*generation, 4);
                assert_eq!(function, "nan");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(err.to_string().contains("#17"));
    }

    #[test]
    fn test_overflowing_transform_is_fatal() {
        let simulator = FixedSimulator::new(1, 0, 1, vec![]);
        let function = FitnessFunction::single("huge", "overflows", |_| Ok(1.0e6));
        let evaluator = FitnessEvaluator::new(function, 1.02, 0).unwrap();
        assert!(matches!(
            evaluator.evaluate(&animat(), &simulator),
            Err(EvaluationError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_population_order_preserved() {
        let simulator = FixedSimulator::new(1, 0, 1, vec![]);
        let function =
            FitnessFunction::single("id", "animat id", |ctx| Ok(ctx.animat().id.0 as f64));
        let evaluator = FitnessEvaluator::new(function, 1.02, 3).unwrap();

        let population: Vec<Animat> = (0..50)
            .map(|i| Animat::founder(AnimatId(i), Genome::default()))
            .collect();
        let evaluations = evaluator.evaluate_population(&population, &simulator).unwrap();
        let raws: Vec<f64> = evaluations.iter().map(|e| e.fitness.raw).collect();
        let expected: Vec<f64> = (0..50).map(|i| i as f64).collect();
        assert_eq!(raws, expected);
    }

    #[test]
    fn test_most_common_states_order() {
        let trials = vec![vec![
            vec![0, 1],
            vec![1, 1],
            vec![0, 1],
            vec![1, 0],
            vec![1, 1],
            vec![0, 0],
        ]];
        let traj = trajectory(&trials, 2);

        let states = most_common_states(&traj, None);
        let expected: Vec<(&[u8], usize)> = vec![
            (&[0, 1][..], 2),
            (&[1, 1][..], 2),
            (&[1, 0][..], 1),
            (&[0, 0][..], 1),
        ];
        assert_eq!(states, expected);

        assert_eq!(most_common_states(&traj, Some(3)).len(), 3);
        assert_eq!(most_common_states(&traj, Some(10)).len(), 4);
    }

    #[test]
    fn test_average_weights_states_equally() {
        // State [1] occurs three times, [0] once: the equal-weight mean is 0.5.
        let trials = vec![vec![vec![1], vec![1], vec![1], vec![0]]];
        let traj = trajectory(&trials, 1);
        let mean = average_over_states(&traj, None, |state, _| state[0] as f64);
        assert_eq!(mean, 0.5);

        // Restricted to the single most common state.
        let top = average_over_states(&traj, Some(1), |state, _| state[0] as f64);
        assert_eq!(top, 1.0);
    }

    #[test]
    fn test_mutual_information() {
        let world = WorldConfig {
            num_sensors: 1,
            num_hidden: 0,
            num_motors: 1,
            ..Default::default()
        };

        // Motor copies the sensor: one bit.
        let copied = trajectory(&[vec![vec![0, 0], vec![1, 1], vec![0, 0], vec![1, 1]]], 2);
        assert!((mutual_information(&copied, &world) - 1.0).abs() < 1e-12);

        // Motor constant: zero.
        let constant = trajectory(&[vec![vec![0, 1], vec![1, 1], vec![0, 1], vec![1, 1]]], 2);
        assert_eq!(mutual_information(&constant, &world), 0.0);
    }

    #[test]
    fn test_hidden_activity() {
        let simulator = FixedSimulator::new(
            1,
            2,
            1,
            vec![vec![vec![0, 1, 1, 0], vec![0, 1, 1, 0], vec![1, 0, 0, 0]]],
        );
        let registry = FitnessRegistry::with_builtins();
        let hid = registry.get("hid").cloned().unwrap();
        let evaluator = FitnessEvaluator::new(hid, 1.02, 0).unwrap();

        let evaluation = evaluator.evaluate(&animat(), &simulator).unwrap();
        assert_eq!(evaluation.fitness.raw, 0.5);
    }

    #[test]
    fn test_nat_mi_builtin() {
        let simulator = FixedSimulator::new(1, 0, 1, vec![vec![vec![0, 0], vec![1, 1]]]);
        let registry = FitnessRegistry::with_builtins();
        let evaluator =
            FitnessEvaluator::new(registry.get("nat_mi").cloned().unwrap(), 1.02, 0).unwrap();

        let evaluation = evaluator.evaluate(&animat(), &simulator).unwrap();
        assert_eq!(evaluation.fitness.raw, 3.0);
        assert_eq!(evaluation.aux.len(), 2);
        assert!((evaluation.aux[0] - 1.0).abs() < 1e-12);
        assert_eq!(evaluation.aux[1], 2.0);
    }
}
