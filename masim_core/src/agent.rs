//! A dynamical agent and its recorded trajectory.
//!
//! Each agent owns its own history exclusively: controllers and the
//! orchestrator read it, only the agent's own `advance` appends to it.

use nalgebra::DVector;
use tracing::debug;

use crate::error::SimError;
use crate::solver::{self, SolverConfig};

/// State transition law `(time, state, input) -> state derivative`, injected
/// at construction. Must be deterministic in its arguments; it is evaluated
/// many times per control interval by the solver.
pub type DynamicsFn = Box<dyn Fn(f64, &DVector<f64>, &DVector<f64>) -> DVector<f64> + Send + Sync>;

/// Optional communicated-output map `(state, input) -> output` of dimension
/// `output_dim`. Agents without one communicate their state directly.
pub type OutputFn = Box<dyn Fn(&DVector<f64>, &DVector<f64>) -> DVector<f64> + Send + Sync>;

/// Construction parameters for an [`Agent`].
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Number of states `ns`
    pub state_dim: usize,

    /// Number of control inputs `ni`
    pub input_dim: usize,

    /// Number of communicated outputs `no`
    pub output_dim: usize,

    /// Simulation time of the first trajectory sample. Non-zero for agents
    /// introduced after the start of a wider simulation.
    pub start_time: f64,

    /// Initial state; defaults to the zero vector of length `state_dim`
    pub initial_state: Option<DVector<f64>>,

    /// Network-unique identity, matching the agent's row in the adjacency
    /// matrix. Required.
    pub index: Option<usize>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            state_dim: 2,
            input_dim: 1,
            output_dim: 1,
            start_time: 0.0,
            initial_state: None,
            index: None,
        }
    }
}

/// An agent with a continuous state evolving under an injected dynamics
/// function and a piecewise-constant control input.
pub struct Agent {
    index: usize,
    state_dim: usize,
    input_dim: usize,
    output_dim: usize,
    start_time: f64,
    dynamics: DynamicsFn,
    output: Option<OutputFn>,
    solver: SolverConfig,

    // Parallel trajectory history; equal lengths after every call.
    times: Vec<f64>,
    states: Vec<DVector<f64>>,
    inputs: Vec<DVector<f64>>,
}

impl Agent {
    /// Creates an agent whose trajectory holds exactly one sample: the
    /// initial state at `start_time`, paired with a zero input.
    pub fn new(config: AgentConfig, dynamics: DynamicsFn) -> Result<Self, SimError> {
        let index = config
            .index
            .ok_or_else(|| SimError::configuration("agent index must be set"))?;

        let initial_state = match config.initial_state {
            Some(state) if state.len() == config.state_dim => state,
            Some(state) => {
                return Err(SimError::configuration(format!(
                    "agent {}: initial state has {} entries, expected {}",
                    index,
                    state.len(),
                    config.state_dim
                )))
            }
            None => DVector::zeros(config.state_dim),
        };

        debug!(
            "agent {} instantiated ({} states, {} inputs, t_start={})",
            index, config.state_dim, config.input_dim, config.start_time
        );

        Ok(Self {
            index,
            state_dim: config.state_dim,
            input_dim: config.input_dim,
            output_dim: config.output_dim,
            start_time: config.start_time,
            dynamics,
            output: None,
            solver: SolverConfig::default(),
            times: vec![config.start_time],
            states: vec![initial_state],
            inputs: vec![DVector::zeros(config.input_dim)],
        })
    }

    /// Sets the communicated-output map.
    pub fn with_output(mut self, output: OutputFn) -> Self {
        self.output = Some(output);
        self
    }

    /// Overrides the solver tolerances for this agent.
    pub fn with_solver_config(mut self, config: SolverConfig) -> Self {
        self.solver = config;
        self
    }

    /// Integrates the dynamics from the last recorded sample to
    /// `target_time`, holding `input` constant over the interval, and appends
    /// the resulting sample.
    ///
    /// On solver failure nothing is appended; the history through the last
    /// successful step stays readable.
    pub fn advance(&mut self, target_time: f64, input: &DVector<f64>) -> Result<(), SimError> {
        let last_time = self.times[self.times.len() - 1];
        if !(target_time > last_time) {
            return Err(SimError::configuration(format!(
                "agent {}: target time {} does not exceed last recorded time {}",
                self.index, target_time, last_time
            )));
        }
        if input.len() != self.input_dim {
            return Err(SimError::configuration(format!(
                "agent {}: input has {} entries, expected {}",
                self.index,
                input.len(),
                self.input_dim
            )));
        }

        let dynamics = &self.dynamics;
        let state = solver::integrate(
            |t, x| dynamics(t, x, input),
            last_time,
            &self.states[self.states.len() - 1],
            target_time,
            &self.solver,
        )
        .map_err(|source| SimError::Integration {
            agent: self.index,
            time: target_time,
            source,
        })?;

        self.times.push(target_time);
        self.states.push(state);
        self.inputs.push(input.clone());
        Ok(())
    }

    /// The most recent state sample.
    pub fn current_state(&self) -> &DVector<f64> {
        &self.states[self.states.len() - 1]
    }

    /// The most recent communicated output: the output map applied to the
    /// latest sample, or the state itself when no map is set.
    pub fn current_output(&self) -> DVector<f64> {
        let state = self.current_state();
        let input = &self.inputs[self.inputs.len() - 1];
        match &self.output {
            Some(output) => output(state, input),
            None => state.clone(),
        }
    }

    /// Sample times, strictly increasing, starting at `start_time`.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// State samples, one per entry of [`Agent::times`].
    pub fn states(&self) -> &[DVector<f64>] {
        &self.states
    }

    /// Input samples, one per entry of [`Agent::times`].
    pub fn inputs(&self) -> &[DVector<f64>] {
        &self.inputs
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false; the trajectory holds its initial sample from birth.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }
}
