//! The multi-agent system orchestrator.
//!
//! Owns a network and a control law and drives them over a closed discrete
//! time grid. Each grid step runs in two phases: first every agent's control
//! input is computed against histories recorded through the previous grid
//! point, then every agent is advanced in ascending index order. No agent's
//! same-step update is ever visible to another agent's control computation.

use nalgebra::DVector;
use tracing::{debug, info};

use crate::controller::DistributedController;
use crate::error::SimError;
use crate::network::Network;

/// Parameters of one `run` invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    pub start_time: f64,
    pub end_time: f64,
    pub step_size: f64,
}

/// Orchestrates one simulation: a network of agents plus the distributed
/// control law that couples them.
pub struct MultiAgentSystem<C: DistributedController> {
    network: Network,
    controller: C,
    last_run: Option<RunParams>,
}

impl<C: DistributedController> MultiAgentSystem<C> {
    /// Stores the network and controller; computes nothing.
    pub fn new(network: Network, controller: C) -> Self {
        Self {
            network,
            controller,
            last_run: None,
        }
    }

    /// Advances every agent synchronously from `start_time` to `end_time`.
    ///
    /// The grid has `floor((end_time - start_time) / step_size) + 1` evenly
    /// spaced points with both ends inclusive; the final point is exactly
    /// `end_time`, so the boundary spacing may differ slightly from
    /// `step_size` when the horizon is not an exact multiple of it.
    ///
    /// The first integration failure aborts the run and propagates; every
    /// trajectory recorded through the last successful step stays readable
    /// for post-mortem inspection.
    pub fn run(&mut self, start_time: f64, end_time: f64, step_size: f64) -> Result<(), SimError> {
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(SimError::configuration(format!(
                "step size must be positive and finite, got {}",
                step_size
            )));
        }
        if !start_time.is_finite() || !end_time.is_finite() || end_time <= start_time {
            return Err(SimError::configuration(format!(
                "end time {} must exceed start time {}",
                end_time, start_time
            )));
        }

        self.last_run = Some(RunParams {
            start_time,
            end_time,
            step_size,
        });

        let grid = time_grid(start_time, end_time, step_size);
        info!(
            "running {} agents over [{}, {}] ({} grid points)",
            self.network.len(),
            start_time,
            end_time,
            grid.len()
        );

        // Progress line roughly once per simulated second
        let stride = ((1.0 / step_size).round() as usize).max(1);

        for k in 1..grid.len() {
            let t_prev = grid[k - 1];
            let t = grid[k];

            // Phase 1: every input for this step, computed while all
            // histories still end at t_prev.
            let inputs: Vec<DVector<f64>> = (0..self.network.len())
                .map(|i| self.controller.compute(&self.network, i, t_prev))
                .collect();

            // Phase 2: apply all advances, ascending index order.
            for (agent, input) in self.network.agents_mut().iter_mut().zip(&inputs) {
                agent.advance(t, input)?;
            }

            if k % stride == 0 {
                debug!("  t={:.3} | {}/{} steps", t, k, grid.len() - 1);
            }
        }

        info!("run complete at t={}", end_time);
        Ok(())
    }

    /// The coordinated network, for reading trajectories after a run.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The control law.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Parameters of the most recent `run` call, if any.
    pub fn last_run(&self) -> Option<RunParams> {
        self.last_run
    }

    /// Releases the network, e.g. to hand trajectories to a reporting layer.
    pub fn into_network(self) -> Network {
        self.network
    }
}

/// Closed, evenly spaced time grid: `floor((end - start) / step) + 1` points,
/// first exactly `start`, last exactly `end`. A horizon shorter than one step
/// collapses to the single point `start`.
pub fn time_grid(start: f64, end: f64, step: f64) -> Vec<f64> {
    let segments = ((end - start) / step).floor() as usize;
    if segments == 0 {
        return vec![start];
    }

    let mut grid: Vec<f64> = (0..=segments)
        .map(|k| start + (end - start) * k as f64 / segments as f64)
        .collect();
    grid[segments] = end;
    grid
}
