//! Error types for the simulation engine.

use thiserror::Error;

use crate::solver::SolverError;

/// Errors surfaced by the simulation engine.
///
/// Every operation propagates its error to the direct caller; the engine
/// performs no silent recovery and no default substitution.
#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid construction or run parameters (missing agent index, state
    /// shape mismatch, non-positive step size, ...)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed network topology (fewer than two agents, adjacency size
    /// mismatch, non-zero diagonal, ...)
    #[error("Topology error: {0}")]
    Topology(String),

    /// The ODE solver failed to converge while advancing an agent. The
    /// agent's trajectory is left intact through its last successful step.
    #[error("Integration error for agent {agent} at t={time}: {source}")]
    Integration {
        /// Index of the agent whose advance failed
        agent: usize,
        /// Target time of the failed advance
        time: f64,
        /// Underlying solver failure
        source: SolverError,
    },
}

impl SimError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a topology error.
    pub fn topology(msg: impl Into<String>) -> Self {
        Self::Topology(msg.into())
    }
}
