//! Simulation engine for networked multi-agent dynamical systems.
//!
//! A group of agents, each with its own continuous-time state trajectory,
//! evolves under a shared discrete-time distributed control law. The engine
//! couples three pieces:
//!
//! - **Agents** integrate their dynamics between control-update instants with
//!   an adaptive Dormand-Prince solver and record every `(time, state, input)`
//!   sample they produce.
//! - A static **Network** holds the adjacency relation and answers neighbour
//!   queries; control laws read neighbour state only through it.
//! - A **MultiAgentSystem** drives the discrete time grid. Each step is split
//!   into two phases: every control input is computed against histories
//!   recorded through the previous grid point, and only then is any agent
//!   advanced. Later agents never observe same-step updates.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                   MultiAgentSystem                    │
//! │  time grid │ phase 1: compute u_i for every agent     │
//! │            │ phase 2: advance every agent to t        │
//! │       ┌────▼─────┐                  ┌───────────────┐ │
//! │       │ Network  │◄─────────────────│ Distributed   │ │
//! │       │ adjacency│  neighbour state │ Controller    │ │
//! │       └────┬─────┘                  └───────────────┘ │
//! │       ┌────▼─────┐ ┌──────────┐ ┌──────────┐          │
//! │       │ Agent #0 │ │ Agent #1 │ │ Agent #2 │  ...     │
//! │       │ dopri5   │ │ dopri5   │ │ dopri5   │          │
//! │       └──────────┘ └──────────┘ └──────────┘          │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use masim_core::{Agent, AgentConfig, ConsensusLaw, MultiAgentSystem, Network};
//! use nalgebra::{dvector, DMatrix};
//!
//! let agents = (0..2)
//!     .map(|i| {
//!         let config = AgentConfig {
//!             state_dim: 1,
//!             input_dim: 1,
//!             initial_state: Some(dvector![5.0 * i as f64]),
//!             index: Some(i),
//!             ..Default::default()
//!         };
//!         Agent::new(config, Box::new(|_t, _x, u| u.clone())).unwrap()
//!     })
//!     .collect();
//!
//! let network = Network::new(DMatrix::from_row_slice(2, 2, &[0., 1., 1., 0.]), agents)?;
//! let law = ConsensusLaw::new(&network, 1.0)?;
//! let mut mas = MultiAgentSystem::new(network, law);
//! mas.run(0.0, 15.0, 0.05)?;
//! ```

pub mod agent;
pub mod controller;
pub mod error;
pub mod mas;
pub mod network;
pub mod solver;

pub use agent::{Agent, AgentConfig, DynamicsFn, OutputFn};
pub use controller::{ConsensusLaw, DistributedController};
pub use error::SimError;
pub use mas::{time_grid, MultiAgentSystem, RunParams};
pub use network::Network;
pub use solver::{SolverConfig, SolverError};
