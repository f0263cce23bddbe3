//! Static communication topology over a fixed set of agents.

use nalgebra::DMatrix;

use crate::agent::Agent;
use crate::error::SimError;

/// A fixed network: an adjacency matrix plus the agents it coordinates, in
/// index order. Immutable after construction; a different topology means a
/// different `Network`.
///
/// Entries are edge weights; any non-zero entry makes two agents neighbours.
/// Symmetry is not required, so directed topologies are representable.
pub struct Network {
    adjacency: DMatrix<f64>,
    agents: Vec<Agent>,
}

impl Network {
    /// Builds a network from an N x N adjacency matrix and N agents whose
    /// indices match their positions.
    pub fn new(adjacency: DMatrix<f64>, agents: Vec<Agent>) -> Result<Self, SimError> {
        let n = agents.len();
        if n < 2 {
            return Err(SimError::topology(format!(
                "a network needs at least two agents, got {}",
                n
            )));
        }
        if adjacency.nrows() != n || adjacency.ncols() != n {
            return Err(SimError::topology(format!(
                "adjacency matrix is {}x{}, expected {}x{} for {} agents",
                adjacency.nrows(),
                adjacency.ncols(),
                n,
                n,
                n
            )));
        }
        for i in 0..n {
            if adjacency[(i, i)] != 0.0 {
                return Err(SimError::topology(format!(
                    "adjacency diagonal must be zero, found {} at ({}, {})",
                    adjacency[(i, i)],
                    i,
                    i
                )));
            }
        }
        for (position, agent) in agents.iter().enumerate() {
            if agent.index() != position {
                return Err(SimError::topology(format!(
                    "agent at position {} carries index {}; agents must be \
                     ordered by their adjacency row",
                    position,
                    agent.index()
                )));
            }
        }

        Ok(Self { adjacency, agents })
    }

    /// Whether agent `j` is visible to agent `i`. An agent is never its own
    /// neighbour; out-of-range indices are simply not neighbours.
    pub fn are_neighbours(&self, i: usize, j: usize) -> bool {
        if i == j || i >= self.agents.len() || j >= self.agents.len() {
            return false;
        }
        self.adjacency[(i, j)] != 0.0
    }

    /// The agents, ordered by index.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// The agent with the given index.
    pub fn agent(&self, index: usize) -> &Agent {
        &self.agents[index]
    }

    /// Mutable agent access for the orchestrator's advance phase. Not public:
    /// controllers only ever read.
    pub(crate) fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Always false; construction requires at least two agents.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// The adjacency matrix.
    pub fn adjacency(&self) -> &DMatrix<f64> {
        &self.adjacency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use nalgebra::dvector;

    fn agent(index: usize) -> Agent {
        let config = AgentConfig {
            state_dim: 1,
            input_dim: 1,
            initial_state: Some(dvector![0.0]),
            index: Some(index),
            ..Default::default()
        };
        Agent::new(config, Box::new(|_t, _x, u| u.clone())).unwrap()
    }

    fn agents(n: usize) -> Vec<Agent> {
        (0..n).map(agent).collect()
    }

    #[test]
    fn single_agent_is_rejected() {
        let result = Network::new(DMatrix::zeros(1, 1), agents(1));

        assert!(matches!(result, Err(SimError::Topology(_))));
    }

    #[test]
    fn adjacency_size_mismatch_is_rejected() {
        let result = Network::new(DMatrix::zeros(2, 2), agents(3));

        assert!(matches!(result, Err(SimError::Topology(_))));
    }

    #[test]
    fn non_zero_diagonal_is_rejected() {
        let adjacency = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 0.0]);
        let result = Network::new(adjacency, agents(2));

        assert!(matches!(result, Err(SimError::Topology(_))));
    }

    #[test]
    fn misordered_agent_indices_are_rejected() {
        let mut list = agents(2);
        list.reverse();
        let result = Network::new(DMatrix::zeros(2, 2), list);

        assert!(matches!(result, Err(SimError::Topology(_))));
    }

    #[test]
    fn neighbour_queries_match_the_matrix() {
        let adjacency = DMatrix::from_row_slice(
            3,
            3,
            &[
                0.0, 1.0, 0.0, //
                1.0, 0.0, 2.5, //
                0.0, 2.5, 0.0,
            ],
        );
        let network = Network::new(adjacency, agents(3)).unwrap();

        for i in 0..3 {
            assert!(!network.are_neighbours(i, i));
        }
        assert!(network.are_neighbours(0, 1));
        assert!(network.are_neighbours(1, 2));
        assert!(!network.are_neighbours(0, 2));
        // Weighted entries count as edges
        assert!(network.are_neighbours(2, 1));
    }

    #[test]
    fn asymmetric_topologies_are_directed() {
        let adjacency = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.0, 0.0]);
        let network = Network::new(adjacency, agents(2)).unwrap();

        assert!(network.are_neighbours(0, 1));
        assert!(!network.are_neighbours(1, 0));
    }

    #[test]
    fn neighbour_queries_are_idempotent() {
        let adjacency = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let network = Network::new(adjacency, agents(2)).unwrap();

        assert_eq!(network.are_neighbours(0, 1), network.are_neighbours(0, 1));
        assert_eq!(network.are_neighbours(1, 1), network.are_neighbours(1, 1));
    }

    #[test]
    fn out_of_range_indices_are_not_neighbours() {
        let adjacency = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let network = Network::new(adjacency, agents(2)).unwrap();

        assert!(!network.are_neighbours(0, 5));
        assert!(!network.are_neighbours(5, 0));
    }
}
