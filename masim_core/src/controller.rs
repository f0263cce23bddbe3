//! Distributed control laws.
//!
//! A law is polymorphic over its pairwise rule: implementors provide the
//! contribution of a single neighbour, the trait sums contributions over the
//! neighbourhood. Laws only ever read agent state; they hold no reference to
//! the network and receive it per call instead.

use nalgebra::DVector;

use crate::agent::Agent;
use crate::error::SimError;
use crate::network::Network;

/// A distributed control law over a network of agents.
///
/// Implementations must be pure: no mutation of agents or the network, and
/// deterministic in the recorded histories they read. `pairwise_rule` must
/// return vectors of the agents' input dimension so that contributions sum
/// into a valid control input (homogeneous agents assumed, as everywhere in
/// this engine).
pub trait DistributedController {
    /// One neighbour's contribution to the agent's control input.
    fn pairwise_rule(&self, agent: &Agent, neighbour: &Agent) -> DVector<f64>;

    /// The control input for agent `index` at `time`: the sum of
    /// `pairwise_rule` over every neighbour, read from each neighbour's most
    /// recently recorded state. The zero vector when there are no neighbours.
    ///
    /// `time` is the grid point the input applies from; the provided
    /// implementation ignores it, but time-varying laws may not.
    fn compute(&self, network: &Network, index: usize, time: f64) -> DVector<f64> {
        let _ = time;
        let agent = network.agent(index);
        let mut input = DVector::zeros(agent.input_dim());
        for neighbour in network.agents() {
            if network.are_neighbours(neighbour.index(), index) {
                input += self.pairwise_rule(agent, neighbour);
            }
        }
        input
    }
}

/// The classical consensus law: each neighbour contributes the difference
/// between its latest state and the agent's own, scaled by a uniform gain.
/// Drives connected networks of integrators toward a common state.
pub struct ConsensusLaw {
    gain: f64,
    output_dim: usize,
}

impl ConsensusLaw {
    /// Builds the law for the given network, learning the output dimension
    /// from its first agent.
    pub fn new(network: &Network, gain: f64) -> Result<Self, SimError> {
        let first = network
            .agents()
            .first()
            .ok_or_else(|| SimError::configuration("cannot build a control law for an empty network"))?;
        if first.state_dim() != first.input_dim() {
            return Err(SimError::configuration(format!(
                "consensus law feeds state differences back as inputs and needs \
                 matching dimensions, got {} states and {} inputs",
                first.state_dim(),
                first.input_dim()
            )));
        }
        Ok(Self {
            gain,
            output_dim: first.output_dim(),
        })
    }

    /// Dimension of the communicated output this law was built against.
    pub fn output_dim(&self) -> usize {
        self.output_dim
    }
}

impl DistributedController for ConsensusLaw {
    fn pairwise_rule(&self, agent: &Agent, neighbour: &Agent) -> DVector<f64> {
        (neighbour.current_state() - agent.current_state()) * self.gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use nalgebra::{dvector, DMatrix};

    fn integrator(index: usize, x0: f64) -> Agent {
        let config = AgentConfig {
            state_dim: 1,
            input_dim: 1,
            initial_state: Some(dvector![x0]),
            index: Some(index),
            ..Default::default()
        };
        Agent::new(config, Box::new(|_t, _x, u| u.clone())).unwrap()
    }

    #[test]
    fn contributions_sum_over_the_neighbourhood() {
        // Path 0 - 1 - 2: the middle agent hears both ends.
        let adjacency = DMatrix::from_row_slice(
            3,
            3,
            &[
                0.0, 1.0, 0.0, //
                1.0, 0.0, 1.0, //
                0.0, 1.0, 0.0,
            ],
        );
        let agents = vec![integrator(0, 0.0), integrator(1, 1.0), integrator(2, 5.0)];
        let network = Network::new(adjacency, agents).unwrap();
        let law = ConsensusLaw::new(&network, 1.0).unwrap();

        assert_eq!(law.compute(&network, 0, 0.0), dvector![1.0]);
        assert_eq!(law.compute(&network, 1, 0.0), dvector![3.0]);
        assert_eq!(law.compute(&network, 2, 0.0), dvector![-4.0]);
    }

    #[test]
    fn isolated_agent_gets_the_zero_vector() {
        let agents = vec![integrator(0, 2.0), integrator(1, -2.0)];
        let network = Network::new(DMatrix::zeros(2, 2), agents).unwrap();
        let law = ConsensusLaw::new(&network, 1.0).unwrap();

        assert_eq!(law.compute(&network, 0, 0.0), dvector![0.0]);
        assert_eq!(law.compute(&network, 0, 7.5), dvector![0.0]);
    }

    #[test]
    fn gain_scales_contributions() {
        let adjacency = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]);
        let agents = vec![integrator(0, 0.0), integrator(1, 3.0)];
        let network = Network::new(adjacency, agents).unwrap();
        let law = ConsensusLaw::new(&network, 0.5).unwrap();

        assert_eq!(law.compute(&network, 0, 0.0), dvector![1.5]);
    }

    #[test]
    fn mismatched_state_and_input_dims_are_rejected() {
        let make = |index| {
            let config = AgentConfig {
                state_dim: 2,
                input_dim: 1,
                initial_state: Some(dvector![0.0, 0.0]),
                index: Some(index),
                ..Default::default()
            };
            Agent::new(config, Box::new(|_t, x, _u| x.clone())).unwrap()
        };
        let network = Network::new(DMatrix::zeros(2, 2), vec![make(0), make(1)]).unwrap();

        let result = ConsensusLaw::new(&network, 1.0);

        assert!(matches!(result, Err(SimError::Configuration(_))));
    }
}
