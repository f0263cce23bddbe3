//! Property tests over the engine surface.

use masim_core::{time_grid, Agent, AgentConfig, Network};
use nalgebra::{dvector, DMatrix, DVector};
use proptest::prelude::*;

fn integrator(index: usize) -> Agent {
    let config = AgentConfig {
        state_dim: 1,
        input_dim: 1,
        initial_state: Some(dvector![0.0]),
        index: Some(index),
        ..Default::default()
    };
    Agent::new(
        config,
        Box::new(|_t, _x: &DVector<f64>, u: &DVector<f64>| u.clone()),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn diagonal_is_never_a_neighbour(
        n in 2usize..6,
        weights in prop::collection::vec(0u8..3, 36),
    ) {
        let mut adjacency = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    adjacency[(i, j)] = weights[i * 6 + j] as f64;
                }
            }
        }

        let network = Network::new(adjacency.clone(), (0..n).map(integrator).collect()).unwrap();

        for i in 0..n {
            prop_assert!(!network.are_neighbours(i, i));
            for j in 0..n {
                if i != j {
                    prop_assert_eq!(
                        network.are_neighbours(i, j),
                        adjacency[(i, j)] != 0.0
                    );
                }
            }
        }
    }

    #[test]
    fn grid_spans_the_horizon(
        start in -5.0f64..5.0,
        step in 0.05f64..0.5,
        segments in 1usize..200,
    ) {
        // A horizon that is deliberately not a multiple of the step size
        let end = start + step * segments as f64 + step * 0.5;

        let grid = time_grid(start, end, step);

        prop_assert!(grid.len() >= 2);
        prop_assert_eq!(grid[0], start);
        prop_assert_eq!(grid[grid.len() - 1], end);
        prop_assert!(grid.windows(2).all(|w| w[1] > w[0]));
    }
}
