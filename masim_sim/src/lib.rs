//! Scenario harness for the masim engine.
//!
//! Wires concrete dynamics, topologies, and control laws from `masim_core`
//! into runnable, self-checking scenarios. The engine itself knows nothing
//! about any of these; everything here goes through its public surface.

pub mod scenarios;

pub use scenarios::{ScenarioId, ScenarioResult, ScenarioRunner};
