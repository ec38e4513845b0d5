//! Apron CLI - traffic simulation for the gate assignment engine.
//!
//! Binaries:
//! - simulate_traffic: drives the engine in-process with generated flights

pub mod sim;

pub use sim::{run_simulation, SimulationConfig, SimulationSummary, TrafficGenerator};
