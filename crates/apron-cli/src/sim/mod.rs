//! Simulation helpers: flight generation and the scripted turnaround run.

mod runner;
mod traffic;

pub use runner::{gate_layout, run_simulation, SimulationConfig, SimulationSummary};
pub use traffic::TrafficGenerator;
