//! Gate assignment engine: orchestration, storage, reactor and HTTP surface.

pub mod api;
pub mod availability;
pub mod config;
pub mod error;
pub mod events;
pub mod hardware;
pub mod loops;
pub mod orchestrator;
pub mod persistence;
pub mod seed;
pub mod state;

pub use error::{EngineError, EngineResult};
pub use orchestrator::{FlightOutcome, Orchestrator};
