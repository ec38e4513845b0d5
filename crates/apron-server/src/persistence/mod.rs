//! Persistence layer for the apron server.
//!
//! The [`Store`] trait is the storage collaborator the orchestrator talks to.
//! `MemoryStore` keeps everything in ordered maps; `SqliteStore` persists to
//! SQLite through an sqlx pool. Both give the same atomicity guarantee for
//! [`Store::claim_gate`]: checking that a gate is free and binding it to a
//! flight happen as one unit.

pub mod db;
pub mod memory;
pub mod sqlite;

use apron_core::{
    Assignment, AssignmentId, Flight, FlightId, Gate, GateClass, GateId, GateStatus, NewFlight,
    NewGate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::EngineResult;

pub use db::{init_database, init_memory_database, Database};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a flight in S0. Fails with `Duplicate` on a taken flight number.
    async fn insert_flight(&self, flight: NewFlight) -> EngineResult<Flight>;

    async fn get_flight(&self, id: FlightId) -> EngineResult<Option<Flight>>;

    async fn list_flights(&self) -> EngineResult<Vec<Flight>>;

    async fn find_flight_by_number(&self, flight_number: &str) -> EngineResult<Option<Flight>>;

    /// Overwrite the mutable fields of an existing flight.
    async fn save_flight(&self, flight: &Flight) -> EngineResult<()>;

    /// Flights parked in S6, oldest detection first, then by id.
    async fn find_waiting_flights(&self) -> EngineResult<Vec<Flight>>;

    async fn insert_gate(&self, gate: NewGate) -> EngineResult<Gate>;

    async fn get_gate(&self, id: GateId) -> EngineResult<Option<Gate>>;

    async fn list_gates(&self) -> EngineResult<Vec<Gate>>;

    /// Active FREE or RESERVED gates of one class, in id order.
    async fn find_available_gates_by_class(&self, class: GateClass) -> EngineResult<Vec<Gate>>;

    /// Every active FREE or RESERVED gate, largest class first, then id.
    async fn find_available_gates_by_class_desc(&self) -> EngineResult<Vec<Gate>>;

    /// Operator status change. Refused with `GateInUse` while the gate has an
    /// active assignment; the check and the write are atomic.
    async fn set_gate_status(&self, id: GateId, status: GateStatus) -> EngineResult<Gate>;

    async fn exists_active_assignment_for_flight(&self, flight_id: FlightId) -> EngineResult<bool>;

    async fn exists_active_assignment_for_gate(&self, gate_id: GateId) -> EngineResult<bool>;

    async fn find_active_assignment_for_flight(
        &self,
        flight_id: FlightId,
    ) -> EngineResult<Option<Assignment>>;

    async fn find_active_assignment_for_gate(
        &self,
        gate_id: GateId,
    ) -> EngineResult<Option<Assignment>>;

    /// Atomically check that the gate is free and bind it to the flight.
    ///
    /// Marks the gate ASSIGNED and creates the active assignment. Fails with
    /// `GateAlreadyOccupied` when the gate is no longer available or already
    /// bound, and with `FlightAlreadyAssigned` when the flight already holds a
    /// gate. Nothing is written on failure.
    async fn claim_gate(
        &self,
        flight_id: FlightId,
        gate_id: GateId,
        expected_arrival: Option<DateTime<Utc>>,
    ) -> EngineResult<Assignment>;

    /// Stamp the arrival and mark the gate OCCUPIED.
    async fn record_arrival(
        &self,
        assignment_id: AssignmentId,
        at: DateTime<Utc>,
    ) -> EngineResult<Assignment>;

    /// Deactivate the assignment, stamp the departure, clear the LED flag
    /// and mark the gate FREE.
    async fn complete_assignment(
        &self,
        assignment_id: AssignmentId,
        at: DateTime<Utc>,
    ) -> EngineResult<Assignment>;

    async fn set_led_activated(&self, assignment_id: AssignmentId, on: bool) -> EngineResult<()>;

    async fn list_active_assignments(&self) -> EngineResult<Vec<Assignment>>;

    /// All assignments ever made at a gate, newest first.
    async fn gate_history(&self, gate_id: GateId) -> EngineResult<Vec<Assignment>>;
}
