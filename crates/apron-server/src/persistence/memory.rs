//! In-memory store.
//!
//! All tables live behind one mutex so every operation, `claim_gate` included,
//! is atomic. The lock is never held across an await.

use apron_core::{
    Assignment, AssignmentId, Flight, FlightId, Gate, GateClass, GateId, GateStatus, NewFlight,
    NewGate,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::Store;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Default)]
struct Tables {
    flights: BTreeMap<FlightId, Flight>,
    gates: BTreeMap<GateId, Gate>,
    assignments: BTreeMap<AssignmentId, Assignment>,
    next_flight_id: FlightId,
    next_gate_id: GateId,
    next_assignment_id: AssignmentId,
}

impl Tables {
    fn active_for_flight(&self, flight_id: FlightId) -> Option<&Assignment> {
        self.assignments
            .values()
            .find(|a| a.is_active && a.flight_id == flight_id)
    }

    fn active_for_gate(&self, gate_id: GateId) -> Option<&Assignment> {
        self.assignments
            .values()
            .find(|a| a.is_active && a.gate_id == gate_id)
    }

    fn available_gates(&self) -> impl Iterator<Item = &Gate> {
        self.gates.values().filter(|gate| gate.is_available())
    }

    fn set_gate(&mut self, gate_id: GateId, status: GateStatus, now: DateTime<Utc>) {
        if let Some(gate) = self.gates.get_mut(&gate_id) {
            gate.status = status;
            gate.updated_at = now;
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock cannot leave a half-written row.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_flight(&self, request: NewFlight) -> EngineResult<Flight> {
        let mut tables = self.lock();
        if tables
            .flights
            .values()
            .any(|f| f.flight_number == request.flight_number)
        {
            return Err(EngineError::Duplicate(format!(
                "flight {}",
                request.flight_number
            )));
        }
        tables.next_flight_id += 1;
        let flight = Flight::from_request(tables.next_flight_id, request, Utc::now());
        tables.flights.insert(flight.id, flight.clone());
        Ok(flight)
    }

    async fn get_flight(&self, id: FlightId) -> EngineResult<Option<Flight>> {
        Ok(self.lock().flights.get(&id).cloned())
    }

    async fn list_flights(&self) -> EngineResult<Vec<Flight>> {
        Ok(self.lock().flights.values().cloned().collect())
    }

    async fn find_flight_by_number(&self, flight_number: &str) -> EngineResult<Option<Flight>> {
        Ok(self
            .lock()
            .flights
            .values()
            .find(|f| f.flight_number == flight_number)
            .cloned())
    }

    async fn save_flight(&self, flight: &Flight) -> EngineResult<()> {
        let mut tables = self.lock();
        match tables.flights.get_mut(&flight.id) {
            Some(stored) => {
                *stored = flight.clone();
                Ok(())
            }
            None => Err(EngineError::FlightNotFound(flight.id)),
        }
    }

    async fn find_waiting_flights(&self) -> EngineResult<Vec<Flight>> {
        let mut waiting: Vec<Flight> = self
            .lock()
            .flights
            .values()
            .filter(|f| f.automaton_state.is_conflict_state())
            .cloned()
            .collect();
        // Flights never stamped with a detection time sort last.
        waiting.sort_by_key(|f| (f.detected_at.is_none(), f.detected_at, f.id));
        Ok(waiting)
    }

    async fn insert_gate(&self, request: NewGate) -> EngineResult<Gate> {
        let mut tables = self.lock();
        if tables
            .gates
            .values()
            .any(|g| g.gate_number == request.gate_number)
        {
            return Err(EngineError::Duplicate(format!("gate {}", request.gate_number)));
        }
        tables.next_gate_id += 1;
        let gate = Gate::from_request(tables.next_gate_id, request, Utc::now());
        tables.gates.insert(gate.id, gate.clone());
        Ok(gate)
    }

    async fn get_gate(&self, id: GateId) -> EngineResult<Option<Gate>> {
        Ok(self.lock().gates.get(&id).cloned())
    }

    async fn list_gates(&self) -> EngineResult<Vec<Gate>> {
        Ok(self.lock().gates.values().cloned().collect())
    }

    async fn find_available_gates_by_class(&self, class: GateClass) -> EngineResult<Vec<Gate>> {
        Ok(self
            .lock()
            .available_gates()
            .filter(|gate| gate.gate_class == class)
            .cloned()
            .collect())
    }

    async fn find_available_gates_by_class_desc(&self) -> EngineResult<Vec<Gate>> {
        let mut gates: Vec<Gate> = self.lock().available_gates().cloned().collect();
        gates.sort_by(|a, b| b.gate_class.cmp(&a.gate_class).then(a.id.cmp(&b.id)));
        Ok(gates)
    }

    async fn set_gate_status(&self, id: GateId, status: GateStatus) -> EngineResult<Gate> {
        let mut tables = self.lock();
        if !tables.gates.contains_key(&id) {
            return Err(EngineError::GateNotFound(id));
        }
        if tables.active_for_gate(id).is_some() {
            return Err(EngineError::GateInUse(id));
        }
        tables.set_gate(id, status, Utc::now());
        tables
            .gates
            .get(&id)
            .cloned()
            .ok_or(EngineError::GateNotFound(id))
    }

    async fn exists_active_assignment_for_flight(&self, flight_id: FlightId) -> EngineResult<bool> {
        Ok(self.lock().active_for_flight(flight_id).is_some())
    }

    async fn exists_active_assignment_for_gate(&self, gate_id: GateId) -> EngineResult<bool> {
        Ok(self.lock().active_for_gate(gate_id).is_some())
    }

    async fn find_active_assignment_for_flight(
        &self,
        flight_id: FlightId,
    ) -> EngineResult<Option<Assignment>> {
        Ok(self.lock().active_for_flight(flight_id).cloned())
    }

    async fn find_active_assignment_for_gate(
        &self,
        gate_id: GateId,
    ) -> EngineResult<Option<Assignment>> {
        Ok(self.lock().active_for_gate(gate_id).cloned())
    }

    async fn claim_gate(
        &self,
        flight_id: FlightId,
        gate_id: GateId,
        expected_arrival: Option<DateTime<Utc>>,
    ) -> EngineResult<Assignment> {
        let mut tables = self.lock();

        let gate = tables
            .gates
            .get(&gate_id)
            .ok_or(EngineError::GateNotFound(gate_id))?;
        if !gate.is_available() || tables.active_for_gate(gate_id).is_some() {
            return Err(EngineError::GateAlreadyOccupied(gate_id));
        }
        if tables.active_for_flight(flight_id).is_some() {
            return Err(EngineError::FlightAlreadyAssigned(flight_id));
        }

        let now = Utc::now();
        tables.set_gate(gate_id, GateStatus::Assigned, now);
        tables.next_assignment_id += 1;
        let assignment = Assignment {
            id: tables.next_assignment_id,
            flight_id,
            gate_id,
            assigned_at: now,
            expected_arrival,
            actual_arrival: None,
            departure_time: None,
            is_active: true,
            led_activated: false,
            notes: None,
        };
        tables.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn record_arrival(
        &self,
        assignment_id: AssignmentId,
        at: DateTime<Utc>,
    ) -> EngineResult<Assignment> {
        let mut tables = self.lock();
        let assignment = tables
            .assignments
            .get_mut(&assignment_id)
            .filter(|a| a.is_active)
            .ok_or(EngineError::AssignmentNotFound(assignment_id))?;
        assignment.actual_arrival = Some(at);
        let updated = assignment.clone();
        tables.set_gate(updated.gate_id, GateStatus::Occupied, at);
        Ok(updated)
    }

    async fn complete_assignment(
        &self,
        assignment_id: AssignmentId,
        at: DateTime<Utc>,
    ) -> EngineResult<Assignment> {
        let mut tables = self.lock();
        let assignment = tables
            .assignments
            .get_mut(&assignment_id)
            .filter(|a| a.is_active)
            .ok_or(EngineError::AssignmentNotFound(assignment_id))?;
        assignment.is_active = false;
        assignment.departure_time = Some(at);
        assignment.led_activated = false;
        let updated = assignment.clone();
        tables.set_gate(updated.gate_id, GateStatus::Free, at);
        Ok(updated)
    }

    async fn set_led_activated(&self, assignment_id: AssignmentId, on: bool) -> EngineResult<()> {
        let mut tables = self.lock();
        let assignment = tables
            .assignments
            .get_mut(&assignment_id)
            .ok_or(EngineError::AssignmentNotFound(assignment_id))?;
        assignment.led_activated = on;
        Ok(())
    }

    async fn list_active_assignments(&self) -> EngineResult<Vec<Assignment>> {
        Ok(self
            .lock()
            .assignments
            .values()
            .filter(|a| a.is_active)
            .cloned()
            .collect())
    }

    async fn gate_history(&self, gate_id: GateId) -> EngineResult<Vec<Assignment>> {
        let mut history: Vec<Assignment> = self
            .lock()
            .assignments
            .values()
            .filter(|a| a.gate_id == gate_id)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.assigned_at.cmp(&a.assigned_at).then(b.id.cmp(&a.id)));
        Ok(history)
    }
}
