//! Assignment orchestration.
//!
//! Couples automaton transitions to their side effects. Every entry point
//! takes a per-flight lock, reloads the flight from the store, computes the
//! pure transition first and only then touches storage, so an invalid input
//! leaves both the store and the registry untouched.
//!
//! Order of effects for a transition: store writes, then the flight record,
//! then the registry, then the event, then hardware. Hardware failures are
//! logged and never roll anything back.

use apron_core::{
    is_compatible, rank_gates, transition, Assignment, AutomatonInput, AutomatonOutput,
    AutomatonState, Flight, FlightId, Gate, GateClass, GateId, GateStatus, LedColor, NewFlight,
    Transition, TransitionError,
};
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::availability;
use crate::error::{EngineError, EngineResult};
use crate::events::{EventBus, FlightEventKind, GateFreedReason, TransitionEvent};
use crate::hardware::HardwareSink;
use crate::persistence::Store;
use crate::state::StateRegistry;

const DEFAULT_CLAIM_ATTEMPTS: u32 = 3;
const WAITING_DISPLAY_STATUS: &str = "WAITING_FOR_GATE";

/// Result of driving a flight through one airport event.
#[derive(Debug, Clone, Serialize)]
pub struct FlightOutcome {
    pub flight: Flight,
    pub gate: Option<Gate>,
    pub assignment: Option<Assignment>,
    /// Every transition applied, in order
    pub transitions: Vec<Transition>,
}

impl FlightOutcome {
    fn new(flight: Flight) -> Self {
        Self {
            flight,
            gate: None,
            assignment: None,
            transitions: Vec::new(),
        }
    }

    /// Outputs of the last transition applied.
    pub fn last_outputs(&self) -> &[AutomatonOutput] {
        self.transitions
            .last()
            .map(|t| t.outputs.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedGate {
    pub gate_id: GateId,
    pub gate_number: String,
    pub gate_class: GateClass,
    pub status: GateStatus,
    pub score: u32,
    pub reason: String,
}

pub struct Orchestrator {
    store: Arc<dyn Store>,
    registry: Arc<StateRegistry>,
    hardware: Arc<dyn HardwareSink>,
    events: EventBus,
    flight_locks: DashMap<FlightId, Arc<Mutex<()>>>,
    claim_attempts: u32,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<StateRegistry>,
        hardware: Arc<dyn HardwareSink>,
        events: EventBus,
    ) -> Self {
        Self {
            store,
            registry,
            hardware,
            events,
            flight_locks: DashMap::new(),
            claim_attempts: DEFAULT_CLAIM_ATTEMPTS,
        }
    }

    pub fn with_claim_attempts(mut self, attempts: u32) -> Self {
        self.claim_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<StateRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Load the live state of every flight already in its lifecycle.
    pub async fn prime_registry(&self) -> EngineResult<usize> {
        let flights = self.store.list_flights().await?;
        Ok(self.registry.prime(&flights))
    }

    /// Register a new flight and run detection on it.
    pub async fn detect_flight(&self, request: NewFlight) -> EngineResult<FlightOutcome> {
        let request = request.normalized()?;
        // A flight that can never be detected must not take up its number.
        if AutomatonState::detection_state(request.aircraft_class).is_none() {
            return Err(TransitionError::UnsupportedAircraftClass(request.aircraft_class).into());
        }
        let flight = self.store.insert_flight(request).await?;
        info!(
            "Registered flight {} ({}) as #{}",
            flight.flight_number, flight.aircraft_class, flight.id
        );
        self.on_detection(flight.id).await
    }

    /// Detection input (I1).
    ///
    /// From S0 this moves to the detection state for the aircraft class and
    /// goes straight on to confirmation and gate search. A flight waiting in
    /// S6 is reset to S0 instead and stops there. A flight left in S1/S2/S3 by
    /// an earlier failed gate search resumes from confirmation.
    pub async fn on_detection(&self, flight_id: FlightId) -> EngineResult<FlightOutcome> {
        let _guard = self.lock_flight(flight_id).await;
        let mut flight = self.load_flight(flight_id).await?;

        if flight.automaton_state.is_detection_state() {
            info!(
                "Flight {} already detected in {}, resuming gate search",
                flight.flight_number, flight.automaton_state
            );
            let outcome = FlightOutcome::new(flight.clone());
            return self.confirm_and_assign(flight, outcome).await;
        }

        let detected = transition(
            flight.automaton_state,
            AutomatonInput::I1,
            Some(flight.aircraft_class),
        )?;

        if detected.from.is_conflict_state() {
            self.commit(&mut flight, &detected, FlightEventKind::FlightReset)
                .await?;
            info!("Flight {} reset from waiting", flight.flight_number);
            let mut outcome = FlightOutcome::new(flight);
            outcome.transitions.push(detected);
            return Ok(outcome);
        }

        flight.detected_at = Some(Utc::now());
        self.commit(&mut flight, &detected, FlightEventKind::FlightDetected)
            .await?;
        self.execute_outputs(&detected, &flight, None, None).await;

        let mut outcome = FlightOutcome::new(flight.clone());
        outcome.transitions.push(detected);
        self.confirm_and_assign(flight, outcome).await
    }

    /// Type confirmation (I2) followed by the gate search (I3 or I4).
    async fn confirm_and_assign(
        &self,
        mut flight: Flight,
        mut outcome: FlightOutcome,
    ) -> EngineResult<FlightOutcome> {
        let confirmed = transition(flight.automaton_state, AutomatonInput::I2, None)?;
        self.announce(&flight, &confirmed, FlightEventKind::TypeConfirmed);
        outcome.transitions.push(confirmed);

        for attempt in 1..=self.claim_attempts {
            let gate = match availability::find_gate(self.store.as_ref(), flight.aircraft_class)
                .await?
            {
                Some(gate) => gate,
                None => break,
            };

            let assigned = transition(flight.automaton_state, AutomatonInput::I3, None)?;
            match self
                .store
                .claim_gate(flight.id, gate.id, flight.scheduled_arrival)
                .await
            {
                Ok(assignment) => {
                    self.commit(&mut flight, &assigned, FlightEventKind::GateAssigned)
                        .await?;
                    let gate = self.refresh_gate(gate).await;
                    info!(
                        "Flight {} assigned to gate {}",
                        flight.flight_number, gate.gate_number
                    );
                    self.execute_outputs(&assigned, &flight, Some(&gate), Some(&assignment))
                        .await;
                    outcome.transitions.push(assigned);
                    outcome.flight = flight;
                    outcome.gate = Some(gate);
                    outcome.assignment = Some(assignment);
                    return Ok(outcome);
                }
                Err(err) if err.is_retryable() => {
                    warn!(
                        "Flight {} lost gate {} (attempt {}/{})",
                        flight.flight_number, gate.gate_number, attempt, self.claim_attempts
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let waiting = transition(flight.automaton_state, AutomatonInput::I4, None)?;
        self.commit(&mut flight, &waiting, FlightEventKind::NoGateAvailable)
            .await?;
        warn!(
            "No compatible gate for flight {} ({}), waiting",
            flight.flight_number, flight.aircraft_class
        );
        self.execute_outputs(&waiting, &flight, None, None).await;
        outcome.transitions.push(waiting);
        outcome.flight = flight;
        Ok(outcome)
    }

    /// Arrival input (I5): the aircraft is parked at its gate.
    pub async fn on_arrival(&self, flight_id: FlightId) -> EngineResult<FlightOutcome> {
        let _guard = self.lock_flight(flight_id).await;
        let mut flight = self.load_flight(flight_id).await?;
        let active = self
            .store
            .find_active_assignment_for_flight(flight_id)
            .await?
            .ok_or(EngineError::NoActiveAssignment(flight_id))?;

        let arrived = transition(flight.automaton_state, AutomatonInput::I5, None)?;

        let now = Utc::now();
        let assignment = self.store.record_arrival(active.id, now).await?;
        flight.actual_arrival = Some(now);
        self.commit(&mut flight, &arrived, FlightEventKind::AircraftArrived)
            .await?;

        let gate = self.store.get_gate(assignment.gate_id).await?;
        self.execute_outputs(&arrived, &flight, gate.as_ref(), Some(&assignment))
            .await;

        Ok(FlightOutcome {
            flight,
            gate,
            assignment: Some(assignment),
            transitions: vec![arrived],
        })
    }

    /// Departure input (I6): frees the gate and forgets the flight's live state.
    pub async fn on_departure(&self, flight_id: FlightId) -> EngineResult<FlightOutcome> {
        let guard = self.lock_flight(flight_id).await;
        let mut flight = self.load_flight(flight_id).await?;
        let active = self
            .store
            .find_active_assignment_for_flight(flight_id)
            .await?
            .ok_or(EngineError::NoActiveAssignment(flight_id))?;

        let departed = transition(flight.automaton_state, AutomatonInput::I6, None)?;

        let now = Utc::now();
        let assignment = self.store.complete_assignment(active.id, now).await?;
        flight.actual_departure = Some(now);
        self.commit(&mut flight, &departed, FlightEventKind::AircraftDeparted)
            .await?;

        let gate = self.store.get_gate(assignment.gate_id).await?;
        self.execute_outputs(&departed, &flight, gate.as_ref(), Some(&assignment))
            .await;
        if let Some(gate) = &gate {
            let result = self.hardware.deactivate_led(gate).await;
            self.report("deactivate LEDs", &flight, result);
        }

        self.registry.remove(flight_id);
        drop(guard);
        self.release_lock(flight_id);

        if let Some(gate) = &gate {
            self.events
                .publish_gate_freed(gate.clone(), GateFreedReason::AircraftDeparted);
        }

        Ok(FlightOutcome {
            flight,
            gate,
            assignment: Some(assignment),
            transitions: vec![departed],
        })
    }

    /// Try once more to place a flight waiting in S6.
    ///
    /// Searches afresh rather than trusting whichever gate triggered the
    /// retry. Returns `false`, leaving the flight in S6, when the flight is no
    /// longer waiting, nothing fits, or another flight won the gate.
    pub async fn retry_gate_assignment(&self, flight_id: FlightId) -> EngineResult<bool> {
        let _guard = self.lock_flight(flight_id).await;
        let mut flight = self.load_flight(flight_id).await?;
        if !flight.automaton_state.is_conflict_state() {
            debug!(
                "Flight {} is in {}, not waiting",
                flight.flight_number, flight.automaton_state
            );
            return Ok(false);
        }

        let gate =
            match availability::find_gate(self.store.as_ref(), flight.aircraft_class).await? {
                Some(gate) => gate,
                None => {
                    debug!("Still no gate for waiting flight {}", flight.flight_number);
                    return Ok(false);
                }
            };

        let assigned = transition(flight.automaton_state, AutomatonInput::I3, None)?;
        let assignment = match self
            .store
            .claim_gate(flight.id, gate.id, flight.scheduled_arrival)
            .await
        {
            Ok(assignment) => assignment,
            Err(err) if err.is_retryable() => {
                info!(
                    "Gate {} taken before waiting flight {} could claim it",
                    gate.gate_number, flight.flight_number
                );
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        self.commit(
            &mut flight,
            &assigned,
            FlightEventKind::WaitingFlightReassigned,
        )
        .await?;
        let gate = self.refresh_gate(gate).await;
        info!(
            "Waiting flight {} reassigned to gate {}",
            flight.flight_number, gate.gate_number
        );
        self.execute_outputs(&assigned, &flight, Some(&gate), Some(&assignment))
            .await;
        Ok(true)
    }

    /// Operator-directed assignment to one specific gate.
    pub async fn assign_gate(
        &self,
        flight_id: FlightId,
        gate_id: GateId,
    ) -> EngineResult<FlightOutcome> {
        let _guard = self.lock_flight(flight_id).await;
        let mut flight = self.load_flight(flight_id).await?;
        let gate = self
            .store
            .get_gate(gate_id)
            .await?
            .ok_or(EngineError::GateNotFound(gate_id))?;

        if !is_compatible(flight.aircraft_class, gate.gate_class) {
            return Err(EngineError::IncompatibleGate { flight_id, gate_id });
        }

        let assigned = transition(flight.automaton_state, AutomatonInput::I3, None)?;
        let assignment = self
            .store
            .claim_gate(flight.id, gate.id, flight.scheduled_arrival)
            .await?;

        let kind = if assigned.from.is_conflict_state() {
            FlightEventKind::WaitingFlightReassigned
        } else {
            FlightEventKind::GateAssigned
        };
        self.commit(&mut flight, &assigned, kind).await?;
        let gate = self.refresh_gate(gate).await;
        self.execute_outputs(&assigned, &flight, Some(&gate), Some(&assignment))
            .await;

        Ok(FlightOutcome {
            flight,
            gate: Some(gate),
            assignment: Some(assignment),
            transitions: vec![assigned],
        })
    }

    /// Operator status change: FREE, RESERVED or MAINTENANCE only.
    pub async fn update_gate_status(
        &self,
        gate_id: GateId,
        status: GateStatus,
    ) -> EngineResult<Gate> {
        if !matches!(
            status,
            GateStatus::Free | GateStatus::Reserved | GateStatus::Maintenance
        ) {
            return Err(EngineError::UnsupportedGateStatus(status));
        }

        let previous = self
            .store
            .get_gate(gate_id)
            .await?
            .ok_or(EngineError::GateNotFound(gate_id))?;
        let gate = self.store.set_gate_status(gate_id, status).await?;
        info!(
            "Gate {} status {} -> {}",
            gate.gate_number, previous.status, gate.status
        );

        if let Err(err) = self.hardware.activate_led(&gate, status.led_color()).await {
            warn!("Hardware update failed for gate {}: {}", gate.gate_number, err);
        }

        if status == GateStatus::Free && previous.status != GateStatus::Free {
            let reason = if previous.status == GateStatus::Maintenance {
                GateFreedReason::MaintenanceCompleted
            } else {
                GateFreedReason::StatusChangedToFree
            };
            self.events.publish_gate_freed(gate.clone(), reason);
        }

        Ok(gate)
    }

    /// Every gate scored for a flight, best first.
    pub async fn gate_scores(&self, flight_id: FlightId) -> EngineResult<Vec<RankedGate>> {
        let flight = self.load_flight(flight_id).await?;
        let gates = self.store.list_gates().await?;
        Ok(rank_gates(&flight, &gates)
            .into_iter()
            .map(|(gate, score)| RankedGate {
                gate_id: gate.id,
                gate_number: gate.gate_number.clone(),
                gate_class: gate.gate_class,
                status: gate.status,
                score: score.score,
                reason: score.reason,
            })
            .collect())
    }

    /// Dispatch the outputs of a transition to the hardware sink.
    pub async fn execute_outputs(
        &self,
        transition: &Transition,
        flight: &Flight,
        gate: Option<&Gate>,
        assignment: Option<&Assignment>,
    ) {
        for output in &transition.outputs {
            debug!(
                "Executing output {} for flight {}",
                output.code(),
                flight.flight_number
            );
            match output {
                AutomatonOutput::O1 => {
                    if let Some(gate) = self.gate_for(*output, flight, gate) {
                        let result = self.hardware.activate_led(gate, LedColor::Green).await;
                        self.report("route LEDs", flight, result);
                    }
                }
                AutomatonOutput::O2 => {
                    if let Some(gate) = self.gate_for(*output, flight, gate) {
                        let lit = self.hardware.activate_led(gate, LedColor::Green).await;
                        let lit_ok = lit.is_ok();
                        self.report("assigned LED", flight, lit);
                        let notified = self.hardware.notify_gate_assigned(gate, flight).await;
                        self.report("assignment notice", flight, notified);

                        if let (true, Some(assignment)) = (lit_ok, assignment) {
                            if let Err(err) =
                                self.store.set_led_activated(assignment.id, true).await
                            {
                                warn!(
                                    "Could not record LED state for assignment {}: {}",
                                    assignment.id, err
                                );
                            }
                        }
                    }
                }
                AutomatonOutput::O3 => {
                    if let Some(gate) = self.gate_for(*output, flight, gate) {
                        let result = self.hardware.activate_led(gate, LedColor::Red).await;
                        self.report("occupied LED", flight, result);
                    }
                }
                AutomatonOutput::O4 => {
                    let result = self
                        .hardware
                        .update_display(WAITING_DISPLAY_STATUS, flight)
                        .await;
                    self.report("wait display", flight, result);
                }
                AutomatonOutput::O5 => {
                    debug!("Flight {} persisted", flight.flight_number);
                }
                AutomatonOutput::None => {}
            }
        }
    }

    fn gate_for<'a>(
        &self,
        output: AutomatonOutput,
        flight: &Flight,
        gate: Option<&'a Gate>,
    ) -> Option<&'a Gate> {
        if gate.is_none() {
            warn!(
                "Output {} for flight {} has no gate, skipped",
                output.code(),
                flight.flight_number
            );
        }
        gate
    }

    fn report(&self, action: &str, flight: &Flight, result: anyhow::Result<()>) {
        if let Err(err) = result {
            warn!(
                "Hardware {} failed for flight {}: {}",
                action, flight.flight_number, err
            );
        }
    }

    /// Persist the new state, then mirror it into the registry and announce it.
    async fn commit(
        &self,
        flight: &mut Flight,
        applied: &Transition,
        kind: FlightEventKind,
    ) -> EngineResult<()> {
        flight.apply_state(applied.to, Utc::now());
        self.store.save_flight(flight).await?;
        self.registry.set(flight.id, applied.to);
        self.announce(flight, applied, kind);
        Ok(())
    }

    fn announce(&self, flight: &Flight, applied: &Transition, kind: FlightEventKind) {
        self.events.publish_transition(TransitionEvent {
            flight_id: flight.id,
            flight_number: flight.flight_number.clone(),
            previous_state: applied.from,
            new_state: applied.to,
            input: applied.input,
            event: kind,
            timestamp: Utc::now(),
        });
    }

    /// Load a flight; the stored record wins over the registry.
    async fn load_flight(&self, flight_id: FlightId) -> EngineResult<Flight> {
        let flight = self
            .store
            .get_flight(flight_id)
            .await?
            .ok_or(EngineError::FlightNotFound(flight_id))?;

        if let Some(entry) = self.registry.entry(flight_id) {
            if entry.state != flight.automaton_state {
                warn!(
                    "Registry has flight {} in {}, store has {}; using store",
                    flight.flight_number, entry.state, flight.automaton_state
                );
                self.registry.set(flight_id, flight.automaton_state);
            }
        }
        Ok(flight)
    }

    async fn refresh_gate(&self, gate: Gate) -> Gate {
        match self.store.get_gate(gate.id).await {
            Ok(Some(fresh)) => fresh,
            _ => gate,
        }
    }

    async fn lock_flight(&self, flight_id: FlightId) -> OwnedMutexGuard<()> {
        let lock = self
            .flight_locks
            .entry(flight_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    fn release_lock(&self, flight_id: FlightId) {
        self.flight_locks
            .remove_if(&flight_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
