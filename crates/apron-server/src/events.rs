//! Broadcast channels for transition and gate-freed events.

use apron_core::{AutomatonInput, AutomatonState, FlightId, Gate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// What happened to a flight, for dashboards and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightEventKind {
    FlightDetected,
    TypeConfirmed,
    GateAssigned,
    NoGateAvailable,
    AircraftArrived,
    AircraftDeparted,
    WaitingFlightReassigned,
    FlightReset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub flight_id: FlightId,
    pub flight_number: String,
    pub previous_state: AutomatonState,
    pub new_state: AutomatonState,
    pub input: AutomatonInput,
    pub event: FlightEventKind,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateFreedReason {
    AircraftDeparted,
    MaintenanceCompleted,
    StatusChangedToFree,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateFreedEvent {
    pub gate: Gate,
    pub reason: GateFreedReason,
    pub timestamp: DateTime<Utc>,
}

/// Publishing never blocks and never fails: with no subscribers the event is
/// simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    transitions: broadcast::Sender<TransitionEvent>,
    gate_freed: broadcast::Sender<GateFreedEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (transitions, _) = broadcast::channel(capacity);
        let (gate_freed, _) = broadcast::channel(capacity);
        Self {
            transitions,
            gate_freed,
        }
    }

    pub fn publish_transition(&self, event: TransitionEvent) {
        tracing::debug!(
            "{:?}: flight {} {} -> {} on {}",
            event.event,
            event.flight_number,
            event.previous_state,
            event.new_state,
            event.input
        );
        let _ = self.transitions.send(event);
    }

    pub fn publish_gate_freed(&self, gate: Gate, reason: GateFreedReason) {
        tracing::info!("Gate {} freed ({:?})", gate.gate_number, reason);
        let _ = self.gate_freed.send(GateFreedEvent {
            gate,
            reason,
            timestamp: Utc::now(),
        });
    }

    pub fn subscribe_transitions(&self) -> broadcast::Receiver<TransitionEvent> {
        self.transitions.subscribe()
    }

    pub fn subscribe_gate_freed(&self) -> broadcast::Receiver<GateFreedEvent> {
        self.gate_freed.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
