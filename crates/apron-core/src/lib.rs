pub mod automaton;
pub mod compatibility;
pub mod models;

pub use automaton::{
    can_transition, is_valid_transition, transition, validate_transition, AutomatonInput,
    AutomatonOutput, AutomatonState, Transition, TransitionError,
};
pub use compatibility::{
    first_compatible, ideal_gate_class, is_compatible, rank_gates, score_gate, GateScore,
};
pub use models::{
    AircraftClass, Assignment, AssignmentId, Flight, FlightId, FlightStatus, Gate, GateClass,
    GateId, GateStatus, LedColor, NewFlight, NewGate, UnknownCode, ValidationError,
};
