//! Core data models for apron gate assignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::automaton::AutomatonState;

pub type FlightId = i64;
pub type GateId = i64;
pub type AssignmentId = i64;

/// Returned when a stored or wire code does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} code: {value}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownCode {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid flight number '{0}': expected two letters followed by 3-4 digits")]
    FlightNumber(String),
    #[error("invalid gate number '{0}': expected one letter followed by 1-3 digits")]
    GateNumber(String),
}

/// Size class of an aircraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AircraftClass {
    /// A320 family, B737
    NarrowBody,
    /// A350, B777, B787
    WideBody,
    /// A380, B747
    Jumbo,
    /// Not yet identified; fits no gate
    Unknown,
}

impl AircraftClass {
    pub const KNOWN: [AircraftClass; 3] = [
        AircraftClass::NarrowBody,
        AircraftClass::WideBody,
        AircraftClass::Jumbo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AircraftClass::NarrowBody => "NARROW_BODY",
            AircraftClass::WideBody => "WIDE_BODY",
            AircraftClass::Jumbo => "JUMBO",
            AircraftClass::Unknown => "UNKNOWN",
        }
    }

    /// The gate class an aircraft of this class fills exactly.
    pub fn ideal_gate_class(self) -> Option<GateClass> {
        match self {
            AircraftClass::NarrowBody => Some(GateClass::NarrowBody),
            AircraftClass::WideBody => Some(GateClass::WideBody),
            AircraftClass::Jumbo => Some(GateClass::Jumbo),
            AircraftClass::Unknown => None,
        }
    }

    /// Whether a larger gate may stand in when no ideal gate is free.
    pub fn accepts_larger_gate(self) -> bool {
        matches!(self, AircraftClass::NarrowBody | AircraftClass::WideBody)
    }
}

impl fmt::Display for AircraftClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AircraftClass {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "NARROW_BODY" => Ok(AircraftClass::NarrowBody),
            "WIDE_BODY" => Ok(AircraftClass::WideBody),
            "JUMBO" => Ok(AircraftClass::Jumbo),
            "UNKNOWN" => Ok(AircraftClass::Unknown),
            _ => Err(UnknownCode::new("aircraft class", s)),
        }
    }
}

/// Size class of a gate. Variant order is size order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateClass {
    NarrowBody,
    WideBody,
    Jumbo,
}

impl GateClass {
    pub const ALL: [GateClass; 3] = [GateClass::NarrowBody, GateClass::WideBody, GateClass::Jumbo];

    pub fn as_str(self) -> &'static str {
        match self {
            GateClass::NarrowBody => "NARROW_BODY",
            GateClass::WideBody => "WIDE_BODY",
            GateClass::Jumbo => "JUMBO",
        }
    }
}

impl fmt::Display for GateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateClass {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "NARROW_BODY" => Ok(GateClass::NarrowBody),
            "WIDE_BODY" => Ok(GateClass::WideBody),
            "JUMBO" => Ok(GateClass::Jumbo),
            _ => Err(UnknownCode::new("gate class", s)),
        }
    }
}

/// Operational status of a gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GateStatus {
    #[default]
    Free,
    /// Bound to a flight that has not arrived yet
    Assigned,
    /// Aircraft parked at the gate
    Occupied,
    Maintenance,
    /// Held for a scheduled flight; still assignable
    Reserved,
}

impl GateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GateStatus::Free => "FREE",
            GateStatus::Assigned => "ASSIGNED",
            GateStatus::Occupied => "OCCUPIED",
            GateStatus::Maintenance => "MAINTENANCE",
            GateStatus::Reserved => "RESERVED",
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, GateStatus::Free | GateStatus::Reserved)
    }

    pub fn is_occupied(self) -> bool {
        matches!(self, GateStatus::Assigned | GateStatus::Occupied)
    }

    /// Colour shown on the gate's status light.
    pub fn led_color(self) -> LedColor {
        match self {
            GateStatus::Free => LedColor::Green,
            GateStatus::Assigned => LedColor::Yellow,
            GateStatus::Occupied => LedColor::Red,
            GateStatus::Maintenance => LedColor::Orange,
            GateStatus::Reserved => LedColor::Blue,
        }
    }
}

impl fmt::Display for GateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GateStatus {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FREE" => Ok(GateStatus::Free),
            "ASSIGNED" => Ok(GateStatus::Assigned),
            "OCCUPIED" => Ok(GateStatus::Occupied),
            "MAINTENANCE" => Ok(GateStatus::Maintenance),
            "RESERVED" => Ok(GateStatus::Reserved),
            _ => Err(UnknownCode::new("gate status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedColor {
    Green,
    Yellow,
    Red,
    Orange,
    Blue,
}

impl LedColor {
    pub fn as_str(self) -> &'static str {
        match self {
            LedColor::Green => "GREEN",
            LedColor::Yellow => "YELLOW",
            LedColor::Red => "RED",
            LedColor::Orange => "ORANGE",
            LedColor::Blue => "BLUE",
        }
    }
}

impl fmt::Display for LedColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a flight, always derived from its automaton state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Detected,
    Confirmed,
    GateAssigned,
    Parked,
    Waiting,
}

impl FlightStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FlightStatus::Detected => "DETECTED",
            FlightStatus::Confirmed => "CONFIRMED",
            FlightStatus::GateAssigned => "GATE_ASSIGNED",
            FlightStatus::Parked => "PARKED",
            FlightStatus::Waiting => "WAITING",
        }
    }
}

impl From<AutomatonState> for FlightStatus {
    fn from(state: AutomatonState) -> Self {
        match state {
            AutomatonState::S0 => FlightStatus::Detected,
            AutomatonState::S1 | AutomatonState::S2 | AutomatonState::S3 => FlightStatus::Confirmed,
            AutomatonState::S4 => FlightStatus::GateAssigned,
            AutomatonState::S5 => FlightStatus::Parked,
            AutomatonState::S6 => FlightStatus::Waiting,
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked flight.
///
/// The lifecycle status is not stored separately; [`Flight::status`] derives
/// it from `automaton_state` so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub id: FlightId,
    pub flight_number: String,
    pub aircraft_class: AircraftClass,
    pub automaton_state: AutomatonState,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub airline: Option<String>,
    pub scheduled_arrival: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub scheduled_departure: Option<DateTime<Utc>>,
    pub actual_departure: Option<DateTime<Utc>>,
    /// Time of the most recent detection input
    pub detected_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Flight {
    /// Build a flight record from a creation request.
    pub fn from_request(id: FlightId, request: NewFlight, now: DateTime<Utc>) -> Self {
        Self {
            id,
            flight_number: request.flight_number,
            aircraft_class: request.aircraft_class,
            automaton_state: AutomatonState::S0,
            origin: request.origin,
            destination: request.destination,
            airline: request.airline,
            scheduled_arrival: request.scheduled_arrival,
            actual_arrival: None,
            scheduled_departure: request.scheduled_departure,
            actual_departure: None,
            detected_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> FlightStatus {
        FlightStatus::from(self.automaton_state)
    }

    /// Move the automaton and stamp the record.
    pub fn apply_state(&mut self, state: AutomatonState, now: DateTime<Utc>) {
        self.automaton_state = state;
        self.updated_at = now;
    }
}

/// Request to register a flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFlight {
    pub flight_number: String,
    pub aircraft_class: AircraftClass,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub airline: Option<String>,
    #[serde(default)]
    pub scheduled_arrival: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduled_departure: Option<DateTime<Utc>>,
}

impl NewFlight {
    pub fn new(flight_number: impl Into<String>, aircraft_class: AircraftClass) -> Self {
        Self {
            flight_number: flight_number.into(),
            aircraft_class,
            origin: None,
            destination: None,
            airline: None,
            scheduled_arrival: None,
            scheduled_departure: None,
        }
    }

    /// Set origin, destination and airline.
    pub fn with_route(
        mut self,
        origin: impl Into<String>,
        destination: impl Into<String>,
        airline: impl Into<String>,
    ) -> Self {
        self.origin = Some(origin.into());
        self.destination = Some(destination.into());
        self.airline = Some(airline.into());
        self
    }

    /// Upper-case the flight number and check its format.
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.flight_number = self.flight_number.trim().to_ascii_uppercase();
        if !is_valid_flight_number(&self.flight_number) {
            return Err(ValidationError::FlightNumber(self.flight_number));
        }
        Ok(self)
    }
}

/// A parking gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub id: GateId,
    pub gate_number: String,
    pub gate_class: GateClass,
    pub status: GateStatus,
    pub is_active: bool,
    pub terminal: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gate {
    pub fn from_request(id: GateId, request: NewGate, now: DateTime<Utc>) -> Self {
        Self {
            id,
            gate_number: request.gate_number,
            gate_class: request.gate_class,
            status: GateStatus::Free,
            is_active: true,
            terminal: request.terminal,
            location: request.location,
            created_at: now,
            updated_at: now,
        }
    }

    /// Active and in an assignable status.
    pub fn is_available(&self) -> bool {
        self.is_active && self.status.is_available()
    }
}

/// Request to register a gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGate {
    pub gate_number: String,
    pub gate_class: GateClass,
    #[serde(default)]
    pub terminal: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl NewGate {
    pub fn new(gate_number: impl Into<String>, gate_class: GateClass) -> Self {
        Self {
            gate_number: gate_number.into(),
            gate_class,
            terminal: None,
            location: None,
        }
    }

    pub fn in_terminal(mut self, terminal: impl Into<String>) -> Self {
        self.terminal = Some(terminal.into());
        self
    }

    pub fn at_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.gate_number = self.gate_number.trim().to_ascii_uppercase();
        if !is_valid_gate_number(&self.gate_number) {
            return Err(ValidationError::GateNumber(self.gate_number));
        }
        Ok(self)
    }
}

/// Binding of one flight to one gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub flight_id: FlightId,
    pub gate_id: GateId,
    pub assigned_at: DateTime<Utc>,
    pub expected_arrival: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub departure_time: Option<DateTime<Utc>>,
    /// Cleared when the flight departs
    pub is_active: bool,
    pub led_activated: bool,
    pub notes: Option<String>,
}

/// Two upper-case letters followed by three or four digits (e.g. `AV1234`).
pub fn is_valid_flight_number(value: &str) -> bool {
    let bytes = value.as_bytes();
    (5..=6).contains(&bytes.len())
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..].iter().all(u8::is_ascii_digit)
}

/// One upper-case letter followed by one to three digits (e.g. `C12`).
pub fn is_valid_gate_number(value: &str) -> bool {
    let bytes = value.as_bytes();
    (2..=4).contains(&bytes.len())
        && bytes[0].is_ascii_uppercase()
        && bytes[1..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_number_format() {
        assert!(is_valid_flight_number("AV123"));
        assert!(is_valid_flight_number("LA4521"));
        assert!(!is_valid_flight_number("AV12"));
        assert!(!is_valid_flight_number("AV12345"));
        assert!(!is_valid_flight_number("A1234"));
        assert!(!is_valid_flight_number("av123"));
        assert!(!is_valid_flight_number(""));
    }

    #[test]
    fn test_new_flight_normalizes_case() {
        let flight = NewFlight::new(" dl456 ", AircraftClass::WideBody)
            .normalized()
            .unwrap();
        assert_eq!(flight.flight_number, "DL456");

        let err = NewFlight::new("DELTA1", AircraftClass::WideBody)
            .normalized()
            .unwrap_err();
        assert_eq!(err, ValidationError::FlightNumber("DELTA1".into()));
    }

    #[test]
    fn test_gate_number_format() {
        assert!(is_valid_gate_number("A1"));
        assert!(is_valid_gate_number("C123"));
        assert!(!is_valid_gate_number("C1234"));
        assert!(!is_valid_gate_number("12"));
        assert!(NewGate::new("b4", GateClass::WideBody).normalized().is_ok());
    }

    #[test]
    fn test_gate_status_availability() {
        assert!(GateStatus::Free.is_available());
        assert!(GateStatus::Reserved.is_available());
        assert!(!GateStatus::Maintenance.is_available());
        assert!(GateStatus::Assigned.is_occupied());
        assert!(GateStatus::Occupied.is_occupied());
        assert!(!GateStatus::Free.is_occupied());
    }

    #[test]
    fn test_inactive_gate_is_unavailable() {
        let mut gate = Gate::from_request(1, NewGate::new("C1", GateClass::NarrowBody), Utc::now());
        assert!(gate.is_available());
        gate.is_active = false;
        assert!(!gate.is_available());
    }

    #[test]
    fn test_status_derives_from_state() {
        use AutomatonState::*;
        assert_eq!(FlightStatus::from(S0), FlightStatus::Detected);
        for state in [S1, S2, S3] {
            assert_eq!(FlightStatus::from(state), FlightStatus::Confirmed);
        }
        assert_eq!(FlightStatus::from(S4), FlightStatus::GateAssigned);
        assert_eq!(FlightStatus::from(S5), FlightStatus::Parked);
        assert_eq!(FlightStatus::from(S6), FlightStatus::Waiting);
    }

    #[test]
    fn test_codes_parse_back() {
        for class in GateClass::ALL {
            assert_eq!(class.as_str().parse::<GateClass>().unwrap(), class);
        }
        assert_eq!("wide body".parse::<AircraftClass>().unwrap(), AircraftClass::WideBody);
        assert!("TURBOPROP".parse::<AircraftClass>().is_err());
        assert_eq!(
            serde_json::to_string(&GateStatus::Maintenance).unwrap(),
            "\"MAINTENANCE\""
        );
    }
}
