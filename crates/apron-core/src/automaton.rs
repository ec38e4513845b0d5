//! Gate-assignment automaton.
//!
//! Models the physical lifecycle of a flight on the apron as a deterministic
//! finite-state machine. [`transition`] is pure: it never touches storage or
//! hardware, it only says where the automaton goes next and which outputs the
//! caller must dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::models::{AircraftClass, UnknownCode};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AutomatonState {
    /// Idle; initial state
    #[default]
    S0,
    /// Wide body detected
    S1,
    /// Jumbo detected
    S2,
    /// Narrow body detected
    S3,
    /// Gate assigned, aircraft taxiing in
    S4,
    /// Aircraft parked at its gate
    S5,
    /// No compatible gate; waiting for one to free up
    S6,
}

impl AutomatonState {
    pub const ALL: [AutomatonState; 7] = [
        AutomatonState::S0,
        AutomatonState::S1,
        AutomatonState::S2,
        AutomatonState::S3,
        AutomatonState::S4,
        AutomatonState::S5,
        AutomatonState::S6,
    ];

    pub fn code(self) -> &'static str {
        match self {
            AutomatonState::S0 => "S0",
            AutomatonState::S1 => "S1",
            AutomatonState::S2 => "S2",
            AutomatonState::S3 => "S3",
            AutomatonState::S4 => "S4",
            AutomatonState::S5 => "S5",
            AutomatonState::S6 => "S6",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AutomatonState::S0 => "idle, waiting for detection",
            AutomatonState::S1 => "wide body detected",
            AutomatonState::S2 => "jumbo detected",
            AutomatonState::S3 => "narrow body detected",
            AutomatonState::S4 => "gate assigned, guidance lights on",
            AutomatonState::S5 => "aircraft parked",
            AutomatonState::S6 => "no compatible gate available",
        }
    }

    /// Detection state for an aircraft class. `None` for unknown aircraft.
    pub fn detection_state(class: AircraftClass) -> Option<Self> {
        match class {
            AircraftClass::WideBody => Some(AutomatonState::S1),
            AircraftClass::Jumbo => Some(AutomatonState::S2),
            AircraftClass::NarrowBody => Some(AutomatonState::S3),
            AircraftClass::Unknown => None,
        }
    }

    /// Aircraft class encoded by a detection state.
    pub fn aircraft_class(self) -> Option<AircraftClass> {
        match self {
            AutomatonState::S1 => Some(AircraftClass::WideBody),
            AutomatonState::S2 => Some(AircraftClass::Jumbo),
            AutomatonState::S3 => Some(AircraftClass::NarrowBody),
            _ => None,
        }
    }

    pub fn is_initial(self) -> bool {
        self == AutomatonState::S0
    }

    pub fn is_detection_state(self) -> bool {
        matches!(self, AutomatonState::S1 | AutomatonState::S2 | AutomatonState::S3)
    }

    pub fn is_conflict_state(self) -> bool {
        self == AutomatonState::S6
    }

    /// A flight resting here is not waiting on any automatic action.
    pub fn is_quiescent(self) -> bool {
        matches!(self, AutomatonState::S0 | AutomatonState::S5)
    }

    /// Inputs accepted in this state, in declaration order.
    pub fn allowed_inputs(self) -> Vec<AutomatonInput> {
        AutomatonInput::ALL
            .into_iter()
            .filter(|input| can_transition(self, *input))
            .collect()
    }
}

impl fmt::Display for AutomatonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AutomatonState {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AutomatonState::ALL
            .into_iter()
            .find(|state| state.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCode::new("automaton state", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutomatonInput {
    /// Sensor detected an aircraft on the taxiway
    I1,
    /// Aircraft type confirmed against the fleet database
    I2,
    /// Compatible gate available
    I3,
    /// No compatible gate available
    I4,
    /// Aircraft arrived at its gate
    I5,
    /// Aircraft left its gate
    I6,
    /// Unrecognised input; never changes state
    #[serde(rename = "OTHER")]
    Other,
}

impl AutomatonInput {
    pub const ALL: [AutomatonInput; 7] = [
        AutomatonInput::I1,
        AutomatonInput::I2,
        AutomatonInput::I3,
        AutomatonInput::I4,
        AutomatonInput::I5,
        AutomatonInput::I6,
        AutomatonInput::Other,
    ];

    pub fn code(self) -> &'static str {
        match self {
            AutomatonInput::I1 => "I1",
            AutomatonInput::I2 => "I2",
            AutomatonInput::I3 => "I3",
            AutomatonInput::I4 => "I4",
            AutomatonInput::I5 => "I5",
            AutomatonInput::I6 => "I6",
            AutomatonInput::Other => "OTHER",
        }
    }
}

impl fmt::Display for AutomatonInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for AutomatonInput {
    type Err = UnknownCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AutomatonInput::ALL
            .into_iter()
            .find(|input| input.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCode::new("automaton input", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutomatonOutput {
    /// Route LEDs guiding the aircraft to its gate
    O1,
    /// Green LED on the assigned gate
    O2,
    /// Red LED: gate occupied
    O3,
    /// Display "wait" message
    O4,
    /// Persisted state update
    O5,
    #[serde(rename = "NONE")]
    None,
}

impl AutomatonOutput {
    pub fn code(self) -> &'static str {
        match self {
            AutomatonOutput::O1 => "O1",
            AutomatonOutput::O2 => "O2",
            AutomatonOutput::O3 => "O3",
            AutomatonOutput::O4 => "O4",
            AutomatonOutput::O5 => "O5",
            AutomatonOutput::None => "NONE",
        }
    }
}

impl fmt::Display for AutomatonOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("invalid transition: cannot process input {input} in state {state}")]
    InvalidTransition {
        state: AutomatonState,
        input: AutomatonInput,
    },
    #[error("invalid transition: cannot go from {state} to {attempted} with input {input}")]
    UnexpectedNextState {
        state: AutomatonState,
        input: AutomatonInput,
        attempted: AutomatonState,
    },
    #[error("input {input} in state {state} requires an aircraft class")]
    MissingAircraftClass {
        state: AutomatonState,
        input: AutomatonInput,
    },
    #[error("aircraft class {0} has no detection state")]
    UnsupportedAircraftClass(AircraftClass),
}

/// Result of applying one input to the automaton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: AutomatonState,
    pub to: AutomatonState,
    pub input: AutomatonInput,
    pub outputs: Vec<AutomatonOutput>,
}

impl Transition {
    pub fn changed_state(&self) -> bool {
        self.from != self.to
    }
}

#[derive(Debug, Clone, Copy)]
enum Next {
    To(AutomatonState),
    /// S1/S2/S3 chosen by the detected aircraft class
    ByAircraftClass,
}

const NO_OUTPUTS: &[AutomatonOutput] = &[];
const ASSIGN_OUTPUTS: &[AutomatonOutput] =
    &[AutomatonOutput::O1, AutomatonOutput::O2, AutomatonOutput::O5];
const WAIT_OUTPUTS: &[AutomatonOutput] = &[AutomatonOutput::O4];
const ARRIVAL_OUTPUTS: &[AutomatonOutput] = &[AutomatonOutput::O3, AutomatonOutput::O5];
const DEPARTURE_OUTPUTS: &[AutomatonOutput] = &[AutomatonOutput::O5];

/// The transition table. `None` means the pair is not allowed.
fn step(state: AutomatonState, input: AutomatonInput) -> Option<(Next, &'static [AutomatonOutput])> {
    use AutomatonInput::*;
    use AutomatonState::*;

    let entry = match (state, input) {
        (_, Other) => (Next::To(state), NO_OUTPUTS),

        (S0, I1) => (Next::ByAircraftClass, NO_OUTPUTS),

        (S1 | S2 | S3, I2) => (Next::To(state), NO_OUTPUTS),
        (S1 | S2 | S3, I3) => (Next::To(S4), ASSIGN_OUTPUTS),
        (S1 | S2 | S3, I4) => (Next::To(S6), WAIT_OUTPUTS),

        (S4, I5) => (Next::To(S5), ARRIVAL_OUTPUTS),
        (S5, I6) => (Next::To(S0), DEPARTURE_OUTPUTS),

        (S6, I1) => (Next::To(S0), NO_OUTPUTS),
        (S6, I3) => (Next::To(S4), ASSIGN_OUTPUTS),

        _ => return None,
    };
    Some(entry)
}

/// Whether `input` is accepted in `state`.
pub fn can_transition(state: AutomatonState, input: AutomatonInput) -> bool {
    step(state, input).is_some()
}

/// Apply `input` to `state`.
///
/// `aircraft_class` is only consulted for detection from S0, where it is
/// required and must be a known class.
pub fn transition(
    state: AutomatonState,
    input: AutomatonInput,
    aircraft_class: Option<AircraftClass>,
) -> Result<Transition, TransitionError> {
    let (next, outputs) =
        step(state, input).ok_or(TransitionError::InvalidTransition { state, input })?;

    let to = match next {
        Next::To(to) => to,
        Next::ByAircraftClass => {
            let class = aircraft_class.ok_or(TransitionError::MissingAircraftClass { state, input })?;
            AutomatonState::detection_state(class)
                .ok_or(TransitionError::UnsupportedAircraftClass(class))?
        }
    };

    Ok(Transition {
        from: state,
        to,
        input,
        outputs: outputs.to_vec(),
    })
}

/// Check an externally proposed transition against the table.
pub fn validate_transition(
    from: AutomatonState,
    input: AutomatonInput,
    to: AutomatonState,
) -> Result<(), TransitionError> {
    let (next, _) = step(from, input).ok_or(TransitionError::InvalidTransition { state: from, input })?;
    let matches = match next {
        Next::To(expected) => expected == to,
        Next::ByAircraftClass => to.is_detection_state(),
    };
    if matches {
        Ok(())
    } else {
        Err(TransitionError::UnexpectedNextState {
            state: from,
            input,
            attempted: to,
        })
    }
}

pub fn is_valid_transition(from: AutomatonState, input: AutomatonInput, to: AutomatonState) -> bool {
    validate_transition(from, input, to).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use AutomatonInput::*;
    use AutomatonOutput::{O1, O2, O3, O4, O5};
    use AutomatonState::*;

    fn run(state: AutomatonState, input: AutomatonInput) -> Transition {
        transition(state, input, None).unwrap()
    }

    #[test]
    fn test_detection_picks_state_by_class() {
        let cases = [
            (AircraftClass::WideBody, S1),
            (AircraftClass::Jumbo, S2),
            (AircraftClass::NarrowBody, S3),
        ];
        for (class, expected) in cases {
            let t = transition(S0, I1, Some(class)).unwrap();
            assert_eq!(t.to, expected);
            assert!(t.outputs.is_empty());
        }
    }

    #[test]
    fn test_detection_requires_known_class() {
        assert_eq!(
            transition(S0, I1, None),
            Err(TransitionError::MissingAircraftClass { state: S0, input: I1 })
        );
        assert_eq!(
            transition(S0, I1, Some(AircraftClass::Unknown)),
            Err(TransitionError::UnsupportedAircraftClass(AircraftClass::Unknown))
        );
    }

    #[test]
    fn test_confirmation_keeps_state() {
        for state in [S1, S2, S3] {
            let t = run(state, I2);
            assert_eq!(t.to, state);
            assert!(t.outputs.is_empty());
        }
    }

    #[test]
    fn test_availability_branches() {
        for state in [S1, S2, S3] {
            let found = run(state, I3);
            assert_eq!(found.to, S4);
            assert_eq!(found.outputs, vec![O1, O2, O5]);

            let missing = run(state, I4);
            assert_eq!(missing.to, S6);
            assert_eq!(missing.outputs, vec![O4]);
        }
    }

    #[test]
    fn test_conflict_reentry_matches_direct_assignment() {
        let direct = run(S3, I3);
        let reentry = run(S6, I3);
        assert_eq!(reentry.to, S4);
        assert_eq!(reentry.outputs, direct.outputs);
    }

    #[test]
    fn test_conflict_reset_and_hold() {
        assert_eq!(run(S6, I1).to, S0);
        assert_eq!(run(S6, Other).to, S6);
    }

    #[test]
    fn test_arrival_and_departure() {
        let arrived = run(S4, I5);
        assert_eq!(arrived.to, S5);
        assert_eq!(arrived.outputs, vec![O3, O5]);

        let departed = run(S5, I6);
        assert_eq!(departed.to, S0);
        assert_eq!(departed.outputs, vec![O5]);
    }

    #[test]
    fn test_other_is_noop_everywhere() {
        for state in AutomatonState::ALL {
            let t = run(state, Other);
            assert_eq!(t.to, state);
            assert!(t.outputs.is_empty());
            assert!(!t.changed_state());
        }
    }

    #[test]
    fn test_pairs_outside_table_are_rejected() {
        let allowed: &[(AutomatonState, AutomatonInput)] = &[
            (S0, I1),
            (S1, I2), (S1, I3), (S1, I4),
            (S2, I2), (S2, I3), (S2, I4),
            (S3, I2), (S3, I3), (S3, I4),
            (S4, I5),
            (S5, I6),
            (S6, I1), (S6, I3),
        ];

        for state in AutomatonState::ALL {
            for input in AutomatonInput::ALL {
                let expected = input == Other || allowed.contains(&(state, input));
                assert_eq!(can_transition(state, input), expected, "{state} + {input}");
                if !expected {
                    assert_eq!(
                        transition(state, input, Some(AircraftClass::NarrowBody)),
                        Err(TransitionError::InvalidTransition { state, input })
                    );
                }
            }
        }
    }

    #[test]
    fn test_validate_transition() {
        assert!(is_valid_transition(S0, I1, S2));
        assert!(!is_valid_transition(S0, I1, S4));
        assert!(is_valid_transition(S6, I3, S4));
        assert_eq!(
            validate_transition(S4, I5, S0),
            Err(TransitionError::UnexpectedNextState {
                state: S4,
                input: I5,
                attempted: S0
            })
        );
        assert_eq!(
            validate_transition(S4, I6, S0),
            Err(TransitionError::InvalidTransition { state: S4, input: I6 })
        );
    }

    #[test]
    fn test_state_helpers() {
        assert_eq!(S4.allowed_inputs(), vec![I5, Other]);
        assert!(S0.is_quiescent() && S5.is_quiescent());
        assert!(!S6.is_quiescent());
        for class in AircraftClass::KNOWN {
            let state = AutomatonState::detection_state(class).unwrap();
            assert_eq!(state.aircraft_class(), Some(class));
        }
        assert_eq!("s6".parse::<AutomatonState>().unwrap(), S6);
        assert_eq!("other".parse::<AutomatonInput>().unwrap(), Other);
    }
}
