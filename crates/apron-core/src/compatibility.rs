//! Aircraft/gate compatibility and gate scoring.

use serde::{Deserialize, Serialize};

use crate::models::{AircraftClass, Flight, Gate, GateClass, GateStatus};

/// An aircraft may use any gate at least as large as its own class.
///
/// Unknown aircraft fit nowhere.
pub fn is_compatible(aircraft: AircraftClass, gate: GateClass) -> bool {
    match aircraft.ideal_gate_class() {
        Some(ideal) => gate >= ideal,
        None => false,
    }
}

/// Gate class that fits an aircraft exactly.
pub fn ideal_gate_class(aircraft: AircraftClass) -> Option<GateClass> {
    aircraft.ideal_gate_class()
}

/// First gate, in iteration order, whose class fits the aircraft.
pub fn first_compatible<I>(aircraft: AircraftClass, gates: I) -> Option<Gate>
where
    I: IntoIterator<Item = Gate>,
{
    gates
        .into_iter()
        .find(|gate| is_compatible(aircraft, gate.gate_class))
}

const EXACT_MATCH_SCORE: u32 = 100;
const OVERSIZED_SCORE: u32 = 50;
const TERMINAL_BONUS: u32 = 20;
const FREE_BONUS: u32 = 30;

/// Diagnostic ranking of a gate for a flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateScore {
    pub score: u32,
    pub reason: String,
}

impl GateScore {
    fn rejected(reason: &str) -> Self {
        Self {
            score: 0,
            reason: reason.to_string(),
        }
    }
}

/// Score a gate for a flight.
///
/// Zero when the gate is unavailable or too small. Otherwise 100 for an exact
/// class match or 50 for an oversized gate, plus 20 when the gate has a
/// terminal and 30 when it is plainly FREE rather than RESERVED.
pub fn score_gate(flight: &Flight, gate: &Gate) -> GateScore {
    if !gate.is_available() {
        return GateScore::rejected("Gate not available");
    }
    if !is_compatible(flight.aircraft_class, gate.gate_class) {
        return GateScore::rejected("Incompatible aircraft and gate classes");
    }

    let mut score = 0;
    let mut reasons = Vec::new();

    if ideal_gate_class(flight.aircraft_class) == Some(gate.gate_class) {
        score += EXACT_MATCH_SCORE;
        reasons.push("Perfect match.");
    } else {
        score += OVERSIZED_SCORE;
        reasons.push("Compatible but oversized gate.");
    }

    if gate.terminal.is_some() {
        score += TERMINAL_BONUS;
        reasons.push("Terminal available.");
    }

    if gate.status == GateStatus::Free {
        score += FREE_BONUS;
        reasons.push("Gate completely free.");
    }

    GateScore {
        score,
        reason: reasons.join(" "),
    }
}

/// Score every gate and sort best first. Ties keep the input order.
pub fn rank_gates<'a, I>(flight: &Flight, gates: I) -> Vec<(&'a Gate, GateScore)>
where
    I: IntoIterator<Item = &'a Gate>,
{
    let mut ranked: Vec<(&Gate, GateScore)> = gates
        .into_iter()
        .map(|gate| (gate, score_gate(flight, gate)))
        .collect();
    ranked.sort_by(|a, b| b.1.score.cmp(&a.1.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewFlight, NewGate};
    use chrono::Utc;

    fn gate(id: i64, class: GateClass) -> Gate {
        Gate::from_request(id, NewGate::new(format!("G{id}"), class), Utc::now())
    }

    fn flight(class: AircraftClass) -> Flight {
        Flight::from_request(1, NewFlight::new("AV101", class), Utc::now())
    }

    #[test]
    fn test_ideal_class_is_compatible_and_bijective() {
        let mut seen = Vec::new();
        for class in AircraftClass::KNOWN {
            let ideal = ideal_gate_class(class).unwrap();
            assert!(is_compatible(class, ideal));
            assert!(!seen.contains(&ideal));
            seen.push(ideal);
        }
        assert_eq!(seen.len(), GateClass::ALL.len());
    }

    #[test]
    fn test_compatibility_is_monotonic_in_gate_size() {
        for class in AircraftClass::KNOWN {
            for small in GateClass::ALL {
                for large in GateClass::ALL.into_iter().filter(|g| *g > small) {
                    if is_compatible(class, small) {
                        assert!(is_compatible(class, large), "{class} {small} -> {large}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_compatibility_table() {
        assert!(is_compatible(AircraftClass::NarrowBody, GateClass::Jumbo));
        assert!(is_compatible(AircraftClass::WideBody, GateClass::Jumbo));
        assert!(!is_compatible(AircraftClass::WideBody, GateClass::NarrowBody));
        assert!(!is_compatible(AircraftClass::Jumbo, GateClass::WideBody));
        for gate_class in GateClass::ALL {
            assert!(!is_compatible(AircraftClass::Unknown, gate_class));
        }
    }

    #[test]
    fn test_first_compatible_keeps_order() {
        let gates = vec![gate(1, GateClass::NarrowBody), gate(2, GateClass::Jumbo), gate(3, GateClass::WideBody)];
        let found = first_compatible(AircraftClass::WideBody, gates).unwrap();
        assert_eq!(found.id, 2);
    }

    #[test]
    fn test_score_exact_match_free_with_terminal() {
        let mut g = gate(1, GateClass::NarrowBody);
        g.terminal = Some("C".into());
        let score = score_gate(&flight(AircraftClass::NarrowBody), &g);
        assert_eq!(score.score, 150);
        assert!(score.reason.starts_with("Perfect match."));
    }

    #[test]
    fn test_score_oversized_reserved() {
        let mut g = gate(1, GateClass::Jumbo);
        g.status = GateStatus::Reserved;
        let score = score_gate(&flight(AircraftClass::NarrowBody), &g);
        assert_eq!(score.score, 50);
    }

    #[test]
    fn test_score_rejects_unavailable_or_small() {
        let mut busy = gate(1, GateClass::Jumbo);
        busy.status = GateStatus::Occupied;
        assert_eq!(score_gate(&flight(AircraftClass::Jumbo), &busy).score, 0);

        let small = gate(2, GateClass::NarrowBody);
        assert_eq!(score_gate(&flight(AircraftClass::Jumbo), &small).score, 0);
    }

    #[test]
    fn test_rank_puts_exact_match_first() {
        let gates = vec![gate(1, GateClass::Jumbo), gate(2, GateClass::WideBody), gate(3, GateClass::NarrowBody)];
        let ranked = rank_gates(&flight(AircraftClass::WideBody), &gates);
        assert_eq!(ranked[0].0.id, 2);
        assert_eq!(ranked[1].0.id, 1);
        assert_eq!(ranked[2].1.score, 0);
    }
}
