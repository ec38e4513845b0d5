//! Live automaton state per flight.
//!
//! A write-through cache in front of the persisted flight record. The
//! orchestrator writes here only after the store accepted the new state, so on
//! disagreement the store wins.

use apron_core::{AutomatonState, Flight, FlightId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub state: AutomatonState,
    pub transitioned_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct StateRegistry {
    entries: DashMap<FlightId, RegistryEntry>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, S0 for flights the registry has never seen.
    pub fn get(&self, flight_id: FlightId) -> AutomatonState {
        self.entries
            .get(&flight_id)
            .map(|entry| entry.state)
            .unwrap_or_default()
    }

    pub fn entry(&self, flight_id: FlightId) -> Option<RegistryEntry> {
        self.entries.get(&flight_id).map(|entry| *entry)
    }

    pub fn contains(&self, flight_id: FlightId) -> bool {
        self.entries.contains_key(&flight_id)
    }

    pub fn set(&self, flight_id: FlightId, state: AutomatonState) {
        self.entries.insert(
            flight_id,
            RegistryEntry {
                state,
                transitioned_at: Utc::now(),
            },
        );
    }

    /// Forget a flight after departure so the next detection starts clean.
    pub fn remove(&self, flight_id: FlightId) -> Option<AutomatonState> {
        self.entries.remove(&flight_id).map(|(_, entry)| entry.state)
    }

    pub fn time_since_last_transition(&self, flight_id: FlightId) -> Option<chrono::Duration> {
        self.entries
            .get(&flight_id)
            .map(|entry| Utc::now() - entry.transitioned_at)
    }

    /// Load every flight that is somewhere in its lifecycle.
    pub fn prime<'a>(&self, flights: impl IntoIterator<Item = &'a Flight>) -> usize {
        let mut loaded = 0;
        for flight in flights {
            if flight.automaton_state.is_initial() {
                continue;
            }
            self.entries.insert(
                flight.id,
                RegistryEntry {
                    state: flight.automaton_state,
                    transitioned_at: flight.updated_at,
                },
            );
            loaded += 1;
        }
        loaded
    }

    pub fn snapshot(&self) -> Vec<(FlightId, RegistryEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apron_core::{AircraftClass, NewFlight};
    use std::sync::Arc;

    #[test]
    fn test_unknown_flight_defaults_to_idle() {
        let registry = StateRegistry::new();
        assert_eq!(registry.get(42), AutomatonState::S0);
        assert!(registry.entry(42).is_none());
    }

    #[test]
    fn test_set_and_remove() {
        let registry = StateRegistry::new();
        registry.set(1, AutomatonState::S4);
        assert_eq!(registry.get(1), AutomatonState::S4);
        assert!(registry.time_since_last_transition(1).is_some());
        assert_eq!(registry.remove(1), Some(AutomatonState::S4));
        assert!(registry.is_empty());
        assert_eq!(registry.get(1), AutomatonState::S0);
    }

    #[test]
    fn test_prime_skips_idle_flights() {
        let now = Utc::now();
        let idle = Flight::from_request(1, NewFlight::new("AV100", AircraftClass::Jumbo), now);
        let mut waiting = Flight::from_request(2, NewFlight::new("AV200", AircraftClass::Jumbo), now);
        waiting.apply_state(AutomatonState::S6, now);

        let registry = StateRegistry::new();
        assert_eq!(registry.prime([&idle, &waiting]), 1);
        assert_eq!(registry.get(2), AutomatonState::S6);
        assert!(!registry.contains(1));
    }

    #[test]
    fn test_concurrent_writers_on_distinct_flights() {
        let registry = Arc::new(StateRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|id| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        registry.set(id, AutomatonState::S3);
                        registry.set(id, AutomatonState::S4);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 8);
        assert!(registry.snapshot().iter().all(|(_, e)| e.state == AutomatonState::S4));
    }
}
