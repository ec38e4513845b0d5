//! Scripted traffic run against an in-process orchestrator.

use apron_core::{AutomatonState, FlightId, GateClass, NewGate};
use apron_server::Orchestrator;
use std::collections::HashSet;
use std::time::Duration;

use super::TrafficGenerator;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Flights to detect
    pub flights: usize,
    /// Pause between arrival and departure, and after each round
    pub turnaround: Duration,
    /// Share of parked flights that depart each round
    pub departure_share: f64,
    pub max_rounds: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            flights: 20,
            turnaround: Duration::from_millis(50),
            departure_share: 0.8,
            max_rounds: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationSummary {
    pub detected: usize,
    pub assigned_on_detection: usize,
    pub waited: usize,
    /// Waiting flights that later got a gate
    pub reassigned: usize,
    pub arrived: usize,
    pub departed: usize,
    pub still_waiting: usize,
}

/// Gates for a simulated apron: jumbo in terminal A, wide in B, narrow in C.
pub fn gate_layout(narrow: u32, wide: u32, jumbo: u32) -> Vec<NewGate> {
    [
        ('A', GateClass::Jumbo, jumbo),
        ('B', GateClass::WideBody, wide),
        ('C', GateClass::NarrowBody, narrow),
    ]
    .into_iter()
    .flat_map(|(terminal, class, count)| {
        (1..=count).map(move |n| NewGate::new(format!("{terminal}{n}"), class).in_terminal(terminal))
    })
    .collect()
}

/// Detect every generated flight, then turn parked flights around in rounds.
///
/// Each round lands every parked flight and sends a share of them off again.
/// Departures free gates, so flights the reactor places in between join the
/// next round. Stops when a round leaves nothing new parked.
pub async fn run_simulation(
    orchestrator: &Orchestrator,
    generator: &mut TrafficGenerator,
    config: &SimulationConfig,
) -> anyhow::Result<SimulationSummary> {
    let mut summary = SimulationSummary::default();
    let mut parked: Vec<FlightId> = Vec::new();
    let mut waiting: HashSet<FlightId> = HashSet::new();

    for _ in 0..config.flights {
        let outcome = orchestrator.detect_flight(generator.next_flight()).await?;
        summary.detected += 1;
        match outcome.flight.automaton_state {
            AutomatonState::S4 => {
                summary.assigned_on_detection += 1;
                parked.push(outcome.flight.id);
            }
            AutomatonState::S6 => {
                summary.waited += 1;
                waiting.insert(outcome.flight.id);
            }
            other => tracing::warn!(
                "Flight {} stopped in {} after detection",
                outcome.flight.flight_number,
                other
            ),
        }
    }

    let mut seen: HashSet<FlightId> = parked.iter().copied().collect();
    for round in 1..=config.max_rounds {
        if parked.is_empty() {
            break;
        }
        tracing::debug!("Round {}: {} flights parked", round, parked.len());

        for flight_id in std::mem::take(&mut parked) {
            orchestrator.on_arrival(flight_id).await?;
            summary.arrived += 1;
            if generator.chance(config.departure_share) {
                tokio::time::sleep(config.turnaround).await;
                orchestrator.on_departure(flight_id).await?;
                summary.departed += 1;
            }
        }

        // Let the reactor place waiting flights on the gates just freed.
        tokio::time::sleep(config.turnaround).await;
        for flight in orchestrator.store().list_flights().await? {
            if flight.automaton_state == AutomatonState::S4 && seen.insert(flight.id) {
                if waiting.contains(&flight.id) {
                    summary.reassigned += 1;
                }
                parked.push(flight.id);
            }
        }
    }

    summary.still_waiting = orchestrator.store().find_waiting_flights().await?.len();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apron_server::events::EventBus;
    use apron_server::hardware::SimulatedHardware;
    use apron_server::loops::waiting_flight_loop::run_waiting_flight_loop;
    use apron_server::persistence::{MemoryStore, Store};
    use apron_server::state::StateRegistry;
    use std::sync::Arc;
    use tokio::sync::broadcast;

    async fn orchestrator(narrow: u32, wide: u32, jumbo: u32) -> Arc<Orchestrator> {
        let store = Arc::new(MemoryStore::new());
        for gate in gate_layout(narrow, wide, jumbo) {
            store.insert_gate(gate).await.unwrap();
        }
        Arc::new(Orchestrator::new(
            store,
            Arc::new(StateRegistry::new()),
            Arc::new(SimulatedHardware::new()),
            EventBus::new(256),
        ))
    }

    #[test]
    fn test_gate_layout() {
        let gates = gate_layout(2, 1, 1);
        let numbers: Vec<&str> = gates.iter().map(|g| g.gate_number.as_str()).collect();
        assert_eq!(numbers, ["A1", "B1", "C1", "C2"]);
        assert_eq!(gates[0].gate_class, GateClass::Jumbo);
        assert_eq!(gates[3].terminal.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn test_everything_fits_and_departs() {
        let orchestrator = orchestrator(20, 20, 20).await;
        let mut generator = TrafficGenerator::new(3);
        let config = SimulationConfig {
            flights: 10,
            turnaround: Duration::from_millis(1),
            departure_share: 1.0,
            max_rounds: 5,
        };

        let summary = run_simulation(&orchestrator, &mut generator, &config)
            .await
            .unwrap();
        assert_eq!(summary.detected, 10);
        assert_eq!(summary.assigned_on_detection, 10);
        assert_eq!(summary.waited, 0);
        assert_eq!(summary.arrived, 10);
        assert_eq!(summary.departed, 10);
        assert_eq!(summary.still_waiting, 0);
        assert!(orchestrator.store().list_active_assignments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scarce_gates_with_reactor() {
        let orchestrator = orchestrator(1, 1, 1).await;
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let reactor = tokio::spawn(run_waiting_flight_loop(
            orchestrator.clone(),
            orchestrator.events().subscribe_gate_freed(),
            shutdown_tx.subscribe(),
        ));

        let mut generator = TrafficGenerator::new(11);
        let config = SimulationConfig {
            flights: 8,
            turnaround: Duration::from_millis(20),
            departure_share: 1.0,
            max_rounds: 20,
        };
        let summary = run_simulation(&orchestrator, &mut generator, &config)
            .await
            .unwrap();

        assert_eq!(summary.detected, 8);
        assert_eq!(summary.assigned_on_detection + summary.waited, 8);
        assert!(summary.assigned_on_detection <= 3);
        assert_eq!(summary.arrived, summary.assigned_on_detection + summary.reassigned);
        assert_eq!(summary.departed, summary.arrived);
        assert!(summary.reassigned <= summary.waited);

        let active = orchestrator.store().list_active_assignments().await.unwrap();
        let gates: HashSet<_> = active.iter().map(|a| a.gate_id).collect();
        assert_eq!(gates.len(), active.len());

        shutdown_tx.send(()).unwrap();
        reactor.await.unwrap();
    }
}
