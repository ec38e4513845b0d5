//! Gate claims under contention.

use apron_core::{AircraftClass, AutomatonState, GateClass, GateStatus, NewFlight, NewGate};
use apron_server::events::EventBus;
use apron_server::hardware::SimulatedHardware;
use apron_server::persistence::{init_database, MemoryStore, SqliteStore, Store};
use apron_server::state::StateRegistry;
use apron_server::{EngineError, Orchestrator};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

const CONTENDERS: usize = 16;

fn temp_db_path() -> PathBuf {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    std::env::temp_dir().join(format!("apron-test-{}-{}.db", std::process::id(), nanos))
}

/// Every contender claims the same gate for its own flight.
async fn race_for_one_gate(store: Arc<dyn Store>) {
    let gate = store
        .insert_gate(NewGate::new("C1", GateClass::NarrowBody))
        .await
        .unwrap();
    let mut flight_ids = Vec::new();
    for i in 0..CONTENDERS {
        let flight = store
            .insert_flight(NewFlight::new(format!("AV{:03}", i), AircraftClass::NarrowBody))
            .await
            .unwrap();
        flight_ids.push(flight.id);
    }

    let gate_id = gate.id;
    let handles: Vec<_> = flight_ids
        .into_iter()
        .map(|flight_id| {
            let store = store.clone();
            tokio::spawn(async move { store.claim_gate(flight_id, gate_id, None).await })
        })
        .collect();

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(EngineError::GateAlreadyOccupied(id)) => assert_eq!(id, gate_id),
            Err(other) => panic!("unexpected claim error: {other}"),
        }
    }

    assert_eq!(won, 1);
    assert_eq!(store.list_active_assignments().await.unwrap().len(), 1);
    let gate = store.get_gate(gate_id).await.unwrap().unwrap();
    assert_eq!(gate.status, GateStatus::Assigned);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_memory_store_grants_gate_once() {
    race_for_one_gate(Arc::new(MemoryStore::new())).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sqlite_store_grants_gate_once() {
    let path = temp_db_path();
    let db = init_database(path.to_str().unwrap(), 4).await.unwrap();
    race_for_one_gate(Arc::new(SqliteStore::new(db))).await;
    let _ = std::fs::remove_file(&path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_flight_cannot_hold_two_gates() {
    let store = Arc::new(MemoryStore::new());
    let flight = store
        .insert_flight(NewFlight::new("LA321", AircraftClass::NarrowBody))
        .await
        .unwrap();
    let mut gate_ids = Vec::new();
    for n in 1..=4 {
        let gate = store
            .insert_gate(NewGate::new(format!("C{n}"), GateClass::NarrowBody))
            .await
            .unwrap();
        gate_ids.push(gate.id);
    }

    let flight_id = flight.id;
    let handles: Vec<_> = gate_ids
        .iter()
        .map(|&gate_id| {
            let store = store.clone();
            tokio::spawn(async move { store.claim_gate(flight_id, gate_id, None).await })
        })
        .collect();

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(EngineError::FlightAlreadyAssigned(id)) => assert_eq!(id, flight_id),
            Err(other) => panic!("unexpected claim error: {other}"),
        }
    }
    assert_eq!(won, 1);

    let gates = store.list_gates().await.unwrap();
    let assigned = gates.iter().filter(|g| g.status == GateStatus::Assigned).count();
    assert_eq!(assigned, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_detections_never_share_a_gate() {
    let store = Arc::new(MemoryStore::new());
    for n in 1..=3 {
        store
            .insert_gate(NewGate::new(format!("C{n}"), GateClass::NarrowBody))
            .await
            .unwrap();
    }
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        Arc::new(StateRegistry::new()),
        Arc::new(SimulatedHardware::new()),
        EventBus::new(256),
    ));

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                orchestrator
                    .detect_flight(NewFlight::new(format!("JJ{:03}", 100 + i), AircraftClass::NarrowBody))
                    .await
            })
        })
        .collect();

    let mut assigned = 0;
    let mut waiting = 0;
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        match outcome.flight.automaton_state {
            AutomatonState::S4 => assigned += 1,
            AutomatonState::S6 => waiting += 1,
            other => panic!("flight ended in {other}"),
        }
    }
    assert_eq!(assigned, 3);
    assert_eq!(waiting, 7);

    let active = store.list_active_assignments().await.unwrap();
    let gates: HashSet<_> = active.iter().map(|a| a.gate_id).collect();
    let flights: HashSet<_> = active.iter().map(|a| a.flight_id).collect();
    assert_eq!(active.len(), 3);
    assert_eq!(gates.len(), 3);
    assert_eq!(flights.len(), 3);

    for flight in store.list_flights().await.unwrap() {
        assert_eq!(orchestrator.registry().get(flight.id), flight.automaton_state);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_operator_assignments() {
    let store = Arc::new(MemoryStore::new());
    let gate = store
        .insert_gate(NewGate::new("B1", GateClass::WideBody))
        .await
        .unwrap();
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        Arc::new(StateRegistry::new()),
        Arc::new(SimulatedHardware::new()),
        EventBus::new(64),
    ));
    orchestrator
        .update_gate_status(gate.id, GateStatus::Maintenance)
        .await
        .unwrap();

    let mut flight_ids = Vec::new();
    for i in 0..6 {
        let outcome = orchestrator
            .detect_flight(NewFlight::new(format!("BA{:03}", 200 + i), AircraftClass::WideBody))
            .await
            .unwrap();
        assert_eq!(outcome.flight.automaton_state, AutomatonState::S6);
        flight_ids.push(outcome.flight.id);
    }
    orchestrator
        .update_gate_status(gate.id, GateStatus::Free)
        .await
        .unwrap();

    let gate_id = gate.id;
    let handles: Vec<_> = flight_ids
        .iter()
        .map(|&flight_id| {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.assign_gate(flight_id, gate_id).await })
        })
        .collect();

    let mut won = Vec::new();
    for (handle, flight_id) in handles.into_iter().zip(&flight_ids) {
        match handle.await.unwrap() {
            Ok(outcome) => {
                assert_eq!(outcome.flight.automaton_state, AutomatonState::S4);
                won.push(*flight_id);
            }
            Err(err) => assert!(err.is_retryable(), "unexpected error: {err}"),
        }
    }
    assert_eq!(won.len(), 1);

    for flight_id in flight_ids {
        let flight = store.get_flight(flight_id).await.unwrap().unwrap();
        let expected = if flight_id == won[0] {
            AutomatonState::S4
        } else {
            AutomatonState::S6
        };
        assert_eq!(flight.automaton_state, expected);
    }
}
