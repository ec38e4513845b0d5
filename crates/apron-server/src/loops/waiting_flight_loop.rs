//! Waiting-flight reactor.
//!
//! Consumes gate-freed events and retries assignment for flights stuck in S6.
//! Runs as its own task so the operation that freed the gate never waits on it.

use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use apron_core::{is_compatible, FlightId};

use crate::error::EngineResult;
use crate::events::GateFreedEvent;
use crate::orchestrator::Orchestrator;

pub async fn run_waiting_flight_loop(
    orchestrator: Arc<Orchestrator>,
    mut gate_freed: broadcast::Receiver<GateFreedEvent>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Waiting-flight loop shutting down");
                break;
            }
            event = gate_freed.recv() => {
                match event {
                    Ok(event) => {
                        if let Err(err) = handle_gate_freed(&orchestrator, &event).await {
                            tracing::error!(
                                "Reassignment after gate {} freed failed: {}",
                                event.gate.gate_number,
                                err
                            );
                        }
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!("Missed {} gate-freed events, sweeping waiting flights", missed);
                        match sweep_waiting_flights(&orchestrator).await {
                            Ok(placed) => tracing::info!("Sweep placed {} waiting flights", placed),
                            Err(err) => tracing::error!("Waiting-flight sweep failed: {}", err),
                        }
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Gate-freed channel closed, waiting-flight loop exiting");
                        break;
                    }
                }
            }
        }
    }
}

/// React to one freed gate.
///
/// Picks the first waiting flight, in waiting order, whose class fits the
/// freed gate and retries it. Returns the flight that got a gate, if any.
pub async fn handle_gate_freed(
    orchestrator: &Orchestrator,
    event: &GateFreedEvent,
) -> EngineResult<Option<FlightId>> {
    let waiting = orchestrator.store().find_waiting_flights().await?;
    if waiting.is_empty() {
        tracing::debug!("Gate {} freed, no flights waiting", event.gate.gate_number);
        return Ok(None);
    }

    let candidate = waiting
        .iter()
        .find(|flight| is_compatible(flight.aircraft_class, event.gate.gate_class));
    let flight = match candidate {
        Some(flight) => flight,
        None => {
            tracing::debug!(
                "None of {} waiting flights fit {} gate {}",
                waiting.len(),
                event.gate.gate_class,
                event.gate.gate_number
            );
            return Ok(None);
        }
    };

    tracing::info!(
        "Gate {} freed ({:?}), retrying waiting flight {}",
        event.gate.gate_number,
        event.reason,
        flight.flight_number
    );
    if orchestrator.retry_gate_assignment(flight.id).await? {
        Ok(Some(flight.id))
    } else {
        Ok(None)
    }
}

/// Retry every waiting flight once. Used when events may have been dropped.
pub async fn sweep_waiting_flights(orchestrator: &Orchestrator) -> EngineResult<usize> {
    let mut placed = 0;
    for flight in orchestrator.store().find_waiting_flights().await? {
        if orchestrator.retry_gate_assignment(flight.id).await? {
            placed += 1;
        }
    }
    Ok(placed)
}
