//! Gate search.
//!
//! First fit, not best fit: the ideal class is tried first, then for aircraft
//! that may take a larger gate every available gate largest class first.
//! Ties go to storage order.

use apron_core::{first_compatible, AircraftClass, FlightId, Gate};

use crate::error::{EngineError, EngineResult};
use crate::persistence::Store;

/// Find a gate for an aircraft class, or `None` when nothing fits.
pub async fn find_gate(store: &dyn Store, class: AircraftClass) -> EngineResult<Option<Gate>> {
    let ideal = match class.ideal_gate_class() {
        Some(ideal) => ideal,
        None => return Ok(None),
    };

    if let Some(gate) = store
        .find_available_gates_by_class(ideal)
        .await?
        .into_iter()
        .next()
    {
        return Ok(Some(gate));
    }

    if !class.accepts_larger_gate() {
        return Ok(None);
    }

    let fallback = first_compatible(class, store.find_available_gates_by_class_desc().await?);
    if let Some(gate) = &fallback {
        tracing::debug!(
            "No {} gate free, falling back to {} gate {}",
            ideal,
            gate.gate_class,
            gate.gate_number
        );
    }
    Ok(fallback)
}

/// Like [`find_gate`], for callers that need a guaranteed match.
pub async fn find_gate_or_err(
    store: &dyn Store,
    flight_id: FlightId,
    class: AircraftClass,
) -> EngineResult<Gate> {
    find_gate(store, class)
        .await?
        .ok_or(EngineError::NoAvailableGate(flight_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use apron_core::{GateClass, GateStatus, NewGate};

    async fn store(gates: &[(&str, GateClass)]) -> MemoryStore {
        let store = MemoryStore::new();
        for (number, class) in gates {
            store.insert_gate(NewGate::new(*number, *class)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_prefers_ideal_class() {
        let store = store(&[("A1", GateClass::Jumbo), ("C1", GateClass::NarrowBody)]).await;
        let gate = find_gate(&store, AircraftClass::NarrowBody).await.unwrap().unwrap();
        assert_eq!(gate.gate_number, "C1");
    }

    #[tokio::test]
    async fn test_fallback_takes_largest_class_first() {
        let store = store(&[
            ("B1", GateClass::WideBody),
            ("A1", GateClass::Jumbo),
            ("C1", GateClass::NarrowBody),
        ])
        .await;
        store.set_gate_status(3, GateStatus::Maintenance).await.unwrap();

        let gate = find_gate(&store, AircraftClass::NarrowBody).await.unwrap().unwrap();
        assert_eq!(gate.gate_number, "A1");
    }

    #[tokio::test]
    async fn test_jumbo_never_falls_back() {
        let store = store(&[("B1", GateClass::WideBody)]).await;
        assert!(find_gate(&store, AircraftClass::Jumbo).await.unwrap().is_none());
        let err = find_gate_or_err(&store, 7, AircraftClass::Jumbo).await.unwrap_err();
        assert!(matches!(err, EngineError::NoAvailableGate(7)));
    }

    #[tokio::test]
    async fn test_wide_body_skips_narrow_gates() {
        let store = store(&[("C1", GateClass::NarrowBody)]).await;
        assert!(find_gate(&store, AircraftClass::WideBody).await.unwrap().is_none());
        assert!(find_gate(&store, AircraftClass::Unknown).await.unwrap().is_none());
    }
}
