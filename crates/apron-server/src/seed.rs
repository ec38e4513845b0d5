//! Default gate layout.

use apron_core::{GateClass, NewGate};

use crate::error::EngineResult;
use crate::persistence::Store;

/// Terminal letter, gate class and gate count per terminal.
const LAYOUT: [(char, GateClass, u32); 3] = [
    ('A', GateClass::Jumbo, 3),
    ('B', GateClass::WideBody, 4),
    ('C', GateClass::NarrowBody, 8),
];

pub fn default_gates() -> Vec<NewGate> {
    LAYOUT
        .iter()
        .flat_map(|&(terminal, class, count)| {
            (1..=count).map(move |n| {
                NewGate::new(format!("{terminal}{n}"), class)
                    .in_terminal(terminal.to_string())
                    .at_location(format!("Terminal {terminal} - Gate {n}"))
            })
        })
        .collect()
}

/// Insert the default layout into a store that has no gates yet.
pub async fn seed_default_gates(store: &dyn Store) -> EngineResult<usize> {
    if !store.list_gates().await?.is_empty() {
        return Ok(0);
    }
    let gates = default_gates();
    let count = gates.len();
    for gate in gates {
        store.insert_gate(gate).await?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_default_layout() {
        let gates = default_gates();
        assert_eq!(gates.len(), 15);
        assert_eq!(gates[0].gate_number, "A1");
        assert_eq!(gates[0].location.as_deref(), Some("Terminal A - Gate 1"));
        assert_eq!(
            gates.iter().filter(|g| g.gate_class == GateClass::NarrowBody).count(),
            8
        );
    }

    #[tokio::test]
    async fn test_seed_only_into_empty_store() {
        let store = MemoryStore::new();
        assert_eq!(seed_default_gates(&store).await.unwrap(), 15);
        assert_eq!(seed_default_gates(&store).await.unwrap(), 0);
        assert_eq!(store.list_gates().await.unwrap().len(), 15);
    }
}
