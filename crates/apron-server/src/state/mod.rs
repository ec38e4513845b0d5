//! Shared application state.

pub mod registry;

pub use registry::{RegistryEntry, StateRegistry};

use std::sync::Arc;

use crate::config::Config;
use crate::error::EngineResult;
use crate::events::EventBus;
use crate::hardware::SimulatedHardware;
use crate::orchestrator::Orchestrator;
use crate::persistence::{Database, MemoryStore, SqliteStore, Store};
use crate::seed;

/// Everything the HTTP layer and the background loops share.
pub struct AppState {
    config: Config,
    orchestrator: Arc<Orchestrator>,
    hardware: Arc<SimulatedHardware>,
}

impl AppState {
    /// State over an in-memory store.
    pub fn new(config: Config) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    /// State over a SQLite database.
    pub fn with_database(db: Database, config: Config) -> Self {
        Self::with_store(Arc::new(SqliteStore::new(db)), config)
    }

    pub fn with_store(store: Arc<dyn Store>, config: Config) -> Self {
        let hardware = Arc::new(SimulatedHardware::new());
        let orchestrator = Orchestrator::new(
            store,
            Arc::new(StateRegistry::new()),
            hardware.clone(),
            EventBus::new(config.event_capacity),
        )
        .with_claim_attempts(config.claim_attempts);

        Self {
            config,
            orchestrator: Arc::new(orchestrator),
            hardware,
        }
    }

    /// Seed the default gates if configured, then load live flight states.
    pub async fn load_from_store(&self) -> EngineResult<()> {
        if self.config.seed_gates {
            let seeded = seed::seed_default_gates(self.store().as_ref()).await?;
            if seeded > 0 {
                tracing::info!("Seeded {} default gates", seeded);
            }
        }
        let primed = self.orchestrator.prime_registry().await?;
        tracing::info!("Loaded {} in-progress flights", primed);
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        self.orchestrator.store()
    }

    pub fn registry(&self) -> &Arc<StateRegistry> {
        self.orchestrator.registry()
    }

    pub fn events(&self) -> &EventBus {
        self.orchestrator.events()
    }

    pub fn hardware(&self) -> &Arc<SimulatedHardware> {
        &self.hardware
    }
}
