//! CLI tool that drives the gate assignment engine with generated traffic.
//!
//! Runs the orchestrator and the waiting-flight reactor in-process over an
//! in-memory store, prints every automaton transition as it happens and a
//! summary at the end.

use apron_cli::sim::{gate_layout, run_simulation, SimulationConfig, TrafficGenerator};
use apron_server::events::EventBus;
use apron_server::hardware::SimulatedHardware;
use apron_server::loops::waiting_flight_loop::run_waiting_flight_loop;
use apron_server::persistence::{MemoryStore, Store};
use apron_server::state::StateRegistry;
use apron_server::Orchestrator;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Gate assignment traffic simulator
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of flights to detect
    #[arg(long, default_value_t = 20)]
    flights: usize,

    /// Narrow-body gates (terminal C)
    #[arg(long, default_value_t = 4)]
    narrow_gates: u32,

    /// Wide-body gates (terminal B)
    #[arg(long, default_value_t = 2)]
    wide_gates: u32,

    /// Jumbo gates (terminal A)
    #[arg(long, default_value_t = 1)]
    jumbo_gates: u32,

    /// RNG seed; the same seed replays the same traffic
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Milliseconds an aircraft spends parked before departing
    #[arg(long, default_value_t = 50)]
    turnaround_ms: u64,

    /// Share of parked aircraft that depart each round (0.0 - 1.0)
    #[arg(long, default_value_t = 0.8)]
    departure_share: f64,

    /// Upper bound on turnaround rounds
    #[arg(long, default_value_t = 10)]
    max_rounds: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("apron_server=warn".parse()?))
        .init();

    let args = Args::parse();

    let store = Arc::new(MemoryStore::new());
    let layout = gate_layout(args.narrow_gates, args.wide_gates, args.jumbo_gates);
    let gate_count = layout.len();
    for gate in layout {
        store.insert_gate(gate).await?;
    }

    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        Arc::new(StateRegistry::new()),
        Arc::new(SimulatedHardware::new()),
        EventBus::new(1024),
    ));

    println!("\nApron traffic simulation");
    println!(
        "  Gates: {} ({} narrow, {} wide, {} jumbo)",
        gate_count, args.narrow_gates, args.wide_gates, args.jumbo_gates
    );
    println!("  Flights: {}, seed: {}\n", args.flights, args.seed);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let reactor = tokio::spawn(run_waiting_flight_loop(
        orchestrator.clone(),
        orchestrator.events().subscribe_gate_freed(),
        shutdown_tx.subscribe(),
    ));

    let mut transitions = orchestrator.events().subscribe_transitions();
    let mut printer_shutdown = shutdown_tx.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = printer_shutdown.recv() => break,
                event = transitions.recv() => match event {
                    Ok(event) => println!(
                        "  {} {:<6} {} --{}--> {}  {:?}",
                        event.timestamp.format("%H:%M:%S%.3f"),
                        event.flight_number,
                        event.previous_state,
                        event.input,
                        event.new_state,
                        event.event
                    ),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        println!("  ... {} transitions not shown", missed);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    let config = SimulationConfig {
        flights: args.flights,
        turnaround: Duration::from_millis(args.turnaround_ms),
        departure_share: args.departure_share,
        max_rounds: args.max_rounds,
    };
    let mut generator = TrafficGenerator::new(args.seed);
    let result = run_simulation(&orchestrator, &mut generator, &config).await;

    let _ = shutdown_tx.send(());
    let _ = reactor.await;
    let _ = printer.await;

    let summary = result?;
    let active = store.list_active_assignments().await?.len();

    println!("\nSimulation complete");
    println!("  Detected:              {}", summary.detected);
    println!("  Assigned on detection: {}", summary.assigned_on_detection);
    println!("  Waited for a gate:     {}", summary.waited);
    println!("  Reassigned later:      {}", summary.reassigned);
    println!("  Arrived:               {}", summary.arrived);
    println!("  Departed:              {}", summary.departed);
    println!("  Still waiting:         {}", summary.still_waiting);
    println!("  Gates still occupied:  {}", active);

    Ok(())
}
