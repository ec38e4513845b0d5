//! Gate hardware: guidance LEDs and the arrivals display.
//!
//! Calls are fire-and-forget from the orchestrator's point of view. A failing
//! sink is logged and never undoes a transition.

use anyhow::Result;
use apron_core::{Flight, FlightId, Gate, GateId, LedColor};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;

#[async_trait]
pub trait HardwareSink: Send + Sync {
    async fn activate_led(&self, gate: &Gate, color: LedColor) -> Result<()>;

    async fn deactivate_led(&self, gate: &Gate) -> Result<()>;

    async fn notify_gate_assigned(&self, gate: &Gate, flight: &Flight) -> Result<()>;

    async fn update_display(&self, status: &str, flight: &Flight) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedState {
    pub gate_id: GateId,
    pub gate_number: String,
    /// `None` when the gate's lights are off
    pub color: Option<LedColor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayMessage {
    pub flight_number: String,
    pub status: String,
}

/// Stand-in for the MQTT-driven gate hardware. Remembers the last state it
/// was asked to show.
#[derive(Debug, Default)]
pub struct SimulatedHardware {
    leds: DashMap<GateId, LedState>,
    displays: DashMap<FlightId, DisplayMessage>,
    notifications: DashMap<GateId, FlightId>,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn led(&self, gate_id: GateId) -> Option<LedColor> {
        self.leds.get(&gate_id).and_then(|state| state.color)
    }

    pub fn leds(&self) -> Vec<LedState> {
        let mut leds: Vec<LedState> = self.leds.iter().map(|e| e.value().clone()).collect();
        leds.sort_by_key(|led| led.gate_id);
        leds
    }

    pub fn display(&self, flight_id: FlightId) -> Option<DisplayMessage> {
        self.displays.get(&flight_id).map(|msg| msg.clone())
    }

    /// Flight last announced at a gate.
    pub fn last_notified(&self, gate_id: GateId) -> Option<FlightId> {
        self.notifications.get(&gate_id).map(|id| *id)
    }
}

#[async_trait]
impl HardwareSink for SimulatedHardware {
    async fn activate_led(&self, gate: &Gate, color: LedColor) -> Result<()> {
        tracing::info!("LED {} on at gate {}", color, gate.gate_number);
        self.leds.insert(
            gate.id,
            LedState {
                gate_id: gate.id,
                gate_number: gate.gate_number.clone(),
                color: Some(color),
            },
        );
        Ok(())
    }

    async fn deactivate_led(&self, gate: &Gate) -> Result<()> {
        tracing::info!("LEDs off at gate {}", gate.gate_number);
        self.leds.insert(
            gate.id,
            LedState {
                gate_id: gate.id,
                gate_number: gate.gate_number.clone(),
                color: None,
            },
        );
        Ok(())
    }

    async fn notify_gate_assigned(&self, gate: &Gate, flight: &Flight) -> Result<()> {
        tracing::info!(
            "Gate assignment notice: {} -> gate {}",
            flight.flight_number,
            gate.gate_number
        );
        self.notifications.insert(gate.id, flight.id);
        Ok(())
    }

    async fn update_display(&self, status: &str, flight: &Flight) -> Result<()> {
        tracing::info!("Display: {} {}", flight.flight_number, status);
        self.displays.insert(
            flight.id,
            DisplayMessage {
                flight_number: flight.flight_number.clone(),
                status: status.to_string(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apron_core::{AircraftClass, GateClass, NewFlight, NewGate};
    use chrono::Utc;

    #[tokio::test]
    async fn test_simulated_hardware_tracks_last_state() {
        let hw = SimulatedHardware::new();
        let gate = Gate::from_request(4, NewGate::new("B4", GateClass::WideBody), Utc::now());
        let flight = Flight::from_request(9, NewFlight::new("LA900", AircraftClass::WideBody), Utc::now());

        hw.activate_led(&gate, LedColor::Green).await.unwrap();
        hw.notify_gate_assigned(&gate, &flight).await.unwrap();
        assert_eq!(hw.led(4), Some(LedColor::Green));
        assert_eq!(hw.last_notified(4), Some(9));

        hw.activate_led(&gate, LedColor::Red).await.unwrap();
        assert_eq!(hw.led(4), Some(LedColor::Red));

        hw.deactivate_led(&gate).await.unwrap();
        assert_eq!(hw.led(4), None);
        assert_eq!(hw.leds().len(), 1);

        hw.update_display("WAITING_FOR_GATE", &flight).await.unwrap();
        assert_eq!(hw.display(9).unwrap().status, "WAITING_FOR_GATE");
    }
}
