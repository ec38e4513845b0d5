//! REST API routes.
//!
//! Thin boundary: handlers parse the request, call the orchestrator or the
//! store and shape the response. Engine errors map to status codes through
//! `EngineError`'s `IntoResponse`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::ws;
use crate::availability;
use crate::error::{EngineError, EngineResult};
use crate::hardware::LedState;
use crate::orchestrator::{FlightOutcome, RankedGate};
use crate::state::AppState;
use apron_core::{
    validate_transition, Assignment, AutomatonInput, AutomatonState, Flight, FlightId,
    FlightStatus, Gate, GateId, GateStatus, LedColor, NewFlight, NewGate,
};
use chrono::{DateTime, Utc};

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/v1/flights", get(list_flights))
        .route("/v1/flights/waiting", get(list_waiting_flights))
        .route("/v1/flights/detect", post(detect_new_flight))
        .route("/v1/flights/:id", get(get_flight))
        .route("/v1/flights/:id/detect", post(detect_flight))
        .route("/v1/flights/:id/arrival", post(record_arrival))
        .route("/v1/flights/:id/departure", post(record_departure))
        .route("/v1/flights/:id/gate-scores", get(gate_scores))
        .route("/v1/flights/:id/gate-candidate", get(gate_candidate))
        .route("/v1/gates", get(list_gates).post(create_gate))
        .route("/v1/gates/:id/status", put(update_gate_status))
        .route("/v1/gates/:id/history", get(gate_history))
        .route("/v1/assignments", get(list_assignments).post(create_assignment))
        .route("/v1/automata/states", get(list_states))
        .route("/v1/automata/validate", post(validate))
        .route("/v1/automata/registry", get(registry_snapshot))
        .route("/v1/hardware/leds", get(list_leds))
        .route("/v1/stream", get(ws::ws_handler))
}

/// Flight with its derived status and live registry state.
#[derive(Debug, Serialize)]
pub struct FlightView {
    #[serde(flatten)]
    pub flight: Flight,
    pub status: FlightStatus,
    pub live_state: AutomatonState,
    /// Seconds since the last transition; absent once the flight departed
    pub seconds_in_state: Option<i64>,
}

impl FlightView {
    fn new(state: &AppState, flight: Flight) -> Self {
        let registry = state.registry();
        Self {
            status: flight.status(),
            live_state: registry.get(flight.id),
            seconds_in_state: registry
                .time_since_last_transition(flight.id)
                .map(|elapsed| elapsed.num_seconds()),
            flight,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GateView {
    #[serde(flatten)]
    pub gate: Gate,
    pub led_color: LedColor,
}

impl From<Gate> for GateView {
    fn from(gate: Gate) -> Self {
        Self {
            led_color: gate.status.led_color(),
            gate,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GateStatusRequest {
    pub status: GateStatus,
}

#[derive(Debug, Deserialize)]
pub struct AssignGateRequest {
    pub flight_id: FlightId,
    pub gate_id: GateId,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub from: AutomatonState,
    pub input: AutomatonInput,
    pub to: AutomatonState,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegistryView {
    pub flight_id: FlightId,
    pub state: AutomatonState,
    pub transitioned_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StateInfo {
    pub code: &'static str,
    pub description: &'static str,
    pub is_initial: bool,
    pub is_quiescent: bool,
    pub allowed_inputs: Vec<AutomatonInput>,
}

async fn list_flights(State(state): State<Arc<AppState>>) -> EngineResult<Json<Vec<FlightView>>> {
    let flights = state.store().list_flights().await?;
    Ok(Json(
        flights
            .into_iter()
            .map(|flight| FlightView::new(&state, flight))
            .collect(),
    ))
}

async fn list_waiting_flights(
    State(state): State<Arc<AppState>>,
) -> EngineResult<Json<Vec<FlightView>>> {
    let flights = state.store().find_waiting_flights().await?;
    Ok(Json(
        flights
            .into_iter()
            .map(|flight| FlightView::new(&state, flight))
            .collect(),
    ))
}

async fn get_flight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FlightId>,
) -> EngineResult<Json<FlightView>> {
    let flight = state
        .store()
        .get_flight(id)
        .await?
        .ok_or(EngineError::FlightNotFound(id))?;
    Ok(Json(FlightView::new(&state, flight)))
}

async fn detect_new_flight(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewFlight>,
) -> EngineResult<(StatusCode, Json<FlightOutcome>)> {
    let outcome = state.orchestrator().detect_flight(request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn detect_flight(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FlightId>,
) -> EngineResult<Json<FlightOutcome>> {
    Ok(Json(state.orchestrator().on_detection(id).await?))
}

async fn record_arrival(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FlightId>,
) -> EngineResult<Json<FlightOutcome>> {
    Ok(Json(state.orchestrator().on_arrival(id).await?))
}

async fn record_departure(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FlightId>,
) -> EngineResult<Json<FlightOutcome>> {
    Ok(Json(state.orchestrator().on_departure(id).await?))
}

async fn gate_scores(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FlightId>,
) -> EngineResult<Json<Vec<RankedGate>>> {
    Ok(Json(state.orchestrator().gate_scores(id).await?))
}

/// The gate the engine would pick for this flight right now.
async fn gate_candidate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<FlightId>,
) -> EngineResult<Json<GateView>> {
    let flight = state
        .store()
        .get_flight(id)
        .await?
        .ok_or(EngineError::FlightNotFound(id))?;
    let gate =
        availability::find_gate_or_err(state.store().as_ref(), flight.id, flight.aircraft_class)
            .await?;
    Ok(Json(gate.into()))
}

async fn list_gates(State(state): State<Arc<AppState>>) -> EngineResult<Json<Vec<GateView>>> {
    let gates = state.store().list_gates().await?;
    Ok(Json(gates.into_iter().map(GateView::from).collect()))
}

async fn create_gate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NewGate>,
) -> EngineResult<(StatusCode, Json<GateView>)> {
    let gate = state.store().insert_gate(request.normalized()?).await?;
    tracing::info!("Created gate {} ({})", gate.gate_number, gate.gate_class);
    Ok((StatusCode::CREATED, Json(gate.into())))
}

async fn update_gate_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GateId>,
    Json(request): Json<GateStatusRequest>,
) -> EngineResult<Json<GateView>> {
    let gate = state
        .orchestrator()
        .update_gate_status(id, request.status)
        .await?;
    Ok(Json(gate.into()))
}

async fn gate_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GateId>,
) -> EngineResult<Json<Vec<Assignment>>> {
    if state.store().get_gate(id).await?.is_none() {
        return Err(EngineError::GateNotFound(id));
    }
    Ok(Json(state.store().gate_history(id).await?))
}

async fn list_assignments(
    State(state): State<Arc<AppState>>,
) -> EngineResult<Json<Vec<Assignment>>> {
    Ok(Json(state.store().list_active_assignments().await?))
}

async fn create_assignment(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AssignGateRequest>,
) -> EngineResult<(StatusCode, Json<FlightOutcome>)> {
    let outcome = state
        .orchestrator()
        .assign_gate(request.flight_id, request.gate_id)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn list_states() -> Json<Vec<StateInfo>> {
    Json(
        AutomatonState::ALL
            .into_iter()
            .map(|s| StateInfo {
                code: s.code(),
                description: s.description(),
                is_initial: s.is_initial(),
                is_quiescent: s.is_quiescent(),
                allowed_inputs: s.allowed_inputs(),
            })
            .collect(),
    )
}

async fn validate(Json(request): Json<ValidateRequest>) -> Json<ValidateResponse> {
    match validate_transition(request.from, request.input, request.to) {
        Ok(()) => Json(ValidateResponse {
            valid: true,
            error: None,
        }),
        Err(err) => Json(ValidateResponse {
            valid: false,
            error: Some(err.to_string()),
        }),
    }
}

async fn registry_snapshot(State(state): State<Arc<AppState>>) -> Json<Vec<RegistryView>> {
    Json(
        state
            .registry()
            .snapshot()
            .into_iter()
            .map(|(flight_id, entry)| RegistryView {
                flight_id,
                state: entry.state,
                transitioned_at: entry.transitioned_at,
            })
            .collect(),
    )
}

async fn list_leds(State(state): State<Arc<AppState>>) -> Json<Vec<LedState>> {
    Json(state.hardware().leds())
}
