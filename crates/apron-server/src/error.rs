//! Engine error taxonomy.

use apron_core::{AssignmentId, FlightId, GateId, GateStatus, TransitionError, ValidationError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("flight {0} not found")]
    FlightNotFound(FlightId),

    #[error("gate {0} not found")]
    GateNotFound(GateId),

    #[error("assignment {0} not found")]
    AssignmentNotFound(AssignmentId),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Lost the race for a gate, or the gate stopped being free after it was found.
    #[error("gate {0} is already occupied")]
    GateAlreadyOccupied(GateId),

    #[error("flight {0} already has an active assignment")]
    FlightAlreadyAssigned(FlightId),

    #[error("gate {gate_id} cannot take flight {flight_id}: class mismatch")]
    IncompatibleGate { flight_id: FlightId, gate_id: GateId },

    #[error("no available gate for flight {0}")]
    NoAvailableGate(FlightId),

    #[error("flight {0} has no active assignment")]
    NoActiveAssignment(FlightId),

    /// Operator tried to change a gate that is bound to a flight.
    #[error("gate {0} has an active assignment")]
    GateInUse(GateId),

    #[error("gate status {0} cannot be set by an operator")]
    UnsupportedGateStatus(GateStatus),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl EngineError {
    /// Whether the caller may succeed by searching again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::GateAlreadyOccupied(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::FlightNotFound(_) | Self::GateNotFound(_) | Self::AssignmentNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Validation(_) | Self::UnsupportedGateStatus(_) => StatusCode::BAD_REQUEST,
            Self::Transition(_)
            | Self::GateAlreadyOccupied(_)
            | Self::FlightAlreadyAssigned(_)
            | Self::IncompatibleGate { .. }
            | Self::NoAvailableGate(_)
            | Self::NoActiveAssignment(_)
            | Self::GateInUse(_)
            | Self::Duplicate(_) => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Storage(err) => {
                tracing::error!("Storage failure: {}", err);
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
