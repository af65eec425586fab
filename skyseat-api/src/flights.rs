use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use skyseat_core::{CoreResult, FlightService, GateStats, SeatMapSnapshot};
use tracing::info;

use crate::error::AppError;
use crate::payload::{required, Submitted};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Field names are the ones the web frontend already sends.
#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    #[serde(rename = "vuelo")]
    pub flight_id: Option<String>,
    #[serde(rename = "asiento")]
    pub seat_id: Option<String>,
    #[serde(rename = "nombre")]
    pub passenger: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(rename = "vuelo")]
    pub flight_id: Option<String>,
    #[serde(rename = "asiento")]
    pub seat_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FlightView {
    #[serde(rename = "asientos")]
    pub seats: BTreeMap<String, Option<String>>,
}

pub type FlightsResponse = BTreeMap<String, FlightView>;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub mensaje: String,
}

impl StatusResponse {
    fn ok(message: String) -> Json<Self> {
        Json(Self {
            status: "ok".into(),
            mensaje: message,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub gate: GateStats,
}

fn flights_response(snapshot: &SeatMapSnapshot) -> FlightsResponse {
    snapshot
        .iter()
        .map(|(flight_id, flight)| {
            let seats = flight
                .seats()
                .map(|(seat_id, occupant)| (seat_id.to_string(), occupant.map(String::from)))
                .collect();
            (flight_id.to_string(), FlightView { seats })
        })
        .collect()
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/vuelos", get(list_flights))
        .route("/api/consultar", get(list_flights))
        .route("/api/reservar", post(reserve_seat))
        .route("/api/eliminar", post(cancel_reservation))
        .route("/api/reiniciar", post(reset_seats))
        .route("/api/health", get(health))
}

/// Runs a seat map operation off the async workers: gate entry may block.
async fn with_service<T, F>(state: &AppState, op: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&FlightService) -> CoreResult<T> + Send + 'static,
{
    let service = Arc::clone(&state.flights);
    let result = tokio::task::spawn_blocking(move || op(&service)).await?;
    Ok(result?)
}

/// GET /api/vuelos
/// Current occupancy of every flight
async fn list_flights(State(state): State<AppState>) -> Result<Json<FlightsResponse>, AppError> {
    let snapshot = with_service(&state, FlightService::query_all).await?;
    Ok(Json(flights_response(&snapshot)))
}

/// POST /api/reservar
async fn reserve_seat(
    State(state): State<AppState>,
    Submitted(req): Submitted<ReserveRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let (Some(flight_id), Some(seat_id), Some(passenger)) = (
        required(&req.flight_id),
        required(&req.seat_id),
        required(&req.passenger),
    ) else {
        return Err(AppError::ValidationError(
            "Missing data (vuelo, asiento, nombre)".into(),
        ));
    };

    let reserved = {
        let (flight_id, seat_id, passenger) =
            (flight_id.to_owned(), seat_id.to_owned(), passenger.to_owned());
        with_service(&state, move |service| service.reserve(&flight_id, &seat_id, &passenger)).await?
    };

    if !reserved {
        return Err(AppError::ConflictError(format!(
            "Seat {seat_id} on flight {flight_id} is already reserved"
        )));
    }

    info!(flight_id, seat_id, "reservation accepted");
    Ok(StatusResponse::ok(format!(
        "Seat {seat_id} on flight {flight_id} reserved for {passenger}"
    )))
}

/// POST /api/eliminar
async fn cancel_reservation(
    State(state): State<AppState>,
    Submitted(req): Submitted<CancelRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let (Some(flight_id), Some(seat_id)) = (required(&req.flight_id), required(&req.seat_id)) else {
        return Err(AppError::ValidationError("Missing data (vuelo, asiento)".into()));
    };

    let cancelled = {
        let (flight_id, seat_id) = (flight_id.to_owned(), seat_id.to_owned());
        with_service(&state, move |service| service.cancel(&flight_id, &seat_id)).await?
    };

    if !cancelled {
        return Err(AppError::ConflictError(format!(
            "No reservation found for seat {seat_id} on flight {flight_id}"
        )));
    }

    Ok(StatusResponse::ok(format!(
        "Reservation for seat {seat_id} on flight {flight_id} removed"
    )))
}

/// POST /api/reiniciar
/// Admin reset: every seat back to available
async fn reset_seats(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    with_service(&state, FlightService::reset_all).await?;
    Ok(StatusResponse::ok("All seats have been reset".into()))
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        gate: state.flights.gate_stats(),
    })
}
