use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use ars_booking::PriceRequest;
use ars_catalog::{FareQuote, SeatMap};
use ars_core::search::{FlightOption, FlightSearchRequest};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: NaiveDate,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/airports", get(list_airports))
        .route("/v1/flights/search", get(search_flights))
        .route("/v1/flights/{flight_id}", get(flight_details))
        .route("/v1/flights/{flight_id}/price", post(price_flight))
        .route("/v1/flights/{flight_id}/seat-map", get(seat_map))
}

async fn list_airports(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.search.airports().await?))
}

async fn search_flights(
    State(state): State<AppState>,
    Query(req): Query<FlightSearchRequest>,
) -> Result<Json<Vec<FlightOption>>, AppError> {
    let options = state.search.search(&req).await?;
    Ok(Json(options))
}

async fn flight_details(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<FlightOption>, AppError> {
    Ok(Json(state.search.flight_details(flight_id, query.date).await?))
}

async fn price_flight(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
    Json(req): Json<PriceRequest>,
) -> Result<Json<FareQuote>, AppError> {
    Ok(Json(state.search.price(flight_id, &req).await?))
}

async fn seat_map(
    State(state): State<AppState>,
    Path(flight_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<SeatMap>, AppError> {
    let map = state.reservations.seat_map(flight_id, query.date).await?;
    Ok(Json(map))
}
