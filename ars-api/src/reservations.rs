use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ars_booking::{BookingReceipt, CreateReservationRequest, RescheduleOutcome, RescheduleRequest};
use ars_core::search::{FlightOption, RescheduleQuote};
use ars_core::{Payment, Refund, Reservation};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BlockQuery {
    pub hold_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct OptionsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub flight_id: Uuid,
    pub schedule_id: Option<Uuid>,
    pub date: NaiveDate,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", get(list_reservations).post(create_reservation))
        .route("/v1/reservations/hold", post(hold_reservation))
        .route("/v1/reservations/{id}", get(get_reservation))
        .route("/v1/reservations/{id}/block", post(block_reservation))
        .route("/v1/reservations/{id}/confirm", post(confirm_reservation))
        .route("/v1/reservations/{id}/cancel", post(cancel_reservation))
        .route("/v1/reservations/{id}/complete", post(complete_reservation))
        .route("/v1/reservations/{id}/status", post(update_status))
        .route("/v1/reservations/{id}/reschedule/options", get(reschedule_options))
        .route("/v1/reservations/{id}/reschedule/quote", get(reschedule_quote))
        .route("/v1/reservations/{id}/reschedule", post(reschedule_reservation))
        .route("/v1/reservations/{id}/payments", get(list_payments))
        .route("/v1/reservations/{id}/refunds", get(list_refunds))
}

/// Load a reservation the caller owns.
pub(crate) async fn owned(state: &AppState, user: CurrentUser, id: Uuid) -> Result<Reservation, AppError> {
    user.require()?;
    let reservation = state.reservations.get(id).await?;
    user.require_owner(reservation.user_id)?;
    Ok(reservation)
}

async fn list_reservations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Reservation>>, AppError> {
    let user_id = user.require()?;
    Ok(Json(state.reservations.list_for_user(user_id).await?))
}

async fn create_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<BookingReceipt>), AppError> {
    let user_id = user.require()?;
    let receipt = state.reservations.create(user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn hold_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<BookingReceipt>), AppError> {
    let user_id = user.require()?;
    let receipt = state.reservations.hold(user_id, &req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    Ok(Json(owned(&state, user, id).await?))
}

async fn block_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<BlockQuery>,
) -> Result<Json<Reservation>, AppError> {
    owned(&state, user, id).await?;
    Ok(Json(state.reservations.block(id, query.hold_minutes).await?))
}

async fn confirm_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    owned(&state, user, id).await?;
    Ok(Json(state.reservations.confirm(id).await?))
}

async fn cancel_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    owned(&state, user, id).await?;
    Ok(Json(state.reservations.cancel(id).await?))
}

async fn complete_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    owned(&state, user, id).await?;
    Ok(Json(state.reservations.complete(id).await?))
}

async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Reservation>, AppError> {
    owned(&state, user, id).await?;
    Ok(Json(state.reservations.update_status(id, &query.status).await?))
}

async fn reschedule_options(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<OptionsQuery>,
) -> Result<Json<Vec<FlightOption>>, AppError> {
    owned(&state, user, id).await?;
    Ok(Json(state.reservations.reschedule_options(id, query.date).await?))
}

async fn reschedule_quote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<RescheduleQuote>, AppError> {
    owned(&state, user, id).await?;
    let req = RescheduleRequest {
        flight_id: query.flight_id,
        schedule_id: query.schedule_id,
        travel_date: query.date,
    };
    Ok(Json(state.reservations.quote_reschedule(id, &req).await?))
}

async fn reschedule_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RescheduleRequest>,
) -> Result<Json<RescheduleOutcome>, AppError> {
    owned(&state, user, id).await?;
    Ok(Json(state.reservations.reschedule(id, &req).await?))
}

async fn list_payments(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    owned(&state, user, id).await?;
    Ok(Json(state.payments.list_payments(id).await?))
}

async fn list_refunds(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Refund>>, AppError> {
    owned(&state, user, id).await?;
    Ok(Json(state.payments.list_refunds(id).await?))
}
