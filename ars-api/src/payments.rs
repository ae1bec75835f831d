use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use ars_booking::{GatewaySession, PaymentOutcome, PaymentRequest};
use ars_core::Payment;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::reservations::owned;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SettleQuery {
    pub reference: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub payment_id: Uuid,
    pub result: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/payments", post(create_payment))
        .route("/v1/payments/direct", post(pay_direct))
        .route("/v1/payments/gateway/initiate", post(initiate_gateway))
        .route("/v1/payments/gateway/callback", get(gateway_callback))
        .route("/v1/payments/{id}/succeeded", post(mark_succeeded))
        .route("/v1/payments/{id}/failed", post(mark_failed))
}

/// Payment whose reservation the caller owns.
async fn owned_payment(state: &AppState, user: CurrentUser, id: Uuid) -> Result<Payment, AppError> {
    user.require()?;
    let payment = state.payments.get_payment(id).await?;
    owned(state, user, payment.reservation_id).await?;
    Ok(payment)
}

async fn create_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), AppError> {
    owned(&state, user, req.reservation_id).await?;
    let payment = state.payments.create_payment(&req).await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn pay_direct(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentOutcome>), AppError> {
    owned(&state, user, req.reservation_id).await?;
    let outcome = state.payments.pay_direct(&req).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn initiate_gateway(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<GatewaySession>), AppError> {
    owned(&state, user, req.reservation_id).await?;
    let session = state.payments.initiate(&req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Where the gateway sends the shopper back; the payment id is the credential.
async fn gateway_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<PaymentOutcome>, AppError> {
    let outcome = state.payments.callback(query.payment_id, &query.result).await?;
    Ok(Json(outcome))
}

async fn mark_succeeded(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<SettleQuery>,
) -> Result<Json<Payment>, AppError> {
    owned_payment(&state, user, id).await?;
    Ok(Json(state.payments.mark_succeeded(id, query.reference).await?))
}

async fn mark_failed(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<SettleQuery>,
) -> Result<Json<Payment>, AppError> {
    owned_payment(&state, user, id).await?;
    Ok(Json(state.payments.mark_failed(id, query.reference).await?))
}
