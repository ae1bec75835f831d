use std::str::FromStr;
use std::sync::Arc;

use ars_core::payment::{METHOD_CREDIT_CARD, METHOD_MANUAL};
use ars_core::{CoreError, CoreResult, Payment, PaymentStatus, Refund, Reservation, ReservationStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::{self, Transition};
use crate::numbers;
use crate::service::ReservationService;
use crate::Stores;

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRequest {
    pub reservation_id: Uuid,
    pub amount_cents: i64,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl PaymentRequest {
    fn method(&self, fallback: &str) -> String {
        match self.payment_method.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_ascii_uppercase(),
            _ => fallback.to_string(),
        }
    }
}

/// Outcome reported by the mock gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayResult {
    Success,
    Fail,
}

impl FromStr for GatewayResult {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(GatewayResult::Success),
            "fail" => Ok(GatewayResult::Fail),
            _ => Err(CoreError::ValidationError(
                "result must be 'success' or 'fail'".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewaySession {
    pub payment: Payment,
    pub success_url: String,
    pub fail_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub payment: Payment,
    pub reservation: Reservation,
}

/// Payment bookkeeping plus the mock gateway flow.
pub struct PaymentService {
    stores: Stores,
    reservations: Arc<ReservationService>,
    callback_url: String,
}

impl PaymentService {
    /// `callback_url` is where the gateway sends the shopper back, e.g.
    /// `http://localhost:3000/v1/payments/gateway/callback`.
    pub fn new(stores: Stores, reservations: Arc<ReservationService>, callback_url: impl Into<String>) -> Self {
        Self {
            stores,
            reservations,
            callback_url: callback_url.into(),
        }
    }

    /// Record a pending payment; nothing else changes until it settles.
    pub async fn create_payment(&self, req: &PaymentRequest) -> CoreResult<Payment> {
        self.validate(req).await?;
        let payment = Payment::pending(req.reservation_id, req.amount_cents, &req.method(METHOD_CREDIT_CARD));
        self.stores.payments.insert_payment(&payment).await?;
        tracing::info!(payment_id = %payment.id, reservation_id = %req.reservation_id, amount_cents = req.amount_cents, "Payment created");
        Ok(payment)
    }

    pub async fn get_payment(&self, id: Uuid) -> CoreResult<Payment> {
        self.stores
            .payments
            .get_payment(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Payment", id))
    }

    /// Only a pending payment can be marked; a settled one is a conflict.
    pub async fn mark_succeeded(&self, id: Uuid, reference: Option<String>) -> CoreResult<Payment> {
        let mut payment = self.get_payment(id).await?;
        payment.complete(non_blank(reference));
        self.stores.payments.update_payment(&payment, PaymentStatus::Pending).await?;
        tracing::info!(payment_id = %id, "Payment marked succeeded");
        Ok(payment)
    }

    pub async fn mark_failed(&self, id: Uuid, reference: Option<String>) -> CoreResult<Payment> {
        let mut payment = self.get_payment(id).await?;
        payment.fail(non_blank(reference));
        self.stores.payments.update_payment(&payment, PaymentStatus::Pending).await?;
        tracing::info!(payment_id = %id, "Payment marked failed");
        Ok(payment)
    }

    /// Start a mock gateway checkout: a pending payment plus the two callback links.
    pub async fn initiate(&self, req: &PaymentRequest) -> CoreResult<GatewaySession> {
        let payment = self.create_payment(req).await?;
        let base = self.callback_url.trim_end_matches('/');
        Ok(GatewaySession {
            success_url: format!("{}?payment_id={}&result=success", base, payment.id),
            fail_url: format!("{}?payment_id={}&result=fail", base, payment.id),
            payment,
        })
    }

    /// Gateway return. A payment can only be settled once, and never in
    /// favour of a reservation that was cancelled while the shopper was away.
    pub async fn callback(&self, payment_id: Uuid, result: &str) -> CoreResult<PaymentOutcome> {
        let mut payment = self.get_payment(payment_id).await?;
        let mut reservation = self.reservations.get(payment.reservation_id).await?;

        if payment.status.is_settled() {
            return Err(CoreError::ValidationError(format!(
                "Payment {} was already processed",
                payment_id
            )));
        }
        let result: GatewayResult = result.parse()?;
        let now = Utc::now();

        match result {
            GatewayResult::Success if reservation.status == ReservationStatus::Cancelled => {
                payment.fail(Some(numbers::gateway_reference(now)));
                self.stores.payments.settle_payment(&payment, None).await?;
                tracing::warn!(%payment_id, reservation_id = %reservation.id, "Gateway payment for a cancelled reservation refused");
                return Err(CoreError::InvalidStateError {
                    from: reservation.status.as_str().to_string(),
                    action: "pay for".to_string(),
                });
            }
            GatewayResult::Success => {
                payment.complete(Some(numbers::gateway_reference(now)));
                let expected = reservation.status;
                let confirmed = self.confirm_if_open(&mut reservation)?;
                self.stores
                    .payments
                    .settle_payment(&payment, confirmed.then_some((&reservation, expected)))
                    .await?;
                tracing::info!(%payment_id, reservation_id = %reservation.id, status = %reservation.status, "Gateway payment succeeded");
                if matches!(reservation.status, ReservationStatus::Confirmed | ReservationStatus::Rescheduled) {
                    self.reservations.notify_confirmed(&reservation).await;
                }
            }
            GatewayResult::Fail => {
                payment.fail(Some(numbers::gateway_reference(now)));
                self.stores.payments.settle_payment(&payment, None).await?;
                tracing::warn!(%payment_id, reservation_id = %reservation.id, "Gateway payment failed");
                let body = format!(
                    "Payment for reservation {} failed. Please try again or use another payment method.",
                    reservation.id
                );
                self.reservations
                    .notify_owner(reservation.user_id, "Payment failed", &body)
                    .await;
            }
        }

        Ok(PaymentOutcome { payment, reservation })
    }

    /// Manual payment taken outside the gateway; the payment and the
    /// confirmation it triggers are written in one step.
    pub async fn pay_direct(&self, req: &PaymentRequest) -> CoreResult<PaymentOutcome> {
        let mut reservation = self.validate(req).await?;

        let mut payment = Payment::pending(req.reservation_id, req.amount_cents, &req.method(METHOD_MANUAL));
        payment.complete(Some(numbers::manual_reference(Utc::now())));

        let expected = reservation.status;
        let confirmed = self.confirm_if_open(&mut reservation)?;
        self.stores
            .payments
            .settle_payment(&payment, confirmed.then_some((&reservation, expected)))
            .await?;
        if confirmed {
            self.reservations.notify_confirmed(&reservation).await;
        }
        tracing::info!(payment_id = %payment.id, reservation_id = %reservation.id, "Direct payment recorded");
        Ok(PaymentOutcome { payment, reservation })
    }

    pub async fn list_payments(&self, reservation_id: Uuid) -> CoreResult<Vec<Payment>> {
        self.stores.payments.list_payments(reservation_id).await
    }

    pub async fn list_refunds(&self, reservation_id: Uuid) -> CoreResult<Vec<Refund>> {
        self.stores.payments.list_refunds(reservation_id).await
    }

    /// Returns the reservation being paid for.
    async fn validate(&self, req: &PaymentRequest) -> CoreResult<Reservation> {
        if req.amount_cents <= 0 {
            return Err(CoreError::ValidationError(
                "Amount must be greater than zero".to_string(),
            ));
        }
        let reservation = self.reservations.get(req.reservation_id).await?;
        if reservation.status == ReservationStatus::Cancelled {
            return Err(CoreError::InvalidStateError {
                from: reservation.status.as_str().to_string(),
                action: "pay for".to_string(),
            });
        }
        Ok(reservation)
    }

    /// Confirm when still Pending/Blocked. Other states keep their status.
    fn confirm_if_open(&self, reservation: &mut Reservation) -> CoreResult<bool> {
        if !matches!(reservation.status, ReservationStatus::Pending | ReservationStatus::Blocked) {
            return Ok(false);
        }
        Ok(lifecycle::confirm(reservation, Utc::now())? == Transition::Applied)
    }
}

fn non_blank(reference: Option<String>) -> Option<String> {
    reference.filter(|r| !r.trim().is_empty())
}
