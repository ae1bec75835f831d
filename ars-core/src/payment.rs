use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

pub const METHOD_RESCHEDULE_DUE: &str = "RESCHEDULE_DUE";
pub const METHOD_CREDIT_CARD: &str = "CREDIT_CARD";
pub const METHOD_MANUAL: &str = "MANUAL";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    /// Completed and failed payments have been through the gateway already.
    pub fn is_settled(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(PaymentStatus::Pending),
            "COMPLETED" => Ok(PaymentStatus::Completed),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            _ => Err(CoreError::InternalError(format!("Unknown payment status: {}", s))),
        }
    }
}

/// Money movement tied to one reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub amount_cents: i64,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub transaction_ref: Option<String>,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    pub fn pending(reservation_id: Uuid, amount_cents: i64, payment_method: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            reservation_id,
            amount_cents,
            payment_method: payment_method.to_string(),
            status: PaymentStatus::Pending,
            transaction_ref: None,
            paid_at: Utc::now(),
        }
    }

    pub fn complete(&mut self, transaction_ref: Option<String>) {
        self.status = PaymentStatus::Completed;
        if transaction_ref.is_some() {
            self.transaction_ref = transaction_ref;
        }
        self.paid_at = Utc::now();
    }

    pub fn fail(&mut self, transaction_ref: Option<String>) {
        self.status = PaymentStatus::Failed;
        if transaction_ref.is_some() {
            self.transaction_ref = transaction_ref;
        }
        self.paid_at = Utc::now();
    }
}

/// Money returned against a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub amount_cents: i64,
    /// Share of the amount paid, in percent with two decimals.
    pub percentage: f64,
    pub refunded_at: DateTime<Utc>,
}

impl Refund {
    pub fn new(reservation_id: Uuid, amount_cents: i64, paid_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            reservation_id,
            amount_cents,
            percentage: ars_shared::percentage(amount_cents, paid_cents),
            refunded_at: Utc::now(),
        }
    }
}

/// Sum of completed payments; pending, failed and refunded ones do not count.
pub fn total_paid(payments: &[Payment]) -> i64 {
    payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .map(|p| p.amount_cents)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_paid_counts_completed_only() {
        let reservation_id = Uuid::new_v4();
        let mut paid = Payment::pending(reservation_id, 20000, METHOD_CREDIT_CARD);
        paid.complete(Some("PG1".to_string()));
        let pending = Payment::pending(reservation_id, 5000, METHOD_CREDIT_CARD);
        let mut failed = Payment::pending(reservation_id, 7000, METHOD_CREDIT_CARD);
        failed.fail(None);

        assert_eq!(total_paid(&[paid, pending, failed]), 20000);
    }

    #[test]
    fn test_refund_percentage() {
        let refund = Refund::new(Uuid::new_v4(), 5000, 20000);
        assert_eq!(refund.percentage, 25.0);
        let refund = Refund::new(Uuid::new_v4(), 5000, 0);
        assert_eq!(refund.percentage, 0.0);
    }

    #[test]
    fn test_complete_keeps_existing_reference() {
        let mut payment = Payment::pending(Uuid::new_v4(), 100, METHOD_CREDIT_CARD);
        payment.transaction_ref = Some("EXISTING".to_string());
        payment.complete(None);
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.transaction_ref.as_deref(), Some("EXISTING"));
        assert!(payment.status.is_settled());
    }
}
