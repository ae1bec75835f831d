use ars_core::payment::{total_paid, METHOD_RESCHEDULE_DUE};
use ars_core::search::RescheduleQuote;
use ars_core::{Payment, PaymentStatus, Refund};
use uuid::Uuid;

/// Money movement produced by moving a reservation to a new fare.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub quote: RescheduleQuote,
    pub new_payment: Option<Payment>,
    pub refund: Option<Refund>,
    pub refunded_payment_ids: Vec<Uuid>,
}

/// Settle the gap between the new fare and what has been paid so far.
///
/// Only completed payments count as paid. A shortfall becomes a pending
/// balance-due payment; an overpayment becomes one refund and every
/// completed payment is flipped to refunded.
pub fn reconcile(reservation_id: Uuid, new_total_cents: i64, payments: &[Payment]) -> Reconciliation {
    let paid = total_paid(payments);
    let quote = RescheduleQuote::new(new_total_cents, paid);
    let difference = quote.difference_cents;

    if difference > 0 {
        Reconciliation {
            quote,
            new_payment: Some(Payment::pending(reservation_id, difference, METHOD_RESCHEDULE_DUE)),
            refund: None,
            refunded_payment_ids: Vec::new(),
        }
    } else if difference < 0 {
        let refunded_payment_ids = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Completed)
            .map(|p| p.id)
            .collect();
        Reconciliation {
            quote,
            new_payment: None,
            refund: Some(Refund::new(reservation_id, -difference, paid)),
            refunded_payment_ids,
        }
    } else {
        Reconciliation {
            quote,
            new_payment: None,
            refund: None,
            refunded_payment_ids: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ars_core::payment::METHOD_CREDIT_CARD;

    fn completed(reservation_id: Uuid, amount: i64) -> Payment {
        let mut p = Payment::pending(reservation_id, amount, METHOD_CREDIT_CARD);
        p.complete(Some("PG1".to_string()));
        p
    }

    #[test]
    fn test_cheaper_fare_refunds_difference() {
        let res_id = Uuid::new_v4();
        let payments = vec![
            completed(res_id, 12000),
            completed(res_id, 8000),
            Payment::pending(res_id, 3000, METHOD_CREDIT_CARD),
        ];

        let rec = reconcile(res_id, 15000, &payments);
        assert_eq!(rec.quote.difference_cents, -5000);
        assert!(rec.new_payment.is_none());

        let refund = rec.refund.unwrap();
        assert_eq!(refund.amount_cents, 5000);
        assert_eq!(refund.percentage, 25.0);
        assert_eq!(rec.refunded_payment_ids, vec![payments[0].id, payments[1].id]);
    }

    #[test]
    fn test_dearer_fare_creates_balance_due() {
        let res_id = Uuid::new_v4();
        let rec = reconcile(res_id, 26000, &[completed(res_id, 20000)]);

        let due = rec.new_payment.unwrap();
        assert_eq!(due.amount_cents, 6000);
        assert_eq!(due.status, PaymentStatus::Pending);
        assert_eq!(due.payment_method, METHOD_RESCHEDULE_DUE);
        assert!(rec.refund.is_none());
        assert!(rec.refunded_payment_ids.is_empty());
    }

    #[test]
    fn test_same_fare_moves_no_money() {
        let res_id = Uuid::new_v4();
        let rec = reconcile(res_id, 20000, &[completed(res_id, 20000)]);
        assert_eq!(rec.quote.difference_cents, 0);
        assert!(rec.new_payment.is_none());
        assert!(rec.refund.is_none());
    }

    #[test]
    fn test_unpaid_reservation_owes_full_fare() {
        let res_id = Uuid::new_v4();
        let rec = reconcile(res_id, 24000, &[]);
        assert_eq!(rec.quote.total_paid_cents, 0);
        assert_eq!(rec.new_payment.unwrap().amount_cents, 24000);
    }
}
