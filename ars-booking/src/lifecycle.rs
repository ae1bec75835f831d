use ars_core::{CoreError, CoreResult, Reservation, ReservationStatus};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::numbers;

/// Whether a transition changed the reservation or was an idempotent repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Unchanged,
}

fn invalid(res: &Reservation, action: &str) -> CoreError {
    CoreError::InvalidStateError {
        from: res.status.as_str().to_string(),
        action: action.to_string(),
    }
}

/// Pending/Blocked → Blocked. Re-blocking keeps the number and refreshes the hold.
pub fn block(res: &mut Reservation, hold_until: DateTime<Utc>, now: DateTime<Utc>) -> CoreResult<Transition> {
    if !matches!(res.status, ReservationStatus::Pending | ReservationStatus::Blocked) {
        return Err(invalid(res, "block"));
    }

    if res.blocking_number.is_none() {
        res.blocking_number = Some(numbers::blocking_number(now));
    }
    res.status = ReservationStatus::Blocked;
    res.hold_expires_at = Some(hold_until);
    res.touch();
    Ok(Transition::Applied)
}

/// Pending/Blocked → Confirmed; confirming again is a no-op.
pub fn confirm(res: &mut Reservation, now: DateTime<Utc>) -> CoreResult<Transition> {
    match res.status {
        ReservationStatus::Confirmed => return Ok(Transition::Unchanged),
        ReservationStatus::Pending | ReservationStatus::Blocked => {}
        _ => return Err(invalid(res, "confirm")),
    }

    if res.confirmation_number.is_none() {
        res.confirmation_number = Some(numbers::confirmation_number(now));
    }
    res.status = ReservationStatus::Confirmed;
    res.blocking_number = None;
    res.hold_expires_at = None;
    res.touch();
    Ok(Transition::Applied)
}

/// Move to another flight occurrence. The seat is released and a fresh
/// confirmation number issued.
pub fn reschedule(
    res: &mut Reservation,
    flight_id: Uuid,
    schedule_id: Uuid,
    travel_date: NaiveDate,
    now: DateTime<Utc>,
) -> CoreResult<Transition> {
    if !matches!(
        res.status,
        ReservationStatus::Pending
            | ReservationStatus::Blocked
            | ReservationStatus::Confirmed
            | ReservationStatus::Rescheduled
    ) {
        return Err(invalid(res, "reschedule"));
    }

    res.flight_id = flight_id;
    res.schedule_id = schedule_id;
    res.travel_date = travel_date;
    res.seat_id = None;
    res.seat_label = None;
    res.confirmation_number = Some(numbers::confirmation_number(now));
    res.blocking_number = None;
    res.hold_expires_at = None;
    res.status = ReservationStatus::Rescheduled;
    res.touch();
    Ok(Transition::Applied)
}

/// Any live status → Cancelled; cancelling again is a no-op.
pub fn cancel(res: &mut Reservation) -> CoreResult<Transition> {
    match res.status {
        ReservationStatus::Cancelled => return Ok(Transition::Unchanged),
        ReservationStatus::Completed => return Err(invalid(res, "cancel")),
        _ => {}
    }

    res.status = ReservationStatus::Cancelled;
    res.blocking_number = None;
    res.hold_expires_at = None;
    res.touch();
    Ok(Transition::Applied)
}

/// Confirmed/Rescheduled → Completed (flown).
pub fn complete(res: &mut Reservation) -> CoreResult<Transition> {
    if !matches!(res.status, ReservationStatus::Confirmed | ReservationStatus::Rescheduled) {
        return Err(invalid(res, "complete"));
    }
    res.status = ReservationStatus::Completed;
    res.touch();
    Ok(Transition::Applied)
}

/// Blocked past its hold → Cancelled.
pub fn expire_hold(res: &mut Reservation, now: DateTime<Utc>) -> CoreResult<Transition> {
    let expired = res.status == ReservationStatus::Blocked
        && res.hold_expires_at.map(|at| at <= now).unwrap_or(false);
    if !expired {
        return Err(invalid(res, "expire"));
    }
    cancel(res)
}
