use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    CoreResult, Flight, Payment, PaymentStatus, Refund, Reservation, ReservationStatus, Schedule, Seat, User,
};

/// Repository trait for flight, schedule and seat data access
#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<Flight>>;

    /// Distinct origin and destination codes, sorted.
    async fn list_airports(&self) -> CoreResult<Vec<String>>;

    /// All flights flying `origin` -> `destination` (airport codes), any date.
    async fn list_route_flights(&self, origin: &str, destination: &str) -> CoreResult<Vec<Flight>>;

    async fn get_schedule(&self, id: Uuid) -> CoreResult<Option<Schedule>>;

    async fn find_schedule(&self, flight_id: Uuid, date: NaiveDate) -> CoreResult<Option<Schedule>>;

    /// Find the schedule for (flight, date), creating a `Scheduled` one if missing.
    async fn ensure_schedule(&self, flight_id: Uuid, date: NaiveDate) -> CoreResult<Schedule>;

    async fn get_seat(&self, id: Uuid) -> CoreResult<Option<Seat>>;

    /// Seats of a layout ordered by row, then column.
    async fn list_layout_seats(&self, layout_id: Uuid) -> CoreResult<Vec<Seat>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>>;
}

/// Everything written by a reschedule, applied as one unit.
#[derive(Debug, Clone)]
pub struct RescheduleCommit {
    /// The reservation with its new flight/schedule/date already applied.
    pub reservation: Reservation,
    /// Status the reservation had when it was read; the commit is refused otherwise.
    pub expected_status: ReservationStatus,
    /// Seat capacity of the new flight.
    pub capacity: i32,
    pub new_payment: Option<Payment>,
    pub refund: Option<Refund>,
    pub refunded_payment_ids: Vec<Uuid>,
}

/// Repository trait for reservation data access
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn get_reservation(&self, id: Uuid) -> CoreResult<Option<Reservation>>;

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<Reservation>>;

    /// Sum of passengers over non-cancelled reservations of the flight on that date.
    async fn booked_passengers(&self, flight_id: Uuid, travel_date: NaiveDate) -> CoreResult<i32>;

    /// Seats held by non-cancelled reservations on the schedule.
    async fn taken_seat_ids(&self, schedule_id: Uuid) -> CoreResult<Vec<Uuid>>;

    /// Check capacity and insert in one atomic step.
    ///
    /// Fails with `CapacityExceeded` when the flight/date cannot take the
    /// reservation's passengers, and with `ConflictError` when its seat is
    /// already held on the schedule.
    async fn insert_reservation(&self, reservation: &Reservation, capacity: i32) -> CoreResult<()>;

    /// Overwrite the reservation only while its stored status is still
    /// `expected`. A stale write fails with `ConflictError`.
    async fn update_reservation(&self, reservation: &Reservation, expected: ReservationStatus) -> CoreResult<()>;

    /// Blocked reservations whose hold ran out at or before `now`.
    async fn list_expired_holds(&self, now: DateTime<Utc>) -> CoreResult<Vec<Reservation>>;

    /// Re-check capacity on the new flight/date, then write the reservation,
    /// the balance-due payment or refund and the payment status flips together.
    /// Fails with `ConflictError` when the stored status no longer matches
    /// `expected_status` or a refunded payment is no longer Completed.
    async fn apply_reschedule(&self, commit: &RescheduleCommit) -> CoreResult<()>;
}

/// Repository trait for payment and refund data access
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn insert_payment(&self, payment: &Payment) -> CoreResult<()>;

    async fn get_payment(&self, id: Uuid) -> CoreResult<Option<Payment>>;

    /// Same guard as `update_reservation`, on the payment status.
    async fn update_payment(&self, payment: &Payment, expected: PaymentStatus) -> CoreResult<()>;

    async fn list_payments(&self, reservation_id: Uuid) -> CoreResult<Vec<Payment>>;

    async fn list_refunds(&self, reservation_id: Uuid) -> CoreResult<Vec<Refund>>;

    /// Persist a payment outcome and, when it changed, its reservation together.
    ///
    /// The payment is inserted when new; an existing one must still be
    /// Pending. The reservation carries the status it was read with and is
    /// only written while that still holds. Anything stale is a `ConflictError`
    /// and nothing is written.
    async fn settle_payment(
        &self,
        payment: &Payment,
        reservation: Option<(&Reservation, ReservationStatus)>,
    ) -> CoreResult<()>;
}
