use std::collections::{BTreeSet, HashMap};

use ars_core::repository::{
    FlightRepository, PaymentRepository, RescheduleCommit, ReservationRepository, UserRepository,
};
use ars_core::{
    CoreError, CoreResult, Flight, Payment, PaymentStatus, Refund, Reservation, ReservationStatus,
    Schedule, Seat, SeatLayout, User,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    flights: HashMap<Uuid, Flight>,
    schedules: HashMap<Uuid, Schedule>,
    layouts: HashMap<Uuid, SeatLayout>,
    seats: HashMap<Uuid, Seat>,
    users: HashMap<Uuid, User>,
    reservations: HashMap<Uuid, Reservation>,
    payments: HashMap<Uuid, Payment>,
    refunds: Vec<Refund>,
}

impl State {
    fn booked(&self, flight_id: Uuid, date: NaiveDate, exclude: Option<Uuid>) -> i32 {
        self.reservations
            .values()
            .filter(|r| r.is_active() && r.flight_id == flight_id && r.travel_date == date)
            .filter(|r| Some(r.id) != exclude)
            .map(|r| r.passenger_total())
            .sum()
    }

    fn seat_holder(&self, schedule_id: Uuid, seat_id: Uuid, exclude: Uuid) -> Option<&Reservation> {
        self.reservations.values().find(|r| {
            r.id != exclude && r.is_active() && r.schedule_id == schedule_id && r.seat_id == Some(seat_id)
        })
    }

    fn confirmation_in_use(&self, res: &Reservation) -> bool {
        match &res.confirmation_number {
            Some(number) => self
                .reservations
                .values()
                .any(|r| r.id != res.id && r.confirmation_number.as_ref() == Some(number)),
            None => false,
        }
    }

    /// The stored reservation must still be in the status the caller read.
    fn check_reservation_status(&self, id: Uuid, expected: ReservationStatus) -> CoreResult<()> {
        let stored = self
            .reservations
            .get(&id)
            .ok_or_else(|| CoreError::not_found("Reservation", id))?;
        if stored.status != expected {
            return Err(CoreError::ConflictError(format!(
                "reservation {} is {}, expected {}",
                id,
                stored.status.as_str(),
                expected.as_str()
            )));
        }
        Ok(())
    }

    fn check_payment_status(&self, id: Uuid, expected: PaymentStatus) -> CoreResult<()> {
        let stored = self
            .payments
            .get(&id)
            .ok_or_else(|| CoreError::not_found("Payment", id))?;
        if stored.status != expected {
            return Err(CoreError::ConflictError(format!(
                "payment {} is {}, expected {}",
                id,
                stored.status.as_str(),
                expected.as_str()
            )));
        }
        Ok(())
    }

    /// Capacity and uniqueness checks shared by insert and reschedule.
    fn check_placement(&self, res: &Reservation, capacity: i32) -> CoreResult<()> {
        let taken = self.booked(res.flight_id, res.travel_date, Some(res.id));
        let requested = res.passenger_total();
        if taken + requested > capacity {
            return Err(CoreError::CapacityExceeded {
                capacity,
                taken,
                requested,
            });
        }
        if let Some(seat_id) = res.seat_id {
            if self.seat_holder(res.schedule_id, seat_id, res.id).is_some() {
                return Err(CoreError::ConflictError(format!(
                    "seat {} already held on schedule {}",
                    res.seat_label.as_deref().unwrap_or("?"),
                    res.schedule_id
                )));
            }
        }
        if self.confirmation_in_use(res) {
            return Err(CoreError::ConflictError(
                "confirmation number already issued".to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-local store behind one lock; every check-and-write runs under a
/// single write guard.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_flight(&self, flight: Flight) {
        self.state.write().await.flights.insert(flight.id, flight);
    }

    pub async fn add_user(&self, user: User) {
        self.state.write().await.users.insert(user.id, user);
    }

    /// Insert or replace a schedule.
    pub async fn add_schedule(&self, schedule: Schedule) {
        self.state.write().await.schedules.insert(schedule.id, schedule);
    }

    pub async fn add_layout(&self, layout: SeatLayout, seats: Vec<Seat>) {
        let mut state = self.state.write().await;
        for seat in seats {
            state.seats.insert(seat.id, seat);
        }
        state.layouts.insert(layout.id, layout);
    }

    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }
}

#[async_trait]
impl FlightRepository for InMemoryStore {
    async fn get_flight(&self, id: Uuid) -> CoreResult<Option<Flight>> {
        Ok(self.state.read().await.flights.get(&id).cloned())
    }

    async fn list_airports(&self) -> CoreResult<Vec<String>> {
        let state = self.state.read().await;
        let codes: BTreeSet<String> = state
            .flights
            .values()
            .flat_map(|f| [f.origin_code.to_ascii_uppercase(), f.destination_code.to_ascii_uppercase()])
            .collect();
        Ok(codes.into_iter().collect())
    }

    async fn list_route_flights(&self, origin: &str, destination: &str) -> CoreResult<Vec<Flight>> {
        let state = self.state.read().await;
        let mut flights: Vec<Flight> = state
            .flights
            .values()
            .filter(|f| {
                f.origin_code.eq_ignore_ascii_case(origin) && f.destination_code.eq_ignore_ascii_case(destination)
            })
            .cloned()
            .collect();
        flights.sort_by_key(|f| f.departure_time);
        Ok(flights)
    }

    async fn get_schedule(&self, id: Uuid) -> CoreResult<Option<Schedule>> {
        Ok(self.state.read().await.schedules.get(&id).cloned())
    }

    async fn find_schedule(&self, flight_id: Uuid, date: NaiveDate) -> CoreResult<Option<Schedule>> {
        Ok(self
            .state
            .read()
            .await
            .schedules
            .values()
            .find(|s| s.flight_id == flight_id && s.date == date)
            .cloned())
    }

    async fn ensure_schedule(&self, flight_id: Uuid, date: NaiveDate) -> CoreResult<Schedule> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .schedules
            .values()
            .find(|s| s.flight_id == flight_id && s.date == date)
        {
            return Ok(existing.clone());
        }
        let schedule = Schedule::new(flight_id, date);
        state.schedules.insert(schedule.id, schedule.clone());
        Ok(schedule)
    }

    async fn get_seat(&self, id: Uuid) -> CoreResult<Option<Seat>> {
        Ok(self.state.read().await.seats.get(&id).cloned())
    }

    async fn list_layout_seats(&self, layout_id: Uuid) -> CoreResult<Vec<Seat>> {
        let state = self.state.read().await;
        let mut seats: Vec<Seat> = state
            .seats
            .values()
            .filter(|s| s.seat_layout_id == layout_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| a.row_number.cmp(&b.row_number).then_with(|| a.column.cmp(&b.column)));
        Ok(seats)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl ReservationRepository for InMemoryStore {
    async fn get_reservation(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        Ok(self.state.read().await.reservations.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let state = self.state.read().await;
        let mut list: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn booked_passengers(&self, flight_id: Uuid, travel_date: NaiveDate) -> CoreResult<i32> {
        Ok(self.state.read().await.booked(flight_id, travel_date, None))
    }

    async fn taken_seat_ids(&self, schedule_id: Uuid) -> CoreResult<Vec<Uuid>> {
        Ok(self
            .state
            .read()
            .await
            .reservations
            .values()
            .filter(|r| r.is_active() && r.schedule_id == schedule_id)
            .filter_map(|r| r.seat_id)
            .collect())
    }

    async fn insert_reservation(&self, reservation: &Reservation, capacity: i32) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if state.reservations.contains_key(&reservation.id) {
            return Err(CoreError::ConflictError(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }
        state.check_placement(reservation, capacity)?;
        state.reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn update_reservation(&self, reservation: &Reservation, expected: ReservationStatus) -> CoreResult<()> {
        let mut state = self.state.write().await;
        state.check_reservation_status(reservation.id, expected)?;
        state.reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn list_expired_holds(&self, now: DateTime<Utc>) -> CoreResult<Vec<Reservation>> {
        Ok(self
            .state
            .read()
            .await
            .reservations
            .values()
            .filter(|r| {
                r.status == ReservationStatus::Blocked && r.hold_expires_at.map(|at| at <= now).unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn apply_reschedule(&self, commit: &RescheduleCommit) -> CoreResult<()> {
        let mut state = self.state.write().await;
        let res = &commit.reservation;
        state.check_reservation_status(res.id, commit.expected_status)?;
        state.check_placement(res, commit.capacity)?;
        for id in &commit.refunded_payment_ids {
            state.check_payment_status(*id, PaymentStatus::Completed)?;
        }

        state.reservations.insert(res.id, res.clone());
        if let Some(payment) = &commit.new_payment {
            state.payments.insert(payment.id, payment.clone());
        }
        if let Some(refund) = &commit.refund {
            state.refunds.push(refund.clone());
        }
        for id in &commit.refunded_payment_ids {
            if let Some(p) = state.payments.get_mut(id) {
                p.status = PaymentStatus::Refunded;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn insert_payment(&self, payment: &Payment) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if !state.reservations.contains_key(&payment.reservation_id) {
            return Err(CoreError::not_found("Reservation", payment.reservation_id));
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn get_payment(&self, id: Uuid) -> CoreResult<Option<Payment>> {
        Ok(self.state.read().await.payments.get(&id).cloned())
    }

    async fn update_payment(&self, payment: &Payment, expected: PaymentStatus) -> CoreResult<()> {
        let mut state = self.state.write().await;
        state.check_payment_status(payment.id, expected)?;
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    async fn list_payments(&self, reservation_id: Uuid) -> CoreResult<Vec<Payment>> {
        let state = self.state.read().await;
        let mut list: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.reservation_id == reservation_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.paid_at.cmp(&a.paid_at));
        Ok(list)
    }

    async fn list_refunds(&self, reservation_id: Uuid) -> CoreResult<Vec<Refund>> {
        Ok(self
            .state
            .read()
            .await
            .refunds
            .iter()
            .filter(|r| r.reservation_id == reservation_id)
            .cloned()
            .collect())
    }

    async fn settle_payment(
        &self,
        payment: &Payment,
        reservation: Option<(&Reservation, ReservationStatus)>,
    ) -> CoreResult<()> {
        let mut state = self.state.write().await;
        if state.payments.contains_key(&payment.id) {
            state.check_payment_status(payment.id, PaymentStatus::Pending)?;
        } else if !state.reservations.contains_key(&payment.reservation_id) {
            return Err(CoreError::not_found("Reservation", payment.reservation_id));
        }
        if let Some((res, expected)) = reservation {
            state.check_reservation_status(res.id, expected)?;
            if state.confirmation_in_use(res) {
                return Err(CoreError::ConflictError(
                    "confirmation number already issued".to_string(),
                ));
            }
            state.reservations.insert(res.id, res.clone());
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }
}
