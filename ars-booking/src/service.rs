use std::collections::HashSet;
use std::sync::Arc;

use ars_catalog::{check_capacity, pick_reselect_seat, CapacitySnapshot, PricingEngine, SeatMap};
use ars_core::repository::RescheduleCommit;
use ars_core::search::{FlightOption, RescheduleQuote};
use ars_core::{
    CoreError, CoreResult, FareClass, Flight, NotificationSender, PassengerCounts, Payment, Refund,
    Reservation, ReservationStatus, Schedule, ScheduleStatus,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::{self, Transition};
use crate::reschedule::reconcile;
use crate::search::flight_option;
use crate::Stores;

pub const DEFAULT_HOLD_MINUTES: i64 = 15;
/// Longest hold a caller may ask for: one day.
pub const MAX_HOLD_MINUTES: i64 = 24 * 60;

fn default_adults() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReservationRequest {
    pub flight_id: Uuid,
    #[serde(default)]
    pub schedule_id: Option<Uuid>,
    pub travel_date: NaiveDate,
    #[serde(default = "default_adults")]
    pub adults: i32,
    #[serde(default)]
    pub children: i32,
    #[serde(default)]
    pub seniors: i32,
    #[serde(default)]
    pub fare_class: FareClass,
    #[serde(default)]
    pub seat_id: Option<Uuid>,
    /// On a lost seat race, retry once with the next free seat in the same cabin.
    #[serde(default)]
    pub reselect_on_conflict: bool,
    /// Hold length for `hold`; falls back to the configured default.
    #[serde(default)]
    pub hold_minutes: Option<i64>,
}

impl CreateReservationRequest {
    pub fn new(flight_id: Uuid, travel_date: NaiveDate, passengers: PassengerCounts) -> Self {
        Self {
            flight_id,
            schedule_id: None,
            travel_date,
            adults: passengers.adults,
            children: passengers.children,
            seniors: passengers.seniors,
            fare_class: FareClass::Economy,
            seat_id: None,
            reselect_on_conflict: false,
            hold_minutes: None,
        }
    }

    pub fn passengers(&self) -> PassengerCounts {
        PassengerCounts::new(self.adults, self.children, self.seniors)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingReceipt {
    pub reservation: Reservation,
    pub total_price_cents: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub flight_id: Uuid,
    #[serde(default)]
    pub schedule_id: Option<Uuid>,
    pub travel_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct RescheduleOutcome {
    pub reservation: Reservation,
    pub quote: RescheduleQuote,
    pub new_payment: Option<Payment>,
    pub refund: Option<Refund>,
}

/// Reservation lifecycle: booking, holds, confirmation, cancellation and
/// rescheduling against the repositories.
pub struct ReservationService {
    stores: Stores,
    notifier: Arc<dyn NotificationSender>,
    pricing: Arc<PricingEngine>,
    hold_minutes: i64,
}

impl ReservationService {
    pub fn new(stores: Stores, notifier: Arc<dyn NotificationSender>, pricing: Arc<PricingEngine>) -> Self {
        Self {
            stores,
            notifier,
            pricing,
            hold_minutes: DEFAULT_HOLD_MINUTES,
        }
    }

    pub fn with_hold_minutes(mut self, minutes: i64) -> Self {
        self.hold_minutes = minutes;
        self
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Reservation> {
        self.stores
            .reservations
            .get_reservation(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Reservation", id))
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Reservation>> {
        self.stores.reservations.list_by_user(user_id).await
    }

    /// Book as Pending.
    pub async fn create(&self, user_id: Uuid, req: &CreateReservationRequest) -> CoreResult<BookingReceipt> {
        self.book(user_id, req, None).await
    }

    /// Book straight into Blocked with a blocking number and a hold deadline.
    pub async fn hold(&self, user_id: Uuid, req: &CreateReservationRequest) -> CoreResult<BookingReceipt> {
        let minutes = self.hold_length(req.hold_minutes)?;
        self.book(user_id, req, Some(minutes)).await
    }

    async fn book(
        &self,
        user_id: Uuid,
        req: &CreateReservationRequest,
        hold_minutes: Option<i64>,
    ) -> CoreResult<BookingReceipt> {
        let passengers = req.passengers();
        passengers.validate()?;

        let now = Utc::now();
        let today = now.date_naive();
        if req.travel_date < today {
            return Err(CoreError::ValidationError(
                "Travel date cannot be in the past".to_string(),
            ));
        }

        self.stores
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User", user_id))?;
        let flight = self.load_flight(req.flight_id).await?;
        let schedule = self.resolve_schedule(&flight, req.schedule_id, req.travel_date).await?;

        let booked = self
            .stores
            .reservations
            .booked_passengers(flight.id, req.travel_date)
            .await?;
        check_capacity(flight.total_seats, booked, passengers.total())?;

        let mut reservation = Reservation::new(
            user_id,
            flight.id,
            schedule.id,
            req.travel_date,
            passengers,
            req.fare_class,
        );

        if let Some(seat_id) = req.seat_id {
            let seat = self
                .stores
                .flights
                .get_seat(seat_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Seat", seat_id))?;
            if let Some(layout_id) = flight.seat_layout_id {
                if seat.seat_layout_id != layout_id {
                    return Err(CoreError::ValidationError(format!(
                        "Seat {} is not part of flight {}",
                        seat.label, flight.flight_number
                    )));
                }
            }
            let taken = self.stores.reservations.taken_seat_ids(schedule.id).await?;
            if taken.contains(&seat.id) {
                return Err(CoreError::SeatUnavailable(format!(
                    "Seat {} is already taken on {}",
                    seat.label, req.travel_date
                )));
            }
            reservation.seat_id = Some(seat.id);
            reservation.seat_label = Some(seat.label.clone());
        }

        if let Some(minutes) = hold_minutes {
            lifecycle::block(&mut reservation, now + Duration::minutes(minutes), now)?;
        }

        let inserted = self
            .stores
            .reservations
            .insert_reservation(&reservation, flight.total_seats)
            .await;
        match inserted {
            Ok(()) => {}
            Err(CoreError::ConflictError(msg)) if req.reselect_on_conflict && reservation.seat_id.is_some() => {
                tracing::warn!(reservation_id = %reservation.id, "Seat taken concurrently, reselecting: {}", msg);
                self.reselect_and_insert(&mut reservation, &flight, msg).await?;
            }
            Err(e) => return Err(e),
        }

        let total_price_cents = self.fare_for(&flight, &reservation, today);
        tracing::info!(
            reservation_id = %reservation.id,
            flight = %flight.flight_number,
            date = %reservation.travel_date,
            passengers = reservation.passenger_total(),
            status = %reservation.status,
            "Reservation created"
        );

        if let (Some(number), Some(until)) = (&reservation.blocking_number, reservation.hold_expires_at) {
            let body = format!(
                "Your seats on {} ({}) are held under {} until {}.",
                flight.flight_number,
                reservation.travel_date,
                number,
                until.to_rfc3339(),
            );
            self.notify_owner(reservation.user_id, "Seats held", &body).await;
        }

        Ok(BookingReceipt {
            reservation,
            total_price_cents,
        })
    }

    /// One retry on the first free seat in the lost seat's cabin.
    async fn reselect_and_insert(&self, reservation: &mut Reservation, flight: &Flight, conflict: String) -> CoreResult<()> {
        let lost_id = match reservation.seat_id {
            Some(id) => id,
            None => return Err(CoreError::ConflictError(conflict)),
        };
        let lost = self
            .stores
            .flights
            .get_seat(lost_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Seat", lost_id))?;

        let seats = self.stores.flights.list_layout_seats(lost.seat_layout_id).await?;
        let taken: HashSet<Uuid> = self
            .stores
            .reservations
            .taken_seat_ids(reservation.schedule_id)
            .await?
            .into_iter()
            .collect();

        let Some(next) = pick_reselect_seat(&seats, lost.cabin_class, &taken, lost.id) else {
            return Err(CoreError::ConflictError(conflict));
        };

        reservation.seat_id = Some(next.id);
        reservation.seat_label = Some(next.label.clone());
        self.stores
            .reservations
            .insert_reservation(reservation, flight.total_seats)
            .await?;
        tracing::info!(reservation_id = %reservation.id, seat = %next.label, "Reselected seat");
        Ok(())
    }

    pub async fn block(&self, id: Uuid, hold_minutes: Option<i64>) -> CoreResult<Reservation> {
        let minutes = self.hold_length(hold_minutes)?;
        let mut reservation = self.get(id).await?;
        let expected = reservation.status;
        let now = Utc::now();
        lifecycle::block(&mut reservation, now + Duration::minutes(minutes), now)?;
        self.stores.reservations.update_reservation(&reservation, expected).await?;
        tracing::info!(reservation_id = %id, blocking_number = ?reservation.blocking_number, "Reservation blocked");
        Ok(reservation)
    }

    pub async fn confirm(&self, id: Uuid) -> CoreResult<Reservation> {
        let mut reservation = self.get(id).await?;
        let expected = reservation.status;
        if lifecycle::confirm(&mut reservation, Utc::now())? == Transition::Unchanged {
            return Ok(reservation);
        }
        self.stores.reservations.update_reservation(&reservation, expected).await?;
        tracing::info!(reservation_id = %id, confirmation = ?reservation.confirmation_number, "Reservation confirmed");
        self.notify_confirmed(&reservation).await;
        Ok(reservation)
    }

    pub async fn cancel(&self, id: Uuid) -> CoreResult<Reservation> {
        let mut reservation = self.get(id).await?;
        let expected = reservation.status;
        if lifecycle::cancel(&mut reservation)? == Transition::Unchanged {
            return Ok(reservation);
        }
        self.stores.reservations.update_reservation(&reservation, expected).await?;
        tracing::info!(reservation_id = %id, "Reservation cancelled");
        let body = format!("Reservation {} for {} has been cancelled.", reservation.id, reservation.travel_date);
        self.notify_owner(reservation.user_id, "Reservation cancelled", &body).await;
        Ok(reservation)
    }

    pub async fn complete(&self, id: Uuid) -> CoreResult<Reservation> {
        let mut reservation = self.get(id).await?;
        let expected = reservation.status;
        lifecycle::complete(&mut reservation)?;
        self.stores.reservations.update_reservation(&reservation, expected).await?;
        tracing::info!(reservation_id = %id, "Reservation completed");
        Ok(reservation)
    }

    /// Set a status by name through the matching lifecycle operation.
    /// Pending and Rescheduled are only ever reached by booking and moving.
    pub async fn update_status(&self, id: Uuid, status: &str) -> CoreResult<Reservation> {
        let target: ReservationStatus = status
            .trim()
            .parse()
            .map_err(|_| CoreError::ValidationError(format!("Unknown reservation status: {}", status)))?;
        match target {
            ReservationStatus::Blocked => self.block(id, None).await,
            ReservationStatus::Confirmed => self.confirm(id).await,
            ReservationStatus::Cancelled => self.cancel(id).await,
            ReservationStatus::Completed => self.complete(id).await,
            ReservationStatus::Pending | ReservationStatus::Rescheduled => Err(CoreError::ValidationError(format!(
                "Status {} cannot be set directly",
                target.as_str()
            ))),
        }
    }

    /// Flights on the same route with room for the party on `date`, priced.
    pub async fn reschedule_options(&self, id: Uuid, date: NaiveDate) -> CoreResult<Vec<FlightOption>> {
        let reservation = self.get(id).await?;
        let current = self.load_flight(reservation.flight_id).await?;
        let today = Utc::now().date_naive();

        let flights = self
            .stores
            .flights
            .list_route_flights(&current.origin_code, &current.destination_code)
            .await?;

        let mut options = Vec::new();
        for flight in flights {
            let schedule = match self.stores.flights.find_schedule(flight.id, date).await? {
                Some(s) if s.status == ScheduleStatus::Scheduled => s,
                _ => continue,
            };
            let snapshot = self.snapshot_for_move(&reservation, &flight, date).await?;
            if !snapshot.can_fit(reservation.passenger_total()) {
                continue;
            }
            let total = self.pricing.total_cents(
                flight.base_fare_cents,
                reservation.fare_class,
                &reservation.passengers,
                date,
                today,
            );
            options.push(flight_option(&flight, &schedule, snapshot.available(), total));
        }
        options.sort_by_key(|o| o.departure_time);
        Ok(options)
    }

    /// Price difference of a move, without writing anything.
    pub async fn quote_reschedule(&self, id: Uuid, req: &RescheduleRequest) -> CoreResult<RescheduleQuote> {
        let reservation = self.get(id).await?;
        let flight = self.load_flight(req.flight_id).await?;
        if let Some(schedule_id) = req.schedule_id {
            self.check_schedule(&flight, schedule_id, req.travel_date).await?;
        }
        let new_total = self.fare_for_move(&flight, &reservation, req.travel_date);
        let payments = self.stores.payments.list_payments(id).await?;
        Ok(reconcile(id, new_total, &payments).quote)
    }

    pub async fn reschedule(&self, id: Uuid, req: &RescheduleRequest) -> CoreResult<RescheduleOutcome> {
        let current = self.get(id).await?;
        let now = Utc::now();
        if req.travel_date < now.date_naive() {
            return Err(CoreError::ValidationError(
                "Travel date cannot be in the past".to_string(),
            ));
        }

        let flight = self.load_flight(req.flight_id).await?;
        let schedule = self.resolve_schedule(&flight, req.schedule_id, req.travel_date).await?;

        let mut updated = current.clone();
        lifecycle::reschedule(&mut updated, flight.id, schedule.id, req.travel_date, now)?;

        let snapshot = self.snapshot_for_move(&current, &flight, req.travel_date).await?;
        snapshot.check(current.passenger_total())?;

        let new_total = self.fare_for_move(&flight, &current, req.travel_date);
        let payments = self.stores.payments.list_payments(id).await?;
        let rec = reconcile(id, new_total, &payments);

        let commit = RescheduleCommit {
            reservation: updated,
            expected_status: current.status,
            capacity: flight.total_seats,
            new_payment: rec.new_payment,
            refund: rec.refund,
            refunded_payment_ids: rec.refunded_payment_ids,
        };
        self.stores.reservations.apply_reschedule(&commit).await?;

        tracing::info!(
            reservation_id = %id,
            flight = %flight.flight_number,
            date = %req.travel_date,
            difference_cents = rec.quote.difference_cents,
            "Reservation rescheduled"
        );

        let money = match rec.quote.difference_cents {
            d if d > 0 => format!("A balance of {} is due.", ars_shared::format_cents(d)),
            d if d < 0 => format!("{} will be refunded.", ars_shared::format_cents(-d)),
            _ => "No fare difference.".to_string(),
        };
        if let Some(number) = &commit.reservation.confirmation_number {
            let body = format!(
                "Your reservation is now on {} ({}), confirmation {}. {}",
                flight.flight_number, req.travel_date, number, money
            );
            self.notify_owner(current.user_id, "Reservation rescheduled", &body).await;
        }

        let RescheduleCommit {
            reservation,
            new_payment,
            refund,
            ..
        } = commit;
        Ok(RescheduleOutcome {
            reservation,
            quote: rec.quote,
            new_payment,
            refund,
        })
    }

    pub async fn seat_map(&self, flight_id: Uuid, date: NaiveDate) -> CoreResult<SeatMap> {
        let flight = self.load_flight(flight_id).await?;
        match flight.seat_layout_id {
            Some(layout_id) => {
                let seats = self.stores.flights.list_layout_seats(layout_id).await?;
                let taken: HashSet<Uuid> = match self.stores.flights.find_schedule(flight.id, date).await? {
                    Some(schedule) => self
                        .stores
                        .reservations
                        .taken_seat_ids(schedule.id)
                        .await?
                        .into_iter()
                        .collect(),
                    None => HashSet::new(),
                };
                Ok(SeatMap::from_layout(&seats, &taken))
            }
            None => {
                let booked = self.stores.reservations.booked_passengers(flight.id, date).await?;
                Ok(SeatMap::heuristic(flight.total_seats, booked))
            }
        }
    }

    /// Cancel every hold whose deadline has passed. Returns how many were released.
    pub async fn expire_holds(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let expired = self.stores.reservations.list_expired_holds(now).await?;
        let mut released = 0;

        for mut reservation in expired {
            if let Err(e) = lifecycle::expire_hold(&mut reservation, now) {
                tracing::debug!(reservation_id = %reservation.id, "Skipping hold: {}", e);
                continue;
            }
            match self
                .stores
                .reservations
                .update_reservation(&reservation, ReservationStatus::Blocked)
                .await
            {
                Ok(()) => {}
                // confirmed or cancelled since the listing
                Err(CoreError::ConflictError(msg)) => {
                    tracing::debug!(reservation_id = %reservation.id, "Hold moved on: {}", msg);
                    continue;
                }
                Err(e) => return Err(e),
            }
            released += 1;
            tracing::info!(reservation_id = %reservation.id, "Hold expired");
            let body = format!(
                "Your hold for {} expired and the seats were released.",
                reservation.travel_date
            );
            self.notify_owner(reservation.user_id, "Hold expired", &body).await;
        }

        Ok(released)
    }

    /// Price of the reservation's party on `flight` at today's timing.
    pub fn fare_for(&self, flight: &Flight, reservation: &Reservation, today: NaiveDate) -> i64 {
        self.pricing.total_cents(
            flight.base_fare_cents,
            reservation.fare_class,
            &reservation.passengers,
            reservation.travel_date,
            today,
        )
    }

    fn fare_for_move(&self, flight: &Flight, reservation: &Reservation, date: NaiveDate) -> i64 {
        self.pricing.total_cents(
            flight.base_fare_cents,
            reservation.fare_class,
            &reservation.passengers,
            date,
            Utc::now().date_naive(),
        )
    }

    /// Occupancy of the target flight/date, not counting the reservation being moved.
    async fn snapshot_for_move(&self, reservation: &Reservation, flight: &Flight, date: NaiveDate) -> CoreResult<CapacitySnapshot> {
        let mut booked = self.stores.reservations.booked_passengers(flight.id, date).await?;
        if reservation.is_active() && reservation.flight_id == flight.id && reservation.travel_date == date {
            booked -= reservation.passenger_total();
        }
        Ok(CapacitySnapshot::new(flight.total_seats, booked.max(0)))
    }

    async fn load_flight(&self, id: Uuid) -> CoreResult<Flight> {
        self.stores
            .flights
            .get_flight(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Flight", id))
    }

    async fn check_schedule(&self, flight: &Flight, schedule_id: Uuid, date: NaiveDate) -> CoreResult<Schedule> {
        let schedule = self
            .stores
            .flights
            .get_schedule(schedule_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Schedule", schedule_id))?;
        if schedule.flight_id != flight.id || schedule.date != date {
            return Err(CoreError::ValidationError(format!(
                "Schedule {} does not match flight {} on {}",
                schedule_id, flight.flight_number, date
            )));
        }
        Ok(schedule)
    }

    async fn resolve_schedule(&self, flight: &Flight, schedule_id: Option<Uuid>, date: NaiveDate) -> CoreResult<Schedule> {
        let schedule = match schedule_id {
            Some(id) => self.check_schedule(flight, id, date).await?,
            None => self.stores.flights.ensure_schedule(flight.id, date).await?,
        };
        if matches!(schedule.status, ScheduleStatus::Cancelled | ScheduleStatus::Completed) {
            return Err(CoreError::ValidationError(format!(
                "Flight {} on {} is {}",
                flight.flight_number,
                date,
                schedule.status.as_str()
            )));
        }
        Ok(schedule)
    }

    fn hold_length(&self, requested: Option<i64>) -> CoreResult<i64> {
        let minutes = requested.unwrap_or(self.hold_minutes);
        if !(1..=MAX_HOLD_MINUTES).contains(&minutes) {
            return Err(CoreError::ValidationError(format!(
                "Hold length must be between 1 and {} minutes",
                MAX_HOLD_MINUTES
            )));
        }
        Ok(minutes)
    }

    pub(crate) async fn notify_confirmed(&self, reservation: &Reservation) {
        let Some(number) = &reservation.confirmation_number else {
            tracing::warn!(reservation_id = %reservation.id, "No confirmation number to send");
            return;
        };
        let body = format!(
            "Your booking for {} is confirmed. Confirmation number: {}",
            reservation.travel_date, number
        );
        self.notify_owner(reservation.user_id, "Booking confirmed", &body).await;
    }

    /// Best effort: failures are logged, never surfaced.
    pub(crate) async fn notify_owner(&self, user_id: Uuid, subject: &str, body: &str) {
        let user = match self.stores.users.get_user(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(%user_id, "No user to notify");
                return;
            }
            Err(e) => {
                tracing::warn!(%user_id, "Failed to load user for notification: {}", e);
                return;
            }
        };
        if let Err(e) = self.notifier.send(user.email.expose(), subject, body).await {
            tracing::warn!(%user_id, subject, "Notification failed: {}", e);
        }
    }
}
