use std::sync::Arc;

use ars_catalog::{CapacitySnapshot, FareQuote, PricingEngine};
use ars_core::search::{FlightOption, FlightSearchRequest};
use ars_core::{CoreError, CoreResult, FareClass, Flight, PassengerCounts, Schedule, ScheduleStatus};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::Stores;

pub(crate) fn flight_option(
    flight: &Flight,
    schedule: &Schedule,
    available_seats: i32,
    total_price_cents: i64,
) -> FlightOption {
    FlightOption {
        flight_id: flight.id,
        schedule_id: schedule.id,
        flight_number: flight.flight_number.clone(),
        origin: flight.origin_code.clone(),
        destination: flight.destination_code.clone(),
        date: schedule.date,
        departure_time: flight.departure_time,
        arrival_time: flight.arrival_time,
        duration_minutes: flight.duration_minutes,
        aircraft_type: flight.aircraft_type.clone(),
        available_seats,
        base_fare_cents: flight.base_fare_cents,
        total_price_cents,
    }
}

fn default_adults() -> i32 {
    1
}

/// Party and class to price on one flight/date.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceRequest {
    pub date: NaiveDate,
    #[serde(default = "default_adults")]
    pub adults: i32,
    #[serde(default)]
    pub children: i32,
    #[serde(default)]
    pub seniors: i32,
    #[serde(default, rename = "class")]
    pub fare_class: FareClass,
}

impl PriceRequest {
    pub fn passengers(&self) -> PassengerCounts {
        PassengerCounts::new(self.adults, self.children, self.seniors)
    }
}

/// Finds bookable flights on a route for a given date and party.
pub struct FlightSearchService {
    stores: Stores,
    pricing: Arc<PricingEngine>,
}

impl FlightSearchService {
    pub fn new(stores: Stores, pricing: Arc<PricingEngine>) -> Self {
        Self { stores, pricing }
    }

    pub async fn search(&self, req: &FlightSearchRequest) -> CoreResult<Vec<FlightOption>> {
        self.search_on(req, Utc::now().date_naive()).await
    }

    /// Same as [`search`](Self::search) with "today" fixed, for pricing.
    pub async fn search_on(&self, req: &FlightSearchRequest, today: NaiveDate) -> CoreResult<Vec<FlightOption>> {
        let passengers = req.passengers();
        passengers.validate()?;

        let origin = req.origin.trim().to_ascii_uppercase();
        let destination = req.destination.trim().to_ascii_uppercase();
        if origin.is_empty() || destination.is_empty() {
            return Err(CoreError::ValidationError(
                "Origin and destination are required".to_string(),
            ));
        }
        if origin == destination {
            return Err(CoreError::ValidationError(
                "Origin and destination must differ".to_string(),
            ));
        }

        let flights = self.stores.flights.list_route_flights(&origin, &destination).await?;
        let mut options = Vec::new();

        for flight in flights {
            let schedule = match self.stores.flights.find_schedule(flight.id, req.date).await? {
                Some(s) if s.status == ScheduleStatus::Scheduled => s,
                _ => continue,
            };

            let booked = self.stores.reservations.booked_passengers(flight.id, req.date).await?;
            let snapshot = CapacitySnapshot::new(flight.total_seats, booked);
            if !snapshot.can_fit(passengers.total()) {
                continue;
            }

            let total = self.pricing.total_cents(
                flight.base_fare_cents,
                req.fare_class,
                &passengers,
                req.date,
                today,
            );
            options.push(flight_option(&flight, &schedule, snapshot.available(), total));
        }

        options.sort_by_key(|o| o.departure_time);
        tracing::debug!(%origin, %destination, date = %req.date, results = options.len(), "Flight search");
        Ok(options)
    }

    /// One flight on one date with its live availability, priced for a
    /// single adult in Economy.
    pub async fn flight_details(&self, flight_id: Uuid, date: NaiveDate) -> CoreResult<FlightOption> {
        let flight = self
            .stores
            .flights
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Flight", flight_id))?;
        let schedule = self
            .stores
            .flights
            .find_schedule(flight.id, date)
            .await?
            .ok_or_else(|| {
                CoreError::NotFoundError(format!("Flight {} does not operate on {}", flight.flight_number, date))
            })?;

        let booked = self.stores.reservations.booked_passengers(flight.id, date).await?;
        let snapshot = CapacitySnapshot::new(flight.total_seats, booked);
        let total = self.pricing.total_cents(
            flight.base_fare_cents,
            FareClass::Economy,
            &PassengerCounts::adults(1),
            date,
            Utc::now().date_naive(),
        );
        Ok(flight_option(&flight, &schedule, snapshot.available(), total))
    }

    /// Every airport code served by at least one flight.
    pub async fn airports(&self) -> CoreResult<Vec<String>> {
        self.stores.flights.list_airports().await
    }

    pub async fn price(&self, flight_id: Uuid, req: &PriceRequest) -> CoreResult<FareQuote> {
        self.price_on(flight_id, req, Utc::now().date_naive()).await
    }

    pub async fn price_on(&self, flight_id: Uuid, req: &PriceRequest, today: NaiveDate) -> CoreResult<FareQuote> {
        let passengers = req.passengers();
        passengers.validate()?;
        let flight = self
            .stores
            .flights
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Flight", flight_id))?;
        Ok(self
            .pricing
            .quote(flight.base_fare_cents, req.fare_class, &passengers, req.date, today))
    }
}
