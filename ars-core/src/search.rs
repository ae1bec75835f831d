use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FareClass, PassengerCounts};

#[derive(Debug, Clone, Deserialize)]
pub struct FlightSearchRequest {
    pub origin: String,
    pub destination: String,
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

fn default_adults() -> i32 {
    1
}

impl FlightSearchRequest {
    pub fn passengers(&self) -> PassengerCounts {
        PassengerCounts::new(self.adults, self.children, self.seniors)
    }
}

/// One bookable flight on a given date, priced for the requested party.
#[derive(Debug, Clone, Serialize)]
pub struct FlightOption {
    pub flight_id: Uuid,
    pub schedule_id: Uuid,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub aircraft_type: String,
    pub available_seats: i32,
    pub base_fare_cents: i64,
    pub total_price_cents: i64,
}

/// Price difference for moving a reservation to another flight/date.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RescheduleQuote {
    pub new_total_cents: i64,
    pub total_paid_cents: i64,
    pub difference_cents: i64,
}

impl RescheduleQuote {
    pub fn new(new_total_cents: i64, total_paid_cents: i64) -> Self {
        Self {
            new_total_cents,
            total_paid_cents,
            difference_cents: new_total_cents - total_paid_cents,
        }
    }
}
