use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CoreError, CoreResult, FareClass};

/// Reservation status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Blocked,
    Confirmed,
    Rescheduled,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Blocked => "BLOCKED",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Rescheduled => "RESCHEDULED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Cancelled | ReservationStatus::Completed)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(ReservationStatus::Pending),
            "BLOCKED" => Ok(ReservationStatus::Blocked),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "RESCHEDULED" => Ok(ReservationStatus::Rescheduled),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "COMPLETED" => Ok(ReservationStatus::Completed),
            _ => Err(CoreError::InternalError(format!("Unknown reservation status: {}", s))),
        }
    }
}

/// Passenger head-count by type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PassengerCounts {
    pub adults: i32,
    #[serde(default)]
    pub children: i32,
    #[serde(default)]
    pub seniors: i32,
}

impl PassengerCounts {
    pub const MAX_PER_TYPE: i32 = 9;

    pub fn new(adults: i32, children: i32, seniors: i32) -> Self {
        Self { adults, children, seniors }
    }

    pub fn adults(adults: i32) -> Self {
        Self::new(adults, 0, 0)
    }

    pub fn total(&self) -> i32 {
        self.adults + self.children + self.seniors
    }

    pub fn validate(&self) -> CoreResult<()> {
        if !(1..=Self::MAX_PER_TYPE).contains(&self.adults) {
            return Err(CoreError::ValidationError(
                "Number of adults must be between 1 and 9".to_string(),
            ));
        }
        if !(0..=Self::MAX_PER_TYPE).contains(&self.children) {
            return Err(CoreError::ValidationError(
                "Number of children must be between 0 and 9".to_string(),
            ));
        }
        if !(0..=Self::MAX_PER_TYPE).contains(&self.seniors) {
            return Err(CoreError::ValidationError(
                "Number of seniors must be between 0 and 9".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PassengerCounts {
    fn default() -> Self {
        Self::adults(1)
    }
}

/// One booking attempt; aggregate root for its payments and refunds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub flight_id: Uuid,
    pub schedule_id: Uuid,
    pub booking_date: NaiveDate,
    pub travel_date: NaiveDate,
    pub seat_id: Option<Uuid>,
    pub seat_label: Option<String>,
    pub passengers: PassengerCounts,
    pub fare_class: FareClass,
    pub status: ReservationStatus,
    pub confirmation_number: Option<String>,
    pub blocking_number: Option<String>,
    pub hold_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(
        user_id: Uuid,
        flight_id: Uuid,
        schedule_id: Uuid,
        travel_date: NaiveDate,
        passengers: PassengerCounts,
        fare_class: FareClass,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            flight_id,
            schedule_id,
            booking_date: now.date_naive(),
            travel_date,
            seat_id: None,
            seat_label: None,
            passengers,
            fare_class,
            status: ReservationStatus::Pending,
            confirmation_number: None,
            blocking_number: None,
            hold_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn passenger_total(&self) -> i32 {
        self.passengers.total()
    }

    /// Counts against flight capacity and seat uniqueness.
    pub fn is_active(&self) -> bool {
        self.status != ReservationStatus::Cancelled
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passenger_validation() {
        assert!(PassengerCounts::new(2, 1, 0).validate().is_ok());
        assert!(PassengerCounts::new(0, 1, 0).validate().is_err());
        assert!(PassengerCounts::new(10, 0, 0).validate().is_err());
        assert!(PassengerCounts::new(1, -1, 0).validate().is_err());
        assert_eq!(PassengerCounts::new(2, 1, 1).total(), 4);
    }

    #[test]
    fn test_status_round_trip_through_text() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Blocked,
            ReservationStatus::Confirmed,
            ReservationStatus::Rescheduled,
            ReservationStatus::Cancelled,
            ReservationStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<ReservationStatus>().unwrap(), status);
        }
        assert!("Expired".parse::<ReservationStatus>().is_err());
    }

    #[test]
    fn test_new_reservation_is_pending() {
        let res = Reservation::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            Utc::now().date_naive(),
            PassengerCounts::adults(2),
            FareClass::Economy,
        );
        assert_eq!(res.status, ReservationStatus::Pending);
        assert!(res.confirmation_number.is_none());
        assert!(res.is_active());
        assert_eq!(res.passenger_total(), 2);
    }
}
