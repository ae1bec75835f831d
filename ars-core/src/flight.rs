use ars_shared::Masked;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CoreError;

/// Fare class requested on a booking; doubles as the cabin class of a seat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FareClass {
    #[serde(alias = "Economy")]
    Economy,
    #[serde(alias = "PremiumEconomy", alias = "Premium Economy")]
    PremiumEconomy,
    #[serde(alias = "Business")]
    Business,
    #[serde(alias = "First")]
    First,
}

impl FareClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FareClass::Economy => "ECONOMY",
            FareClass::PremiumEconomy => "PREMIUM_ECONOMY",
            FareClass::Business => "BUSINESS",
            FareClass::First => "FIRST",
        }
    }
}

impl Default for FareClass {
    fn default() -> Self {
        FareClass::Economy
    }
}

impl fmt::Display for FareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FareClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "economy" => Ok(FareClass::Economy),
            "premiumeconomy" => Ok(FareClass::PremiumEconomy),
            "business" => Ok(FareClass::Business),
            "first" => Ok(FareClass::First),
            _ => Err(CoreError::ValidationError(format!("Unknown fare class: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: Uuid,
    pub flight_number: String,
    pub origin_code: String,
    pub destination_code: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub aircraft_type: String,
    pub total_seats: i32,
    pub base_fare_cents: i64,
    pub seat_layout_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleStatus {
    Scheduled,
    Delayed,
    Cancelled,
    Completed,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Scheduled => "SCHEDULED",
            ScheduleStatus::Delayed => "DELAYED",
            ScheduleStatus::Cancelled => "CANCELLED",
            ScheduleStatus::Completed => "COMPLETED",
        }
    }
}

impl FromStr for ScheduleStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SCHEDULED" => Ok(ScheduleStatus::Scheduled),
            "DELAYED" => Ok(ScheduleStatus::Delayed),
            "CANCELLED" => Ok(ScheduleStatus::Cancelled),
            "COMPLETED" => Ok(ScheduleStatus::Completed),
            _ => Err(CoreError::InternalError(format!("Unknown schedule status: {}", s))),
        }
    }
}

/// A flight's occurrence on one calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub date: NaiveDate,
    pub status: ScheduleStatus,
}

impl Schedule {
    pub fn new(flight_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_id,
            date,
            status: ScheduleStatus::Scheduled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatLayout {
    pub id: Uuid,
    pub name: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub seat_layout_id: Uuid,
    pub row_number: i32,
    pub column: String,
    pub label: String,
    pub cabin_class: FareClass,
    pub is_exit_row: bool,
    pub is_premium: bool,
    pub price_modifier_cents: Option<i64>,
}

/// Read-only view of an account; identity management lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Masked<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fare_class_parsing() {
        assert_eq!("Economy".parse::<FareClass>().unwrap(), FareClass::Economy);
        assert_eq!("premium economy".parse::<FareClass>().unwrap(), FareClass::PremiumEconomy);
        assert_eq!("PREMIUM_ECONOMY".parse::<FareClass>().unwrap(), FareClass::PremiumEconomy);
        assert_eq!("first".parse::<FareClass>().unwrap(), FareClass::First);
        assert!("cargo".parse::<FareClass>().is_err());
    }

    #[test]
    fn test_fare_class_deserialization() {
        let class: FareClass = serde_json::from_str("\"Business\"").unwrap();
        assert_eq!(class, FareClass::Business);
        let class: FareClass = serde_json::from_str("\"PREMIUM_ECONOMY\"").unwrap();
        assert_eq!(class, FareClass::PremiumEconomy);
        assert_eq!(serde_json::to_string(&FareClass::First).unwrap(), "\"FIRST\"");
    }
}
