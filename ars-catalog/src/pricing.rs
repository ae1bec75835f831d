use ars_core::{FareClass, PassengerCounts};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Multiplier applied to First class fares unless configured otherwise.
pub const FIRST_CLASS_MULTIPLIER: f64 = 3.0;

pub const CHILD_MULTIPLIER: f64 = 0.75;
pub const SENIOR_MULTIPLIER: f64 = 0.9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Class multiplier for First; the other classes are fixed.
    pub first_class_multiplier: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            first_class_multiplier: FIRST_CLASS_MULTIPLIER,
        }
    }
}

/// Priced fare with the factors that went into it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct FareQuote {
    pub base_fare_cents: i64,
    pub class_multiplier: f64,
    pub timing_multiplier: f64,
    pub days_before_departure: i64,
    pub total_cents: i64,
}

/// Fare pricing engine
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn class_multiplier(&self, class: FareClass) -> f64 {
        match class {
            FareClass::Economy => 1.0,
            FareClass::PremiumEconomy => 1.5,
            FareClass::Business => 2.0,
            FareClass::First => self.config.first_class_multiplier,
        }
    }

    /// Price a party on one flight. `today` is injected so quotes are reproducible.
    pub fn quote(
        &self,
        base_fare_cents: i64,
        class: FareClass,
        passengers: &PassengerCounts,
        travel_date: NaiveDate,
        today: NaiveDate,
    ) -> FareQuote {
        let days = days_before_departure(today, travel_date);
        let class_multiplier = self.class_multiplier(class);
        let timing_multiplier = timing_multiplier(days);

        let per_adult = base_fare_cents as f64 * class_multiplier * timing_multiplier;
        let raw = per_adult * passengers.adults as f64
            + per_adult * CHILD_MULTIPLIER * passengers.children as f64
            + per_adult * SENIOR_MULTIPLIER * passengers.seniors as f64;

        FareQuote {
            base_fare_cents,
            class_multiplier,
            timing_multiplier,
            days_before_departure: days,
            total_cents: ars_shared::round_cents(raw),
        }
    }

    pub fn total_cents(
        &self,
        base_fare_cents: i64,
        class: FareClass,
        passengers: &PassengerCounts,
        travel_date: NaiveDate,
        today: NaiveDate,
    ) -> i64 {
        self.quote(base_fare_cents, class, passengers, travel_date, today)
            .total_cents
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

/// Calendar days from `today` to `travel_date`; negative for past dates.
pub fn days_before_departure(today: NaiveDate, travel_date: NaiveDate) -> i64 {
    (travel_date - today).num_days()
}

/// Early bookings are discounted, late ones carry a premium.
pub fn timing_multiplier(days: i64) -> f64 {
    if days >= 30 {
        0.8
    } else if days >= 15 {
        1.0
    } else if days >= 7 {
        1.2
    } else {
        1.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
    }

    #[test]
    fn test_two_adults_economy_ten_days_out() {
        let engine = PricingEngine::default();
        let travel = today() + chrono::Duration::days(10);

        let quote = engine.quote(10000, FareClass::Economy, &PassengerCounts::adults(2), travel, today());
        assert_eq!(quote.timing_multiplier, 1.2);
        assert_eq!(quote.total_cents, 24000);

        let with_child = engine.total_cents(
            10000,
            FareClass::Economy,
            &PassengerCounts::new(2, 1, 0),
            travel,
            today(),
        );
        assert_eq!(with_child - quote.total_cents, 9000);
    }

    #[test]
    fn test_timing_bands() {
        assert_eq!(timing_multiplier(45), 0.8);
        assert_eq!(timing_multiplier(30), 0.8);
        assert_eq!(timing_multiplier(29), 1.0);
        assert_eq!(timing_multiplier(15), 1.0);
        assert_eq!(timing_multiplier(14), 1.2);
        assert_eq!(timing_multiplier(7), 1.2);
        assert_eq!(timing_multiplier(6), 1.5);
        assert_eq!(timing_multiplier(0), 1.5);
        assert_eq!(timing_multiplier(-3), 1.5);
    }

    #[test]
    fn test_class_multipliers() {
        let engine = PricingEngine::default();
        assert_eq!(engine.class_multiplier(FareClass::PremiumEconomy), 1.5);
        assert_eq!(engine.class_multiplier(FareClass::Business), 2.0);
        assert_eq!(engine.class_multiplier(FareClass::First), FIRST_CLASS_MULTIPLIER);

        let engine = PricingEngine::new(PricingConfig { first_class_multiplier: 4.0 });
        assert_eq!(engine.class_multiplier(FareClass::First), 4.0);
    }

    #[test]
    fn test_senior_business_early_bird() {
        let engine = PricingEngine::default();
        let travel = today() + chrono::Duration::days(40);
        // 10000 * 2.0 * 0.8 * 0.9
        let total = engine.total_cents(10000, FareClass::Business, &PassengerCounts::new(1, 0, 1), travel, today());
        assert_eq!(total, 16000 + 14400);
    }
}
