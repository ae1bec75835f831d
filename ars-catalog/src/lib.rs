pub mod pricing;
pub mod inventory;
pub mod seat_map;

pub use pricing::{FareQuote, PricingConfig, PricingEngine, FIRST_CLASS_MULTIPLIER};
pub use inventory::{check_capacity, pick_reselect_seat, CapacitySnapshot};
pub use seat_map::{SeatMap, SeatMapEntry, SeatRow};
