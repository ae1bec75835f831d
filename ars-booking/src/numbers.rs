//! Human-facing reference numbers. All timestamps are UTC.

use chrono::{DateTime, Utc};
use rand::Rng;

const STAMP: &str = "%Y%m%d%H%M%S";

/// `ARS` + yyyyMMddHHmmss + 1000..=9999
pub fn confirmation_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
    format!("ARS{}{}", now.format(STAMP), suffix)
}

/// `BLK` + yyyyMMddHHmmss + 100..=999
pub fn blocking_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(100..=999);
    format!("BLK{}{}", now.format(STAMP), suffix)
}

pub fn gateway_reference(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
    format!("PG{}{}", now.format(STAMP), suffix)
}

pub fn manual_reference(now: DateTime<Utc>) -> String {
    format!("MANUAL{}", now.format(STAMP))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_number_formats() {
        let now = Utc.with_ymd_and_hms(2025, 11, 16, 8, 5, 9).unwrap();

        let conf = confirmation_number(now);
        assert!(conf.starts_with("ARS20251116080509"));
        assert_eq!(conf.len(), 3 + 14 + 4);

        let blk = blocking_number(now);
        assert!(blk.starts_with("BLK20251116080509"));
        assert_eq!(blk.len(), 3 + 14 + 3);

        assert_eq!(gateway_reference(now).len(), 2 + 14 + 4);
        assert_eq!(manual_reference(now), "MANUAL20251116080509");
    }
}
