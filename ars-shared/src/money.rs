//! Amounts are carried as integer cents end to end; these helpers sit at the
//! edges where a fractional product or a human-readable string is needed.

/// Round a fractional cent amount to the nearest whole cent (half away from zero).
pub fn round_cents(value: f64) -> i64 {
    value.round() as i64
}

/// `24000` -> `"$240.00"`, `-5000` -> `"-$50.00"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

/// Percentage of `part` in `whole`, rounded to two decimals. Zero when `whole` is zero.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    ((part as f64 / whole as f64) * 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(24000), "$240.00");
        assert_eq!(format_cents(9005), "$90.05");
        assert_eq!(format_cents(-5000), "-$50.00");
        assert_eq!(format_cents(0), "$0.00");
    }

    #[test]
    fn test_round_cents() {
        assert_eq!(round_cents(12000.000000000002), 12000);
        assert_eq!(round_cents(8999.5), 9000);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(5000, 20000), 25.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(10, 0), 0.0);
    }
}
