//! Shared primitive types and boundary helpers.

/// Customer identifier as it appears in the transaction export.
pub type CustomerId = String;

/// Invoice identifier. One invoice spans many line items.
pub type InvoiceId = String;

/// The canonical batch run identifier.
pub type RunId = String;

/// Label used for rows whose grouping key is empty.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Period marker carried by every synthetic payload.
pub const SAMPLE_DATA_LABEL: &str = "Sample Data";

/// Monetary values leave the core rounded to cents.
pub fn round_money(value: f64) -> f64 {
    round_to(value, 2)
}

/// Percentages leave the core rounded to one decimal.
pub fn round_pct(value: f64) -> f64 {
    round_to(value, 1)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole * 100`, or 0 when the whole is zero.
pub fn share_pct(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_guards_non_finite() {
        assert_eq!(round_money(f64::NAN), 0.0);
        assert_eq!(round_pct(f64::INFINITY), 0.0);
        assert_eq!(round_money(12.345_6), 12.35);
        assert_eq!(round_pct(33.333), 33.3);
    }

    #[test]
    fn share_of_zero_whole_is_zero() {
        assert_eq!(share_pct(5.0, 0.0), 0.0);
        assert_eq!(share_pct(25.0, 100.0), 25.0);
    }
}
