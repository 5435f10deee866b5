//! Number formatting utilities.

/// Format a percentage.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.0}%")
}

/// Format an optional used percentage, `-` when unknown.
#[must_use]
pub fn format_used_percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), format_percent)
}

/// Format a remaining fraction (0.0-1.0) as a percentage, `-` when unknown.
#[must_use]
pub fn format_fraction(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |f| format_percent(f * 100.0))
}

/// Format a usage amount, dropping the decimals for whole numbers.
#[must_use]
pub fn format_amount(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_as_percent() {
        assert_eq!(format_fraction(Some(0.3)), "30%");
        assert_eq!(format_fraction(None), "-");
    }

    #[test]
    fn used_percent_unknown() {
        assert_eq!(format_used_percent(None), "-");
        assert_eq!(format_used_percent(Some(100.0)), "100%");
    }

    #[test]
    fn amounts() {
        assert_eq!(format_amount(50.0), "50");
        assert_eq!(format_amount(12.345), "12.35");
    }
}
