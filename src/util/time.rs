//! Reset-time parsing and formatting.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

/// Label for a timestamp that is absent or unparseable.
pub const UNKNOWN_RESET: &str = "-";

/// Label for a timestamp already in the past.
pub const ALREADY_RESET: &str = "已重置";

/// Unix timestamps above this are treated as milliseconds.
const MILLIS_THRESHOLD: f64 = 1e12;

/// Parse a provider timestamp.
///
/// Accepts RFC 3339 strings, and unix seconds or milliseconds given either as
/// a JSON number or a numeric string.
#[must_use]
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            DateTime::parse_from_rfc3339(trimmed)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(from_unix))
        }
        Value::Number(n) => n.as_f64().and_then(from_unix),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn from_unix(raw: f64) -> Option<DateTime<Utc>> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    let millis = if raw >= MILLIS_THRESHOLD {
        raw
    } else {
        raw * 1000.0
    };
    Utc.timestamp_millis_opt(millis as i64).single()
}

/// Relative reset label measured from now.
#[must_use]
pub fn format_reset_label(target: Option<DateTime<Utc>>) -> String {
    format_reset_label_at(target, Utc::now())
}

/// Relative reset label measured from `now`.
///
/// Minutes are rounded up so a window resetting in 89.9 minutes still reads
/// as 1小时30分.
#[must_use]
pub fn format_reset_label_at(target: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(target) = target else {
        return UNKNOWN_RESET.to_string();
    };

    let millis = target.signed_duration_since(now).num_milliseconds();
    if millis <= 0 {
        return ALREADY_RESET.to_string();
    }

    let total_minutes = (millis + 59_999) / 60_000;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("{days}天{hours}小时后")
    } else if hours > 0 {
        format!("{hours}小时{minutes}分后")
    } else {
        format!("{minutes}分后")
    }
}

/// Convenience: parse then format a raw JSON timestamp.
#[must_use]
pub fn reset_label_from_value(value: Option<&Value>) -> String {
    format_reset_label(value.and_then(parse_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn ninety_minutes_ahead() {
        let now = Utc::now();
        let label = format_reset_label_at(Some(now + Duration::minutes(90)), now);
        assert!(label.contains("1小时30分后"), "got {label}");
    }

    #[test]
    fn ninety_minutes_ahead_against_wall_clock() {
        let target = Utc::now() + Duration::minutes(90);
        let label = format_reset_label(Some(target));
        assert!(label.contains("1小时30分后"), "got {label}");
    }

    #[test]
    fn past_timestamp_is_reset() {
        let now = Utc::now();
        assert_eq!(
            format_reset_label_at(Some(now - Duration::seconds(5)), now),
            ALREADY_RESET
        );
    }

    #[test]
    fn absent_timestamp_is_dash() {
        assert_eq!(format_reset_label(None), "-");
        assert_eq!(reset_label_from_value(Some(&json!("not a date"))), "-");
        assert_eq!(reset_label_from_value(None), "-");
    }

    #[test]
    fn minutes_only_and_days() {
        let now = Utc::now();
        assert_eq!(
            format_reset_label_at(Some(now + Duration::minutes(12)), now),
            "12分后"
        );
        assert_eq!(
            format_reset_label_at(Some(now + Duration::hours(50)), now),
            "2天2小时后"
        );
    }

    #[test]
    fn parses_rfc3339_and_unix_variants() {
        let rfc = parse_timestamp(&json!("2026-01-18T00:00:00Z")).expect("rfc3339");
        assert_eq!(rfc.timestamp(), 1_768_694_400);

        let secs = parse_timestamp(&json!(1_768_694_400)).expect("seconds");
        assert_eq!(secs, rfc);

        let millis = parse_timestamp(&json!(1_768_694_400_000_i64)).expect("millis");
        assert_eq!(millis, rfc);

        let string_secs = parse_timestamp(&json!("1768694400")).expect("numeric string");
        assert_eq!(string_secs, rfc);
    }

    #[test]
    fn rejects_non_timestamps() {
        assert!(parse_timestamp(&json!("")).is_none());
        assert!(parse_timestamp(&json!(true)).is_none());
        assert!(parse_timestamp(&json!(-5)).is_none());
        assert!(parse_timestamp(&Value::Null).is_none());
    }
}
