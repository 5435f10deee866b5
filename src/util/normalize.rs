//! Loose-value normalizers.
//!
//! Provider payloads and credential records disagree on whether numbers are
//! numbers or strings, and whether absent means `null`, `""`, or missing.
//! These helpers collapse that into strict `Option`s.

use serde_json::Value;

/// Trimmed string if `value` is a string that is non-empty after trimming.
#[must_use]
pub fn normalize_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

/// Finite number from a JSON number or a decimal string.
///
/// Anything unparseable yields `None`; this never panics.
#[must_use]
pub fn normalize_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Boolean from a JSON bool or a `"true"`/`"false"` string.
#[must_use]
pub fn normalize_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// camelCase spelling of a snake_case key (`plan_type` -> `planType`).
#[must_use]
pub fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for ch in snake.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Look up `key` on a JSON object under its snake_case and camelCase spellings.
///
/// Returns the first present, non-null value.
#[must_use]
pub fn lookup<'a>(object: &'a Value, key: &str) -> Option<&'a Value> {
    let map = object.as_object()?;
    let camel = camel_case(key);
    [key, camel.as_str()]
        .into_iter()
        .filter_map(|k| map.get(k))
        .find(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_string_trims() {
        assert_eq!(normalize_string(&json!("  abc ")), Some("abc".to_string()));
    }

    #[test]
    fn normalize_string_rejects_blank_and_non_strings() {
        assert_eq!(normalize_string(&json!("   ")), None);
        assert_eq!(normalize_string(&json!("")), None);
        assert_eq!(normalize_string(&json!(12)), None);
        assert_eq!(normalize_string(&Value::Null), None);
    }

    #[test]
    fn normalize_number_accepts_numbers_and_numeric_strings() {
        assert_eq!(normalize_number(&json!(42)), Some(42.0));
        assert_eq!(normalize_number(&json!(0.25)), Some(0.25));
        assert_eq!(normalize_number(&json!("12.5")), Some(12.5));
        assert_eq!(normalize_number(&json!(" 7 ")), Some(7.0));
    }

    #[test]
    fn normalize_number_rejects_garbage() {
        assert_eq!(normalize_number(&json!("abc")), None);
        assert_eq!(normalize_number(&json!("")), None);
        assert_eq!(normalize_number(&json!("NaN")), None);
        assert_eq!(normalize_number(&json!("inf")), None);
        assert_eq!(normalize_number(&json!(true)), None);
        assert_eq!(normalize_number(&json!([1])), None);
        assert_eq!(normalize_number(&Value::Null), None);
    }

    #[test]
    fn normalize_bool_variants() {
        assert_eq!(normalize_bool(&json!(false)), Some(false));
        assert_eq!(normalize_bool(&json!("TRUE")), Some(true));
        assert_eq!(normalize_bool(&json!(1)), None);
    }

    #[test]
    fn camel_case_conversion() {
        assert_eq!(camel_case("plan_type"), "planType");
        assert_eq!(camel_case("chatgpt_account_id"), "chatgptAccountId");
        assert_eq!(camel_case("name"), "name");
    }

    #[test]
    fn lookup_checks_both_spellings_and_skips_null() {
        let obj = json!({"plan_type": null, "planType": "team"});
        assert_eq!(lookup(&obj, "plan_type"), Some(&json!("team")));

        let obj = json!({"auth_index": "a1", "authIndex": "b2"});
        assert_eq!(lookup(&obj, "auth_index"), Some(&json!("a1")));

        assert_eq!(lookup(&json!("not an object"), "x"), None);
    }
}
