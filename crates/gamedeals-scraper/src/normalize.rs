//! Normalization from raw price-info entries to [`PriceFact`].
//!
//! Numeric semantics follow the price feed's consumers: raw values are
//! parsed as whole currency units with leading-digit
//! truncation (`"150.75"` becomes 150, never 151), and a value of zero is
//! treated as absent, since the feed uses 0 for unpriced entries. Malformed
//! input never errors; it normalizes to an absent field and downstream
//! derivations (current price, discount rate) simply skip it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use gamedeals_core::PriceFact;

use crate::types::PriceInfoEntry;

/// Converts one raw price-info entry into a normalized [`PriceFact`].
#[must_use]
pub fn normalize_entry(entry: &PriceInfoEntry) -> PriceFact {
    let regular_price = entry
        .price
        .regular_price
        .as_ref()
        .and_then(|p| parse_raw_price(p.raw_value.as_ref()));

    let discount = entry.price.discount_price.as_ref();
    let discount_price = discount.and_then(|p| parse_raw_price(p.raw_value.as_ref()));

    // Window timestamps ride along only when the discount block exists;
    // they are meaningless without one.
    let discount_start_at = discount
        .and_then(|p| p.start_datetime.as_deref())
        .and_then(parse_datetime);
    let discount_end_at = discount
        .and_then(|p| p.end_datetime.as_deref())
        .and_then(parse_datetime);

    PriceFact {
        regular_price,
        discount_price,
        discount_start_at,
        discount_end_at,
    }
}

/// Parses a raw price value into whole currency units.
///
/// Strings parse like `parseInt`: optional sign, then leading digits,
/// everything after the first non-digit ignored. Numbers truncate toward
/// zero. Zero and unparseable values normalize to `None`.
#[must_use]
pub fn parse_raw_price(raw: Option<&Value>) -> Option<i64> {
    let parsed = match raw? {
        Value::Number(n) => number_to_i64(n),
        Value::String(s) => leading_int(s),
        _ => None,
    };
    parsed.filter(|v| *v != 0)
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_i64(n: &serde_json::Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64().map(|f| f.trunc() as i64)
}

/// Leading-integer parse: skips leading whitespace, honors one sign
/// character, stops at the first non-digit. `None` when no digits follow.
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<i64>().ok().map(|v| sign * v)
}

/// Lenient timestamp parse: RFC 3339 first, then the naive formats the
/// feed has been seen emitting. Unparseable input is absent, not an error.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry(json: serde_json::Value) -> PriceInfoEntry {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn normalizes_regular_and_discount() {
        let fact = normalize_entry(&entry(json!({
            "id": 70000001i64,
            "price": {
                "regular_price": {"raw_value": "200.00"},
                "discount_price": {"raw_value": "150.00",
                                   "start_datetime": "2024-01-01T00:00:00Z",
                                   "end_datetime": "2024-01-08T00:00:00Z"}
            }
        })));
        assert_eq!(fact.regular_price, Some(200));
        assert_eq!(fact.discount_price, Some(150));
        assert_eq!(fact.current_price(), Some(150));
        assert_eq!(fact.discount_rate(), Some(25));
        assert_eq!(
            fact.discount_end_at,
            Some(Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn missing_discount_block_leaves_window_absent() {
        let fact = normalize_entry(&entry(json!({
            "id": 70000001i64,
            "price": {"regular_price": {"raw_value": "200.00"}}
        })));
        assert_eq!(fact.regular_price, Some(200));
        assert_eq!(fact.discount_price, None);
        assert_eq!(fact.discount_start_at, None);
        assert_eq!(fact.discount_end_at, None);
        assert_eq!(fact.current_price(), Some(200));
        assert_eq!(fact.discount_rate(), None);
    }

    #[test]
    fn fractional_string_truncates() {
        assert_eq!(parse_raw_price(Some(&json!("150.75"))), Some(150));
    }

    #[test]
    fn fractional_number_truncates() {
        assert_eq!(parse_raw_price(Some(&json!(150.75))), Some(150));
    }

    #[test]
    fn integer_number_passes_through() {
        assert_eq!(parse_raw_price(Some(&json!(200))), Some(200));
    }

    #[test]
    fn non_numeric_string_is_absent() {
        assert_eq!(parse_raw_price(Some(&json!("free"))), None);
    }

    #[test]
    fn trailing_garbage_after_digits_is_ignored() {
        assert_eq!(parse_raw_price(Some(&json!("99 JPY"))), Some(99));
    }

    #[test]
    fn zero_normalizes_to_absent() {
        assert_eq!(parse_raw_price(Some(&json!("0"))), None);
        assert_eq!(parse_raw_price(Some(&json!(0))), None);
    }

    #[test]
    fn missing_raw_value_is_absent() {
        assert_eq!(parse_raw_price(None), None);
    }

    #[test]
    fn parses_rfc3339_and_naive_datetimes() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 8, 10, 30, 0).unwrap();
        assert_eq!(parse_datetime("2024-01-08T10:30:00Z"), Some(expected));
        assert_eq!(parse_datetime("2024-01-08T10:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-08 10:30:00"), Some(expected));
    }

    #[test]
    fn parses_bare_date() {
        assert_eq!(
            parse_datetime("2024-01-08"),
            Some(Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn unparseable_datetime_is_absent() {
        assert_eq!(parse_datetime("next tuesday"), None);
    }
}
