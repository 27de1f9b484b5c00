//! Client-side sort applied to read results after retrieval.
//!
//! The store has no ordered scans, so list endpoints sort in the process:
//! a `sortBy` key names a serialized field, a leading `-` flips the
//! direction, and entries missing the field (or carrying JSON `null`)
//! always sort last regardless of direction.

use std::cmp::Ordering;

use serde_json::Value;

/// Sorts serialized records in place by the named field.
///
/// `sort_by` is a camelCase field name, optionally prefixed with `-` for
/// descending order (e.g. `"-discountStartAt"`). The sort is stable, so
/// ties keep their retrieval order.
pub fn sort_by_field(records: &mut [Value], sort_by: &str) {
    let (field, descending) = match sort_by.strip_prefix('-') {
        Some(rest) => (rest, true),
        None => (sort_by, false),
    };

    records.sort_by(|a, b| {
        let a_val = present(a.get(field));
        let b_val = present(b.get(field));
        match (a_val, b_val) {
            (None, None) => Ordering::Equal,
            // Missing fields go last in both directions.
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => {
                let ord = compare_values(a, b);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
        }
    });
}

/// Treats JSON `null` the same as an absent field.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        // Mixed types have no meaningful order; fall back to the textual form.
        _ => a.to_string().cmp(&b.to_string()),
    }
}
