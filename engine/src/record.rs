//! Record helpers.
//!
//! Records have no schema. A record is whatever JSON value a client stored,
//! normally an object whose field order is its insertion order. The helpers
//! here give every value the loose string form that identifier matching,
//! equality filters and text search compare against.

use serde_json::{Map, Value};
use std::cmp::Ordering;

/// A single element of a managed collection.
pub type Record = Value;

/// Field name used when nothing better can be inferred.
pub const DEFAULT_ID_KEY: &str = "id";

/// Loose string form of a possibly absent value.
///
/// Absent fields render as `undefined`, integral floats drop their fraction
/// and arrays are joined with commas, so `1`, `1.0` and `"1"` all compare equal.
pub fn to_js_string(value: Option<&Value>) -> String {
    match value {
        None => "undefined".to_string(),
        Some(value) => value_to_string(value),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                // f64 Display already omits a zero fraction
                n.as_f64().map(|f| f.to_string()).unwrap_or_default()
            }
        }
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => value_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Compare two values by their string forms.
pub fn loosely_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    to_js_string(a) == to_js_string(b)
}

/// Whether a value counts as "set" for parameter handling.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Natural ordering of two field values.
///
/// Numbers compare numerically, strings lexicographically and booleans with
/// `false < true`. Mixed or missing values are treated as equal so that a
/// stable sort keeps their original order.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            _ => Ordering::Equal,
        },
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

/// Read a top-level field of a record, if the record is an object.
pub fn field<'a>(record: &'a Record, key: &str) -> Option<&'a Value> {
    record.as_object().and_then(|fields| fields.get(key))
}

/// Copy the top-level fields of `patch` into `target`.
///
/// Both sides must be objects; anything else leaves `target` untouched.
pub fn shallow_merge(target: &mut Record, patch: &Value) {
    if let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Guess the identifier field from a sample record.
///
/// Prefers `id`, then the first field ending in `Id`, then the first field,
/// then falls back to `id`.
pub fn infer_id_key(sample: Option<&Record>) -> String {
    let empty = Map::new();
    let fields = sample.and_then(Value::as_object).unwrap_or(&empty);

    if fields.contains_key(DEFAULT_ID_KEY) {
        return DEFAULT_ID_KEY.to_string();
    }

    fields
        .keys()
        .find(|key| key.ends_with("Id"))
        .or_else(|| fields.keys().next())
        .cloned()
        .unwrap_or_else(|| DEFAULT_ID_KEY.to_string())
}
