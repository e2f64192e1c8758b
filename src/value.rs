//! Dynamic store values and the coercions the binding layer applies to them.
//!
//! Stores hold [`serde_json::Value`]s. An absent value (nothing stored at a
//! path) is `None` at every API boundary; `Value::Null` is a stored value.

pub use serde_json::{Map, Value};

/// Truthiness used for boolean-like node attributes and `toggle`.
///
/// `null`, `false`, `0`, `NaN` and `""` are falsy; everything else,
/// including empty arrays and objects, is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Whether the value is a primitive (not an array or object).
pub fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Whether a slot carries data worth synchronizing.
///
/// Absent and `null` never do. When `blank_is_empty` is set, an empty string
/// counts as no data too (node contents).
pub fn has_data(value: Option<&Value>, blank_is_empty: bool) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) if blank_is_empty => !s.is_empty(),
        Some(_) => true,
    }
}

/// Text form of a value as it appears inside rendered content.
pub fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Deep-merge `overlay` into `base`.
///
/// Objects merge key by key; any other overlay value replaces the base.
pub fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Cache key for a rebuilt subtree: the watched path plus the value it took.
pub fn state_key(path: &str, value: Option<&Value>) -> String {
    match value {
        None => format!("{path}:undefined"),
        Some(v) => format!("{path}:{v}"),
    }
}
