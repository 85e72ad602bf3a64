//! Value coercion helpers.
//!
//! Upstream payloads carry no schema guarantee: a field that should hold prose may arrive as a
//! list of bullet strings, a nested object, a number, or not at all. These helpers collapse any
//! JSON value into text so that every leaf field of a normalised record is a `String`.

use serde_json::{Map, Value};

/// A single `(key, default)` entry of an object template.
pub type TemplateField = (&'static str, &'static str);

/// Coerces any JSON value into a string.
///
/// - `null` becomes `""`
/// - strings are returned unchanged
/// - arrays are coerced element by element and joined with newlines
/// - objects are rendered as pretty JSON (2-space indent) as a last-resort textual form
/// - numbers and booleans use their display form
///
/// This function is total: it never fails and never panics.
pub fn ensure_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(ensure_string)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(_) => serde_json::to_string_pretty(value).unwrap_or_default(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
    }
}

/// Coerces an optional value, treating absence like `null`.
pub fn ensure_string_opt(value: Option<&Value>) -> String {
    value.map(ensure_string).unwrap_or_default()
}

/// JavaScript-style truthiness: `null`, `false`, `0` and `""` are falsy.
///
/// Empty arrays and objects are truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Returns true when a value carries no content at all.
///
/// Strings must be zero-length, containers must be empty or hold only empty values.
/// Numbers and booleans always count as content.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.iter().all(is_blank),
        Value::Object(map) => map.values().all(is_blank),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Converts a camelCase key into its snake_case spelling.
pub(crate) fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Looks up `key` on an object, accepting the snake_case spelling as an alias.
///
/// Returns `None` when `value` is not an object or neither spelling is present.
pub(crate) fn lookup<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let map = value.as_object()?;
    map.get(key).or_else(|| map.get(&snake_case(key)))
}

/// Returns true when `key` (or its snake_case alias) is present on an object.
pub(crate) fn has_key(value: &Value, key: &str) -> bool {
    lookup(value, key).is_some()
}

/// Reads a field as text, treating a missing key as empty.
pub(crate) fn field_string(value: &Value, key: &str) -> String {
    ensure_string_opt(lookup(value, key))
}

/// Reads the first truthy field among `keys` as text.
pub(crate) fn first_field_string(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| lookup(value, key))
        .find(|v| is_truthy(v))
        .map(ensure_string)
        .unwrap_or_default()
}

/// Shapes `candidate` against a template of expected keys.
///
/// The returned map has exactly the template's keys. Each value is the
/// candidate's value coerced with [`ensure_string`], or the template default when the candidate
/// lacks the key or holds a falsy value there. A candidate that is not an object yields the
/// template defaults.
pub fn normalize_object(candidate: &Value, template: &[TemplateField]) -> Map<String, Value> {
    let mut out = Map::new();

    for (key, default) in template {
        let value = match lookup(candidate, key) {
            Some(v) if is_truthy(v) => ensure_string(v),
            _ => (*default).to_string(),
        };
        out.insert((*key).to_string(), Value::String(value));
    }

    out
}

/// Reads a string entry produced by [`normalize_object`].
pub(crate) fn template_string(map: &Map<String, Value>, key: &str) -> String {
    map.get(key).map(ensure_string).unwrap_or_default()
}
