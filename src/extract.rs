// src/extract.rs
//! Null-safe access into nested JSON payloads using dotted paths.
//!
//! `"patient.drug.0.medicinalproduct"` walks objects by key and arrays by index (only when the
//! segment is all digits). Any mismatch along the way yields the caller's default; these helpers
//! never panic and never return `Value::Null` where a default was asked for.

use serde_json::Value;

/// Walk `data` along `path`. `None` when a segment is missing, the container has the wrong shape,
/// or the resolved value is `null`.
pub fn lookup<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = data;
    for seg in path.split('.') {
        cur = match cur {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) if is_index(seg) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if cur.is_null() {
        None
    } else {
        Some(cur)
    }
}

/// Contract form: resolved value, or `default` on any structural mismatch or `null`.
pub fn extract(data: &Value, path: &str, default: Value) -> Value {
    lookup(data, path).cloned().unwrap_or(default)
}

/// Scalar as text. Numbers and booleans are rendered; objects/arrays fall back to `default`.
pub fn extract_str(data: &Value, path: &str, default: &str) -> String {
    match lookup(data, path) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => default.to_string(),
    }
}

/// Like [`extract_str`] but treats an empty / whitespace-only string as missing.
pub fn extract_nonempty(data: &Value, path: &str, default: &str) -> String {
    let s = extract_str(data, path, "");
    if s.trim().is_empty() {
        default.to_string()
    } else {
        s.trim().to_string()
    }
}

/// Array at `path`, or an empty slice.
pub fn extract_list<'a>(data: &'a Value, path: &str) -> &'a [Value] {
    match lookup(data, path) {
        Some(Value::Array(items)) => items.as_slice(),
        _ => &[],
    }
}

/// Unsigned integer from a JSON number or a numeric string.
pub fn extract_u64(data: &Value, path: &str, default: u64) -> u64 {
    match lookup(data, path) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// Collect the string field `key` from each object in the array at `path`, skipping blanks.
pub fn collect_field(data: &Value, path: &str, key: &str, max: usize) -> Vec<String> {
    extract_list(data, path)
        .iter()
        .map(|it| extract_str(it, key, ""))
        .filter(|s| !s.trim().is_empty())
        .take(max)
        .collect()
}

/// Array of scalars at `path` joined with `sep`; a lone scalar is returned as-is.
pub fn join_list(data: &Value, path: &str, sep: &str) -> String {
    match lookup(data, path) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(sep),
        Some(_) => extract_str(data, path, ""),
        None => String::new(),
    }
}

fn is_index(seg: &str) -> bool {
    !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit())
}
