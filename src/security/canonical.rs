//! Canonical payload encoding for signature verification.
//!
//! The bank signs a deterministic string derived from the notification body:
//! top-level fields (minus `signature`) sorted by raw byte order, rendered as
//! `key=value` pairs joined with `&`. Nested arrays and objects render as
//! compact JSON with object keys sorted. The verifier must rebuild the exact
//! byte string the signer produced, so every rendering rule here is pinned:
//!
//! - strings render raw, without quotes or escaping
//! - numbers keep the integer/float distinction from the wire: the JSON
//!   token `1000000` canonicalizes to `1000000`, the token `1000000.0` to
//!   `1000000.0`
//! - booleans render `true` / `false`
//! - `null` has no portable textual form and is rejected

use serde_json::{Map, Value};
use thiserror::Error;

/// Failure to derive a deterministic canonical form.
#[derive(Debug, Error)]
pub enum CanonicalError {
    #[error("field '{0}' is null and cannot be canonicalized")]
    NullValue(String),

    #[error("field '{0}' holds a non-finite number")]
    NonFiniteNumber(String),
}

/// Build the canonical string for a payload whose `signature` field has
/// already been removed.
///
/// Output is invariant under reordering of the input's top-level fields.
pub fn canonical_string(payload: &Map<String, Value>) -> Result<String, CanonicalError> {
    let mut keys: Vec<&String> = payload.keys().collect();
    keys.sort_unstable();

    let mut pairs = Vec::with_capacity(keys.len());
    for key in keys {
        let value = &payload[key.as_str()];
        pairs.push(format!("{}={}", key, scalar_form(key, value)?));
    }

    Ok(pairs.join("&"))
}

/// Render a top-level value in its canonical textual form.
fn scalar_form(field: &str, value: &Value) -> Result<String, CanonicalError> {
    match value {
        Value::Null => Err(CanonicalError::NullValue(field.to_string())),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => {
            check_finite(field, n)?;
            Ok(n.to_string())
        }
        Value::String(s) => Ok(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            let mut out = String::new();
            write_sorted_json(field, value, &mut out)?;
            Ok(out)
        }
    }
}

/// Compact JSON with object keys sorted, independent of how the value's map
/// happens to be ordered in memory.
fn write_sorted_json(field: &str, value: &Value, out: &mut String) -> Result<(), CanonicalError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            check_finite(field, n)?;
            out.push_str(&n.to_string());
        }
        Value::String(s) => {
            // serde_json handles JSON string escaping.
            out.push_str(&serde_json::to_string(s).unwrap_or_default());
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_sorted_json(field, item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).unwrap_or_default());
                out.push(':');
                write_sorted_json(field, &map[key.as_str()], out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn check_finite(field: &str, n: &serde_json::Number) -> Result<(), CanonicalError> {
    if n.is_u64() || n.is_i64() {
        return Ok(());
    }
    match n.as_f64() {
        Some(f) if f.is_finite() => Ok(()),
        _ => Err(CanonicalError::NonFiniteNumber(field.to_string())),
    }
}
