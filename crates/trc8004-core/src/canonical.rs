//! Canonical JSON encoding for deterministic hashing.
//!
//! This module reduces a JSON document to a single byte sequence:
//! - Object keys sorted by their UTF-8 bytes (equivalently, by code point)
//! - No insignificant whitespace (`,` and `:` separators only)
//! - Integers in plain decimal, floats in shortest round-trip form
//! - Strings UTF-8, escaping only `"`, `\` and control characters
//!
//! The canonical encoding is critical: it ensures that the same metadata
//! produces identical bytes (and thus an identical on-chain commitment)
//! regardless of key order, formatting, or platform.

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::CanonicalError;

/// Maximum nesting depth accepted for canonicalization.
pub const MAX_DEPTH: usize = 128;

/// Serialize any document to canonical JSON bytes.
///
/// The document is first reduced to the closed JSON variant set. Anything
/// outside it (non-string map keys, non-finite floats where rejected by the
/// serializer) fails before any bytes are produced.
pub fn canonicalize<T: Serialize + ?Sized>(document: &T) -> Result<Vec<u8>, CanonicalError> {
    let value =
        serde_json::to_value(document).map_err(|e| CanonicalError::Unsupported(e.to_string()))?;
    canonical_bytes(&value)
}

/// Encode a JSON value to canonical bytes.
pub fn canonical_bytes(value: &Value) -> Result<Vec<u8>, CanonicalError> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value, 0)?;
    Ok(buf)
}

/// Encode a JSON value to a canonical string.
pub fn canonical_string(value: &Value) -> Result<String, CanonicalError> {
    let bytes = canonical_bytes(value)?;
    String::from_utf8(bytes).map_err(|e| CanonicalError::Unsupported(e.to_string()))
}

/// Parse raw JSON bytes and re-encode them canonically.
pub fn canonicalize_json_bytes(bytes: &[u8]) -> Result<Vec<u8>, CanonicalError> {
    canonical_bytes(&parse_json(bytes)?)
}

/// Parse raw JSON bytes for hashing.
///
/// Integer literals outside the `i64`/`u64` range are rejected. `serde_json`
/// would store them as `f64`, and documents differing only in such an
/// integer would share one canonical form.
pub fn parse_json(bytes: &[u8]) -> Result<Value, CanonicalError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| CanonicalError::InvalidJson(e.to_string()))?;
    check_integer_literals(bytes)?;
    Ok(value)
}

/// Scan number tokens of already-validated JSON text.
fn check_integer_literals(bytes: &[u8]) -> Result<(), CanonicalError> {
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            b'-' | b'0'..=b'9' => {
                let start = i;
                while i < bytes.len()
                    && matches!(bytes[i], b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9')
                {
                    i += 1;
                }
                let token = &bytes[start..i];
                if token.iter().any(|b| matches!(b, b'.' | b'e' | b'E')) {
                    continue;
                }
                let text = String::from_utf8_lossy(token);
                if text.parse::<i64>().is_err() && text.parse::<u64>().is_err() {
                    return Err(CanonicalError::Unsupported(format!(
                        "integer {text} is outside the 64-bit range"
                    )));
                }
            }
            _ => i += 1,
        }
    }
    Ok(())
}

/// Recursively encode a JSON value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value, depth: usize) -> Result<(), CanonicalError> {
    if depth > MAX_DEPTH {
        return Err(CanonicalError::TooDeep(MAX_DEPTH));
    }

    match value {
        Value::Null => buf.extend_from_slice(b"null"),
        Value::Bool(true) => buf.extend_from_slice(b"true"),
        Value::Bool(false) => buf.extend_from_slice(b"false"),
        Value::Number(n) => encode_number(buf, n),
        Value::String(s) => encode_string(buf, s)?,
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                encode_value_to(buf, item, depth + 1)?;
            }
            buf.push(b']');
        }
        Value::Object(map) => encode_object(buf, map, depth)?,
    }
    Ok(())
}

/// Encode a number.
///
/// `serde_json` keeps integers as `u64`/`i64` and prints them in decimal.
/// Floats print through `ryu`, which is platform- and locale-independent.
fn encode_number(buf: &mut Vec<u8>, n: &Number) {
    buf.extend_from_slice(n.to_string().as_bytes());
}

fn encode_string(buf: &mut Vec<u8>, s: &str) -> Result<(), CanonicalError> {
    serde_json::to_writer(&mut *buf, s).map_err(|e| CanonicalError::Unsupported(e.to_string()))
}

/// Encode an object with keys sorted by byte comparison.
///
/// The map's own iteration order is not trusted: `serde_json` may be built
/// with `preserve_order` elsewhere in the dependency graph.
fn encode_object(
    buf: &mut Vec<u8>,
    map: &Map<String, Value>,
    depth: usize,
) -> Result<(), CanonicalError> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    buf.push(b'{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            buf.push(b',');
        }
        encode_string(buf, key)?;
        buf.push(b':');
        encode_value_to(buf, value, depth + 1)?;
    }
    buf.push(b'}');
    Ok(())
}
