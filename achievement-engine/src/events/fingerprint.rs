//! Content fingerprints for event dedup
//!
//! The fingerprint is a SHA-256 over a canonical rendering of the body in
//! which object keys are sorted at every level, so two submissions that only
//! differ in field order collide.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex SHA-256 fingerprint of a webhook body
pub fn fingerprint(body: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(body).as_bytes());
    hex::encode(hasher.finalize())
}

/// Render JSON with recursively sorted object keys and no whitespace
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
