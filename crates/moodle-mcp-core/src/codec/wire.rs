//! Flat form encoding for the Moodle REST server
//!
//! Moodle only accepts `application/x-www-form-urlencoded` bodies and builds
//! nested arrays from bracketed keys, so `{"courses": [{"id": 2}]}` must be
//! sent as `courses[0][id]=2`. Brackets stay literal in the encoded output.

use serde_json::{Map, Value};

/// Flatten nested arguments into `(key, value)` pairs
///
/// Lists become `key[0]`, `key[1]`, ...; objects become `key[sub]`; null
/// becomes an empty string. Object keys are emitted in sorted order at every
/// level, whatever order the map iterates in.
pub fn flatten_params(args: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in sorted_entries(args) {
        flatten_into(key.clone(), value, &mut pairs);
    }
    pairs
}

fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_into(format!("{}[{}]", prefix, index), item, pairs);
            }
        }
        Value::Object(map) => {
            for (key, item) in sorted_entries(map) {
                flatten_into(format!("{}[{}]", prefix, key), item, pairs);
            }
        }
        scalar => pairs.push((prefix, scalar_to_wire(scalar))),
    }
}

/// Render a scalar the way Moodle's parameter cleaning expects it
///
/// Booleans go out as `1` / `0`, which every PARAM_BOOL accepts.
pub fn scalar_to_wire(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        // Containers are flattened before reaching here
        other => other.to_string(),
    }
}

fn escape(raw: &str) -> String {
    urlencoding::encode(raw).replace("%5B", "[").replace("%5D", "]")
}

/// Encode nested arguments as a form body
pub fn encode_params(args: &Map<String, Value>) -> String {
    flatten_params(args)
        .iter()
        .map(|(key, value)| format!("{}={}", escape(key), escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}
