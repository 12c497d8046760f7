//! Schema-driven repair of Moodle JSON responses
//!
//! PHP's `json_encode` turns an empty associative array into `[]`, so an
//! empty object and an empty list look the same on the wire. Clients that
//! validate against the declared output schema then reject the response.
//! `repair` walks the value and the schema together and turns `[]` back into
//! `{}` wherever the schema says "object".
//!
//! Repair fails open: a missing or malformed schema leaves the value as is.

use serde_json::{Map, Value};

/// Repair `value` against `schema`
///
/// Idempotent, and never touches scalars, null or non-empty lists.
pub fn repair(value: Value, schema: Option<&Value>) -> Value {
    let Some(schema) = schema.and_then(Value::as_object) else {
        return value;
    };
    let Some(kind) = schema.get("type").and_then(Value::as_str) else {
        return value;
    };

    match (kind, value) {
        ("object", Value::Array(items)) if items.is_empty() => Value::Object(Map::new()),
        ("object", Value::Object(map)) => match schema.get("properties").and_then(Value::as_object) {
            Some(properties) => Value::Object(
                map.into_iter()
                    .map(|(key, item)| {
                        let repaired = repair(item, properties.get(&key));
                        (key, repaired)
                    })
                    .collect(),
            ),
            None => Value::Object(map),
        },
        ("array", Value::Array(items)) => match schema.get("items") {
            Some(item_schema) if !item_schema.is_null() => Value::Array(
                items
                    .into_iter()
                    .map(|item| repair(item, Some(item_schema)))
                    .collect(),
            ),
            _ => Value::Array(items),
        },
        (_, value) => value,
    }
}

/// Repair against several shapes in turn
///
/// Used when one operation name has been registered with more than one
/// output shape: the result is made to fit each of them.
pub fn repair_all<'a, I>(value: Value, schemas: I) -> Value
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    schemas
        .into_iter()
        .fold(value, |acc, schema| repair(acc, schema))
}
