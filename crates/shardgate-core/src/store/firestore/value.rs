//! JSON <-> Firestore typed value codec
//!
//! Firestore's REST surface wraps every value in a single-key object naming
//! its type (`{"stringValue": "x"}`, `{"integerValue": "42"}`, ...). Payloads
//! stay plain JSON everywhere else in the gateway.

use serde_json::{json, Map, Number, Value};

use crate::error::StoreError;
use crate::store::Payload;

/// Encode a JSON value as a Firestore value
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // Firestore integers are i64 and travel as strings
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode a payload as a Firestore `fields` object
pub fn encode_fields(payload: &Payload) -> Map<String, Value> {
    payload
        .iter()
        .map(|(k, v)| (k.clone(), encode(v)))
        .collect()
}

/// Decode a Firestore value into plain JSON
pub fn decode(value: &Value) -> Result<Value, StoreError> {
    let Some((kind, inner)) = value
        .as_object()
        .filter(|m| m.len() == 1)
        .and_then(|m| m.iter().next())
    else {
        return Err(StoreError::Decode(format!("expected a typed value, got {}", value)));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| bad(kind, inner)),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed.map(Value::from).ok_or_else(|| bad(kind, inner))
        }
        "doubleValue" => match inner {
            Value::Number(n) => Ok(Value::Number(n.clone())),
            // NaN and the infinities have no JSON form
            Value::String(_) => Ok(Value::Null),
            _ => Err(bad(kind, inner)),
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| bad(kind, inner)),
        "geoPointValue" => {
            let lat = inner.get("latitude").and_then(Value::as_f64).unwrap_or(0.0);
            let lng = inner.get("longitude").and_then(Value::as_f64).unwrap_or(0.0);
            Ok(json!({
                "latitude": Number::from_f64(lat).map_or(Value::Null, Value::Number),
                "longitude": Number::from_f64(lng).map_or(Value::Null, Value::Number),
            }))
        }
        "arrayValue" => {
            let items = match inner.get("values") {
                Some(Value::Array(values)) => values.iter().map(decode).collect::<Result<_, _>>()?,
                None => Vec::new(),
                Some(other) => return Err(bad(kind, other)),
            };
            Ok(Value::Array(items))
        }
        "mapValue" => {
            let fields = match inner.get("fields") {
                Some(Value::Object(fields)) => decode_fields(fields)?,
                None => Payload::new(),
                Some(other) => return Err(bad(kind, other)),
            };
            Ok(Value::Object(fields))
        }
        other => Err(StoreError::Decode(format!("unsupported value type {}", other))),
    }
}

/// Decode a Firestore `fields` object into a payload
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Payload, StoreError> {
    fields
        .iter()
        .map(|(k, v)| Ok((k.clone(), decode(v)?)))
        .collect()
}

fn bad(kind: &str, inner: &Value) -> StoreError {
    StoreError::Decode(format!("malformed {}: {}", kind, inner))
}
