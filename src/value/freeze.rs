//! Canonical serialization.
//!
//! `freeze` turns a value into the string used for identity comparison: the
//! Dirty snapshots and the sequence differencer both compare frozen strings,
//! never values. Callables freeze to their source text, so two callables with
//! the same source are the same item. Integral numbers serialize as integers.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::{Gene, Value};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
                    serializer.serialize_i64(*n as i64)
                } else {
                    serializer.serialize_f64(*n)
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(gene) => serialize_gene(gene, serializer),
            Value::Function(f) => serializer.serialize_str(f.source()),
        }
    }
}

fn serialize_gene<S: Serializer>(gene: &Gene, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(gene.len()))?;
    for (key, value) in gene {
        map.serialize_entry(key, value)?;
    }
    map.end()
}

/// Canonical comparison string for any serializable value.
pub fn freeze<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("null"))
}

/// Export form: callables become `"(source)"` strings, everything else maps
/// onto JSON directly. Non-finite numbers become `null`.
pub fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;

    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => {
            if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
                Json::from(*n as i64)
            } else {
                serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number)
            }
        }
        Value::String(s) => Json::String(s.clone()),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Object(gene) => Json::Object(
            gene.iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
        Value::Function(f) => Json::String(format!("({})", f.original().source())),
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Json::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}
